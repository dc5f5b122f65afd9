use crate::models::now_epoch_ms;
use axum::{Json, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    /// Server wall clock, epoch milliseconds
    pub ts: i64,
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Liveness check", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        ts: now_epoch_ms(),
    })
}

pub async fn index() -> &'static str {
    "Upload timing server. POST /upload with multipart/form-data field \"file\".\n"
}
