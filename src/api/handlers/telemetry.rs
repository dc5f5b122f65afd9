use crate::AppState;
use crate::api::error::AppError;
use crate::models::{ErrorEnvelope, TelemetryAck, TelemetryDocument};
use crate::services::authenticator::Principal;
use crate::services::ingest::{check_declared_length, read_json_document};
use axum::{
    Json,
    extract::{Request, State},
    http::Method,
};
use tracing::{info, warn};

/// Accept a speed-test result posted by a client.
///
/// The document is opaque: it is logged and acknowledged, never inspected or
/// stored, and no server timings are attached to the reply.
#[utoipa::path(
    post,
    path = "/api/log",
    request_body(content = TelemetryDocument, description = "Speed test result", content_type = "application/json"),
    responses(
        (status = 200, description = "Result acknowledged", body = TelemetryAck),
        (status = 400, description = "Malformed or over-size body", body = ErrorEnvelope),
        (status = 401, description = "Missing credential", body = ErrorEnvelope),
        (status = 403, description = "Invalid token", body = ErrorEnvelope),
        (status = 405, description = "Only POST is allowed", body = ErrorEnvelope)
    ),
    security(
        ("api_key" = []),
        ("jwt" = [])
    ),
    tag = "timing"
)]
pub async fn log_telemetry(
    State(state): State<AppState>,
    req: Request,
) -> Result<Json<TelemetryAck>, AppError> {
    if req.method() != Method::POST {
        return Err(AppError::MethodNotAllowed);
    }

    let caller = req
        .extensions()
        .get::<Principal>()
        .map(Principal::describe)
        .unwrap_or_default();
    let limit = state.config.max_file_bytes;

    check_declared_length(req.headers(), limit)?;
    let data = read_json_document(req.into_body(), limit)
        .await
        .map_err(|e| {
            warn!(caller = %caller, "Telemetry rejected: {}", e);
            AppError::from(e)
        })?;

    info!(caller = %caller, "Speed test log received: {}", data);

    Ok(Json(TelemetryAck::received()))
}
