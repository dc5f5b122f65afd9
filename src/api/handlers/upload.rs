use crate::AppState;
use crate::api::error::AppError;
use crate::models::{
    ErrorEnvelope, Stopwatch, UploadForm, UploadMetadata, UploadTimingResponse,
};
use crate::services::authenticator::Principal;
use crate::services::ingest::{IngestError, measure_multipart};
use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, State},
    http::Method,
};
use tracing::{info, warn};

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, description = "File to time", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File received and measured", body = UploadTimingResponse),
        (status = 400, description = "Malformed or over-size body", body = ErrorEnvelope),
        (status = 401, description = "Missing credential", body = ErrorEnvelope),
        (status = 403, description = "Invalid token", body = ErrorEnvelope),
        (status = 405, description = "Only POST is allowed", body = ErrorEnvelope)
    ),
    params(
        ("api_key" = Option<String>, Query, description = "API key, when not sent as a header")
    ),
    security(
        ("api_key" = []),
        ("jwt" = [])
    ),
    tag = "timing"
)]
pub async fn upload_timing(
    State(state): State<AppState>,
    req: Request,
) -> Result<Json<UploadTimingResponse>, AppError> {
    if req.method() != Method::POST {
        return Err(AppError::MethodNotAllowed);
    }

    let caller = req
        .extensions()
        .get::<Principal>()
        .map(Principal::describe)
        .unwrap_or_default();
    let limit = state.config.max_file_bytes;

    let stopwatch = Stopwatch::start();
    let ingested = match Multipart::from_request(req, &state).await {
        Ok(multipart) => measure_multipart(multipart, limit).await,
        Err(rejection) => Err(IngestError::Malformed(rejection.body_text())),
    };
    let timing = stopwatch.stop();

    let file = ingested.map_err(|e| {
        warn!(caller = %caller, "Upload ingestion failed: {}", e);
        AppError::from(e)
    })?;

    let meta = UploadMetadata::new(file, timing);
    info!(
        caller = %caller,
        filename = meta.filename.as_deref().unwrap_or("-"),
        size = meta.size_bytes,
        processing_ms = meta.timing.processing_ms(),
        "Upload received"
    );

    Ok(Json(meta.into()))
}
