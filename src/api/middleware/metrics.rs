use axum::{
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::info;

/// Logs one `request_completed` line per request under the `metrics` target.
///
/// `route` is the matched route template, or `unmatched`; the raw path is
/// logged without its query, which may carry `api_key`.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let latency = start.elapsed();
    let status = response.status();

    info!(
        target: "metrics",
        method = %method,
        route = %route,
        path = %path,
        status = %status.as_u16(),
        outcome = outcome(status),
        latency_ms = %latency.as_millis(),
        "request_completed"
    );

    response
}

/// Coarse result class, so auth rejections and ingest failures can be
/// counted apart from successes without parsing status codes.
pub fn outcome(status: StatusCode) -> &'static str {
    match status.as_u16() {
        401 | 403 => "rejected",
        400..=499 => "client_error",
        500..=599 => "server_error",
        _ => "ok",
    }
}
