use crate::AppState;
use crate::api::error::AppError;
use crate::services::authenticator::{AuthResult, authorize};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Runs before method dispatch so every verb is gated the same way.
/// Accepted callers get their [`Principal`](crate::services::authenticator::Principal)
/// inserted as a request extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let result = authorize(&state.config, req.headers(), req.uri());

    match result {
        AuthResult::Accepted(principal) => {
            req.extensions_mut().insert(principal);
            Ok(next.run(req).await)
        }
        rejected => {
            tracing::warn!(
                method = %req.method(),
                uri = %req.uri().path(),
                "Rejected caller: {:?}",
                rejected
            );
            Err(AppError::from_auth(&rejected).unwrap_or(AppError::Unauthenticated))
        }
    }
}
