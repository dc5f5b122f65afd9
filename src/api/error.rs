use crate::models::ErrorEnvelope;
use crate::services::authenticator::AuthResult;
use crate::services::ingest::IngestError;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::any::Any;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Invalid token")]
    InvalidCredential,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    MalformedBody(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredential => StatusCode::FORBIDDEN,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge(_) | AppError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a rejected gate decision. `None` when the caller was accepted.
    pub fn from_auth(result: &AuthResult) -> Option<Self> {
        match result {
            AuthResult::Accepted(_) => None,
            AuthResult::RejectedUnauthenticated => Some(AppError::Unauthenticated),
            AuthResult::RejectedInvalid => Some(AppError::InvalidCredential),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            IngestError::Malformed(msg) => AppError::MalformedBody(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Server error".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(ErrorEnvelope::new(message))).into_response();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}

/// Turn a panic inside a handler into the generic 500 envelope.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::Internal(detail).into_response()
}
