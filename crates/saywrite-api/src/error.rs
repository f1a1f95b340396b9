//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use saywrite_core::{ProviderError, SayWriteError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn service_unavailable() -> Self {
        Self::new("SERVICE_UNAVAILABLE", "Service temporarily unavailable")
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::new("UPSTREAM_ERROR", message)
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// Rendered as 401 with `WWW-Authenticate: Bearer`
    Unauthorized(String),
    ServiceUnavailable(String),
    /// STT/LLM failure; the message is returned to the caller
    Upstream(String),
    /// Logged in full; the caller only sees a generic message
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Unauthorized(msg) => {
                let mut response =
                    (StatusCode::UNAUTHORIZED, Json(ApiError::unauthorized(msg))).into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                return response;
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::error!(error = %msg, "Backing service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ApiError::service_unavailable(),
                )
            }
            AppError::Upstream(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::upstream_error(msg),
            ),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<SayWriteError> for AppError {
    fn from(err: SayWriteError) -> Self {
        match err {
            SayWriteError::AlreadyExists(msg) => AppError::BadRequest(msg),
            SayWriteError::Unauthorized => {
                AppError::Unauthorized("Could not validate credentials".to_string())
            }
            SayWriteError::BadRequest(msg) => AppError::BadRequest(msg),
            SayWriteError::ServiceUnavailable(msg) => AppError::ServiceUnavailable(msg),
            SayWriteError::Provider(err) => err.into(),
            SayWriteError::Config(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            SayWriteError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Provider configuration problems are the caller's to fix (400); anything
/// else is a server failure
impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        if err.is_configuration() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Upstream(err.to_string())
        }
    }
}
