//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;
use webtop_auth::AuthError;
use webtop_core::error::WebtopError;
use webtop_core::gateway::GatewayError;

/// Wraps a `WebtopError` so handlers can return it with `?`.
#[derive(Debug)]
pub struct ApiError(pub WebtopError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            WebtopError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
            WebtopError::Forbidden { .. } => StatusCode::FORBIDDEN,
            WebtopError::NotFound { .. } => StatusCode::NOT_FOUND,
            WebtopError::ApplicationDisabled { .. } | WebtopError::AlreadyExists { .. } => {
                StatusCode::CONFLICT
            }
            WebtopError::Validation { .. } => StatusCode::BAD_REQUEST,
            WebtopError::Gateway(GatewayError::Unavailable { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            WebtopError::Gateway(_)
            | WebtopError::LaunchFailed { .. }
            | WebtopError::StopFailed { .. } => StatusCode::BAD_GATEWAY,
            WebtopError::Database(_) | WebtopError::Crypto(_) | WebtopError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<WebtopError> for ApiError {
    fn from(err: WebtopError) -> Self {
        Self(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal details stay in the log.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
