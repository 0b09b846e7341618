//! Mapping of gateway errors onto HTTP responses

use crate::error::{BackendFailure, DecodeError, ServiceError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

/// JSON body of every error response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<Vec<BackendFailure>>,
}

/// Handler error carrying a [`ServiceError`]
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl ApiError {
    /// HTTP status for the wrapped error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Decode(_) | ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Configuration(_) => StatusCode::FAILED_DEPENDENCY,
            ServiceError::AllBackendsFailed { .. } => StatusCode::BAD_GATEWAY,
            ServiceError::Model(_) | ServiceError::Io(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let attempts = match &self.0 {
            ServiceError::AllBackendsFailed { attempts } => Some(attempts.clone()),
            _ => None,
        };
        ErrorBody {
            success: false,
            error: self.0.to_string(),
            attempts,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        Self(error)
    }
}

impl From<DecodeError> for ApiError {
    fn from(error: DecodeError) -> Self {
        Self(ServiceError::Decode(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "Request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
