// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Error handling and HTTP error conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Failures while serving a template.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid template name {0:?}")]
    InvalidName(String),
    #[error("template {0} not found")]
    NotFound(String),
    #[error("reading template {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] linetmpl_engine::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidName(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Read { .. } | ApiError::Parse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidName(_) => "ValidationError",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Read { .. } => "InternalError",
            ApiError::Parse(_) => "ParseError",
        }
    }

    fn to_response(&self) -> ErrorResponse {
        // IO details stay in the server log.
        let message = match self {
            ApiError::Read { name, .. } => format!("template {name} could not be read"),
            other => other.to_string(),
        };
        ErrorResponse {
            error: ErrorDetails {
                code: self.code().to_string(),
                message,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        log_error(&self, status);
        (status, Json(self.to_response())).into_response()
    }
}

/// Log error with appropriate level based on HTTP status.
fn log_error(error: &ApiError, status: StatusCode) {
    if status.is_server_error() {
        tracing::error!("API error: {} - {}", status, error);
    } else {
        tracing::warn!("API error: {} - {}", status, error);
    }
}
