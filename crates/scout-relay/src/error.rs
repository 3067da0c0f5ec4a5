//! Relay error taxonomy and its HTTP rendering.

use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Failures reported to callers of the relay.
///
/// Malformed NDJSON lines never show up here; the decoder absorbs them.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Could not connect to the upstream {0} service")]
    TransportUnavailable(&'static str),

    #[error("Upstream call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Upstream error ({status}): {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Upstream returned an unreadable body: {0}")]
    InvalidUpstreamBody(String),

    #[error("Profile '{0}' not found or invalid identifier")]
    ProfileNotFound(String),

    #[error("Profile service error ({code}): {message}")]
    UpstreamSemantic { code: String, message: String },

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::TransportUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::InvalidUpstreamBody(_) => StatusCode::BAD_GATEWAY,
            Self::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamSemantic { .. } | Self::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs and metrics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::TransportUnavailable(_) => "transport_unavailable",
            Self::Timeout(_) => "timeout",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::InvalidUpstreamBody(_) => "invalid_upstream_body",
            Self::ProfileNotFound(_) => "profile_not_found",
            Self::UpstreamSemantic { .. } => "upstream_semantic",
            Self::Client(_) => "client",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
