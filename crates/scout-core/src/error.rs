//! Error types for `Scout` core library.

use thiserror::Error;

/// Result type alias using `Scout` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `Scout` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A single NDJSON line could not be decoded
    #[error("Malformed NDJSON line ({reason}): {preview}")]
    MalformedLine { reason: String, preview: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
