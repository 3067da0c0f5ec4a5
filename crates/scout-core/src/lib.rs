//! `Scout` Core Library
//!
//! Shared functionality for `Scout` components:
//! - Incremental NDJSON stream decoding for the upstream search stream
//! - Profile payload classification
//! - Configuration resolution
//! - Common error types

pub mod config;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod ndjson;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use ndjson::{Record, StreamDecoder};
