//! NDJSON decoding for the upstream search stream.
//!
//! The upstream replies with newline-delimited JSON over chunked transfer.
//! Chunk boundaries carry no meaning, so [`StreamDecoder`] accumulates bytes
//! and only decodes complete lines. Bad lines are logged and skipped.

mod decoder;
mod types;

pub use decoder::{DecoderStats, StreamDecoder, decode_all, decode_line};
pub use types::*;
