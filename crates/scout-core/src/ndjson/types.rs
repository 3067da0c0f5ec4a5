//! Record and profile payload types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decoded NDJSON line. The search stream yields objects, but any JSON
/// value is kept as-is.
pub type Record = Value;

/// Upstream error code meaning the profile does not exist or the identifier
/// is invalid.
pub const PROFILE_NOT_FOUND_CODE: &str = "020000";

/// First entry of the `errors` list carried by a 2xx profile reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileErrorEntry {
    pub code: String,
    pub message: String,
}

/// Outcome of inspecting a decoded profile body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileStatus {
    Found,
    NotFound,
    Failed(ProfileErrorEntry),
}

/// Classify a profile body by its optional `errors` list.
///
/// Tolerant reader: a missing or empty list means the profile was found,
/// missing fields inside an entry get placeholders.
pub fn classify_profile(body: &Value) -> ProfileStatus {
    let Some(first) = body
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
    else {
        return ProfileStatus::Found;
    };

    let code = match first.get("code") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "N/A".to_string(),
    };
    if code == PROFILE_NOT_FOUND_CODE {
        return ProfileStatus::NotFound;
    }

    let message = first
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error from profile service")
        .to_string();

    ProfileStatus::Failed(ProfileErrorEntry { code, message })
}
