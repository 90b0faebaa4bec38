//! Small helpers for identifier handling and request metadata.

use axum::http::HeaderMap;
use regex::Regex;

/// Normalize an identifier for lookup and rate-limit keying.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub fn valid_identifier(identifier: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(identifier))
}

/// Best-effort login origin for the audit trail: first entry of the
/// forwarded-address list, then the direct-address header, then `"unknown"`.
pub fn extract_login_origin(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(forwarded) = forwarded {
        return forwarded.to_string();
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| "unknown".to_string(), str::to_string)
}
