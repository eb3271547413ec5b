//! Shared utility functions for type serialization and common operations.
//!
//! ## JSON Extraction Helpers
//!
//! Provides ergonomic helpers for extracting values from `serde_json::Value`:
//! - `json_string`, `json_string_or` - Extract strings
//! - `json_string_array` - Extract string arrays (a bare string counts as one item)

use crate::types::{ComponentType, Confidence, RepoType};
use std::fmt::Display;

// =============================================================================
// JSON Value Extraction Helpers
// =============================================================================

/// Extract string from JSON value by key.
#[inline]
pub fn json_string(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(String::from)
}

/// Extract string with default value.
#[inline]
pub fn json_string_or(value: &serde_json::Value, key: &str, default: &str) -> String {
    json_string(value, key).unwrap_or_else(|| default.to_string())
}

/// Extract string array from JSON value by key.
///
/// Models answer with either a list or a single string; both are accepted.
pub fn json_string_array(value: &serde_json::Value, key: &str) -> Vec<String> {
    match value.get(key) {
        Some(serde_json::Value::Array(arr)) => arr
            .iter()
            .filter_map(|s| s.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

// =============================================================================
// String Utilities
// =============================================================================

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// First `n` lines of a text, joined with newlines.
pub fn head_lines(s: &str, n: usize) -> String {
    s.lines().take(n).collect::<Vec<_>>().join("\n")
}

// =============================================================================
// Type Parsing
// =============================================================================

/// Trait for parsing strings into enum types with a default fallback.
/// Used for database values where invalid strings should fall back gracefully.
pub trait ParseWithDefault: Sized {
    fn type_name() -> &'static str;

    fn default_value() -> Self;

    fn try_parse(s: &str) -> Option<Self>;

    /// Parse a string into this type, returning a default value if parsing fails.
    /// Logs a warning for invalid values to help detect data corruption.
    fn parse_or_default(s: &str) -> Self {
        match Self::try_parse(s) {
            Some(v) => v,
            None => {
                tracing::warn!("Invalid {} value '{}', using default", Self::type_name(), s);
                Self::default_value()
            }
        }
    }
}

impl ParseWithDefault for ComponentType {
    fn type_name() -> &'static str {
        "ComponentType"
    }

    fn default_value() -> Self {
        ComponentType::Unknown
    }

    fn try_parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

impl ParseWithDefault for Confidence {
    fn type_name() -> &'static str {
        "Confidence"
    }

    fn default_value() -> Self {
        Confidence::Medium
    }

    fn try_parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

impl ParseWithDefault for RepoType {
    fn type_name() -> &'static str {
        "RepoType"
    }

    fn default_value() -> Self {
        RepoType::SinglePurpose
    }

    fn try_parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

/// Keep the `Ok` value, logging the error at warn level otherwise.
pub fn log_filter_warn<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("{}: {}", context, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_string_array_accepts_scalar() {
        let v = json!({"owner_team": "payments", "teams": ["a", " b ", ""]});
        assert_eq!(json_string_array(&v, "owner_team"), vec!["payments"]);
        assert_eq!(json_string_array(&v, "teams"), vec!["a", "b"]);
        assert!(json_string_array(&v, "missing").is_empty());
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_head_lines() {
        assert_eq!(head_lines("a\nb\nc", 2), "a\nb");
        assert_eq!(head_lines("a", 5), "a");
    }

    #[test]
    fn test_parse_with_default() {
        assert_eq!(ComponentType::parse_or_default("be"), ComponentType::Be);
        assert_eq!(ComponentType::parse_or_default("???"), ComponentType::Unknown);
        assert_eq!(RepoType::parse_or_default("mono-repo"), RepoType::MonoRepo);
    }
}
