//! JSON extraction for LLM responses
//!
//! Models wrap JSON in code fences, add prose around it, leave trailing
//! commas, or stop mid-array when they hit the token limit. Extraction
//! handles the first three; [`salvage_array_objects`] recovers the complete
//! objects from a truncated array.

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{DiscoveryError, Result};

/// System prompt asking for JSON, optionally matching `schema`
pub fn system_prompt(schema: &Value) -> String {
    if schema.is_null() {
        return "You analyze source repositories. Always respond with valid JSON.".to_string();
    }
    let schema_str =
        serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "You analyze source repositories. Always respond with valid JSON matching this schema:\n\n```json\n{}\n```\n\nRespond ONLY with valid JSON, no explanation.",
        schema_str
    )
}

/// Parse the JSON payload of a model response
pub fn extract_json_from_response(raw: &str) -> Result<Value> {
    let cleaned = strip_code_fences(raw.trim().trim_start_matches('\u{feff}'));

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }
    debug!("Direct JSON parse failed, attempting repair");

    let without_commas = remove_trailing_commas(&cleaned);
    if let Ok(value) = serde_json::from_str::<Value>(&without_commas) {
        warn!("JSON repaired (trailing commas)");
        return Ok(value);
    }

    if let Some(embedded) = first_balanced_value(&without_commas)
        && let Ok(value) = serde_json::from_str::<Value>(embedded)
    {
        warn!("JSON extracted from surrounding text");
        return Ok(value);
    }

    Err(DiscoveryError::LlmApi(format!(
        "Failed to parse JSON from model output. Content preview: {}...",
        cleaned.chars().take(200).collect::<String>()
    )))
}

/// Complete `{...}` objects from the first array in `raw`, stopping at the
/// first object that fails to parse
pub fn salvage_array_objects(raw: &str) -> Vec<Value> {
    let Some(start) = raw.find('[') else {
        return Vec::new();
    };

    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut object_start = None;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in raw[start..].char_indices() {
        let i = start + i;
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    object_start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0
                    && let Some(s) = object_start.take()
                {
                    match serde_json::from_str::<Value>(&raw[s..=i]) {
                        Ok(v) => objects.push(v),
                        Err(e) => {
                            debug!(error = %e, "Stopping salvage at malformed object");
                            break;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    debug!(count = objects.len(), "Salvaged objects from partial array");
    objects
}

fn strip_code_fences(s: &str) -> String {
    let mut result = s;
    if result.starts_with("```")
        && let Some(newline) = result.find('\n')
    {
        result = &result[newline + 1..];
    }
    if let Some(stripped) = result.trim_end().strip_suffix("```") {
        result = stripped;
    }
    result.trim().to_string()
}

fn remove_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escape {
            escape = false;
            out.push(ch);
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if matches!(next, Some(']') | Some('}')) {
                    continue;
                }
            }
            _ => {}
        }
        out.push(ch);
    }
    out
}

/// Slice of the first balanced object or array in mixed text
fn first_balanced_value(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in s[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_and_fenced() {
        assert_eq!(
            extract_json_from_response(r#"{"a": 1}"#).unwrap(),
            json!({"a": 1})
        );
        assert_eq!(
            extract_json_from_response("```json\n{\"a\": [1, 2]}\n```").unwrap(),
            json!({"a": [1, 2]})
        );
    }

    #[test]
    fn test_trailing_commas() {
        let value = extract_json_from_response(r#"{"services": [{"path": "api",},],}"#).unwrap();
        assert_eq!(value["services"][0]["path"], "api");
    }

    #[test]
    fn test_commas_inside_strings_kept() {
        let value = extract_json_from_response(r#"{"reason": "a, }", "x": [1,]}"#).unwrap();
        assert_eq!(value["reason"], "a, }");
    }

    #[test]
    fn test_embedded_in_prose() {
        let value = extract_json_from_response(
            "Here is the answer:\n{\"classification\": \"deployment\"}\nThanks!",
        )
        .unwrap();
        assert_eq!(value["classification"], "deployment");
    }

    #[test]
    fn test_unparseable() {
        assert!(extract_json_from_response("deployment").is_err());
    }

    #[test]
    fn test_salvage_truncated_array() {
        let raw = r#"[{"service": "api", "owner_team": ["core"]}, {"service": "*", "owner_team": "platform"}, {"service": "we"#;
        let objects = salvage_array_objects(raw);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[1]["owner_team"], "platform");
    }

    #[test]
    fn test_salvage_without_array() {
        assert!(salvage_array_objects("no json here").is_empty());
    }

    #[test]
    fn test_system_prompt_mentions_schema() {
        let schema = json!({"type": "object"});
        assert!(system_prompt(&schema).contains("\"type\""));
        assert!(system_prompt(&Value::Null).contains("JSON"));
    }
}
