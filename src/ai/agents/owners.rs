//! Owners Agent
//!
//! Reads a CODEOWNERS file into `(service, teams)` entries. CODEOWNERS can
//! be long, so answers cut off mid-array are salvaged object by object.

use serde_json::Value;
use tracing::{debug, warn};

use super::AgentSchemas;
use crate::ai::json::{extract_json_from_response, salvage_array_objects};
use crate::ai::prompt::PromptBuilder;
use crate::ai::provider::LlmProvider;
use crate::types::{Result, json_string, json_string_array};

/// Service key of the catch-all CODEOWNERS rule
pub const DEFAULT_SERVICE: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerEntry {
    pub service: String,
    pub teams: Vec<String>,
}

impl OwnerEntry {
    fn from_json(item: &Value) -> Option<Self> {
        let service = json_string(item, "service")?.trim().to_string();
        let teams = json_string_array(item, "owner_team");
        (!service.is_empty() && !teams.is_empty()).then_some(Self { service, teams })
    }

    pub fn is_default(&self) -> bool {
        self.service == DEFAULT_SERVICE
    }
}

/// Teams owning `component`: the first specific entry whose service contains
/// the component name (case-insensitive), else the `*` default
pub fn teams_for(entries: &[OwnerEntry], component: &str) -> Option<Vec<String>> {
    let needle = component.trim().to_lowercase();
    let specific = (!needle.is_empty())
        .then(|| {
            entries
                .iter()
                .filter(|e| !e.is_default())
                .find(|e| e.service.to_lowercase().contains(&needle))
        })
        .flatten();

    specific
        .or_else(|| entries.iter().find(|e| e.is_default()))
        .map(|e| e.teams.clone())
}

/// Parse owner entries from raw model text
pub fn parse_owner_entries(raw: &str) -> Vec<OwnerEntry> {
    let items = match extract_json_from_response(raw) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(mut map)) => match map.remove("owners") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        Ok(_) => Vec::new(),
        Err(e) => {
            let salvaged = salvage_array_objects(raw);
            warn!(
                error = %e,
                salvaged = salvaged.len(),
                "Owners answer is not valid JSON, salvaging complete entries"
            );
            salvaged
        }
    };

    items.iter().filter_map(OwnerEntry::from_json).collect()
}

pub struct OwnersAgent;

impl OwnersAgent {
    pub fn build_prompt(codeowners: &str) -> String {
        PromptBuilder::new()
            .role(
                "platform engineer",
                "Extract the owning team of each service or path from this CODEOWNERS file.",
            )
            .rules(&[
                "One entry per rule line; use the path pattern or service name as `service`",
                "Use `*` as the service of the catch-all rule",
                "owner_team is the team handle (e.g. @acme/payments); use a list when a rule names several",
                "Skip comments and individual users when a team is present",
                "Respond with {\"owners\": [{\"service\", \"owner_team\"}]}",
            ])
            .code("CODEOWNERS", "", codeowners)
            .build()
    }

    pub async fn extract(provider: &dyn LlmProvider, codeowners: &str) -> Result<Vec<OwnerEntry>> {
        let prompt = Self::build_prompt(codeowners);
        let completion = provider
            .complete(&prompt, &AgentSchemas::owners_schema())
            .await?;
        let entries = parse_owner_entries(&completion.text);
        debug!(count = entries.len(), "Owner entries extracted");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::agents::testing::ScriptedProvider;

    fn entry(service: &str, teams: &[&str]) -> OwnerEntry {
        OwnerEntry {
            service: service.into(),
            teams: teams.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_string_or_list_team() {
        let entries = parse_owner_entries(
            r#"{"owners": [
                {"service": "*", "owner_team": "@acme/platform"},
                {"service": "/services/payments/", "owner_team": ["@acme/pay", "@acme/risk"]},
                {"service": "docs", "owner_team": []}
            ]}"#,
        );
        assert_eq!(
            entries,
            vec![
                entry("*", &["@acme/platform"]),
                entry("/services/payments/", &["@acme/pay", "@acme/risk"]),
            ]
        );
    }

    #[test]
    fn test_parse_salvages_truncated_array() {
        let entries = parse_owner_entries(
            r#"{"owners": [{"service": "api", "owner_team": "@a"}, {"service": "web", "owner_team": "@b"}, {"service": "wor"#,
        );
        assert_eq!(entries, vec![entry("api", &["@a"]), entry("web", &["@b"])]);
    }

    #[test]
    fn test_teams_for_prefers_specific_entry() {
        let entries = vec![
            entry("*", &["@acme/platform"]),
            entry("/services/payments/", &["@acme/pay"]),
        ];
        assert_eq!(teams_for(&entries, "Payments"), Some(vec!["@acme/pay".into()]));
        assert_eq!(teams_for(&entries, "search"), Some(vec!["@acme/platform".into()]));
        assert_eq!(teams_for(&entries, ""), Some(vec!["@acme/platform".into()]));
        assert_eq!(teams_for(&entries[1..], "search"), None);
    }

    #[tokio::test]
    async fn test_extract_uses_raw_completion() {
        let provider = ScriptedProvider::new(vec![r#"[{"service": "*", "owner_team": "@x"}]"#]);
        let entries = OwnersAgent::extract(&provider, "* @x").await.unwrap();
        assert_eq!(entries, vec![entry("*", &["@x"])]);
        assert!(provider.last_prompt().contains("* @x"));
    }
}
