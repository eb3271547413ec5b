//! Contributors Agent
//!
//! Merges `git shortlog` author aliases (same person, different names or
//! emails) into individuals.

use serde_json::Value;
use tracing::debug;

use super::AgentSchemas;
use crate::ai::prompt::PromptBuilder;
use crate::ai::provider::LlmProvider;
use crate::types::{Individual, Result, json_string, json_string_array};

/// One `git shortlog -sne` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorEntry {
    pub commits: u32,
    pub name: String,
    pub email: String,
}

impl ContributorEntry {
    /// Individual per entry, used when merging is unavailable
    pub fn into_individual(self) -> Individual {
        Individual {
            name: self.name,
            github: None,
            emails: vec![self.email],
        }
    }
}

pub struct ContributorsAgent;

impl ContributorsAgent {
    pub fn build_prompt(entries: &[ContributorEntry]) -> String {
        let lines = entries
            .iter()
            .map(|e| format!("{}\t{} <{}>", e.commits, e.name, e.email))
            .collect::<Vec<_>>()
            .join("\n");

        PromptBuilder::new()
            .role(
                "engineering manager",
                "Group these git authors into distinct people.",
            )
            .rules(&[
                "Merge entries that are clearly the same person (same email, or name variants with matching emails)",
                "Drop bots and automation accounts",
                "Keep every email of a person",
                "Respond with {\"individuals\": [{\"name\", \"emails\": [..]}]}",
            ])
            .code("git shortlog -sne", "", &lines)
            .build()
    }

    pub async fn merge(
        provider: &dyn LlmProvider,
        entries: &[ContributorEntry],
    ) -> Result<Vec<Individual>> {
        let prompt = Self::build_prompt(entries);
        let response = provider
            .generate(&prompt, &AgentSchemas::contributors_schema())
            .await?;

        let items = match &response.content {
            Value::Array(items) => items.clone(),
            other => other
                .get("individuals")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        };

        let individuals: Vec<Individual> = items
            .iter()
            .filter_map(|item| {
                let name = json_string(item, "name")?.trim().to_string();
                (!name.is_empty()).then(|| Individual {
                    name,
                    github: None,
                    emails: json_string_array(item, "emails"),
                })
            })
            .collect();

        debug!(
            entries = entries.len(),
            individuals = individuals.len(),
            "Contributors merged"
        );
        Ok(individuals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::agents::testing::ScriptedProvider;

    fn entries() -> Vec<ContributorEntry> {
        vec![
            ContributorEntry {
                commits: 42,
                name: "Jane Doe".into(),
                email: "jane@acme.io".into(),
            },
            ContributorEntry {
                commits: 3,
                name: "jdoe".into(),
                email: "jane@users.noreply.github.com".into(),
            },
        ]
    }

    #[test]
    fn test_prompt_contains_shortlog_lines() {
        let prompt = ContributorsAgent::build_prompt(&entries());
        assert!(prompt.contains("42\tJane Doe <jane@acme.io>"));
    }

    #[tokio::test]
    async fn test_merge_parses_individuals() {
        let provider = ScriptedProvider::new(vec![
            r#"{"individuals": [{"name": "Jane Doe", "emails": ["jane@acme.io", "jane@users.noreply.github.com"]}, {"name": ""}]}"#,
        ]);
        let individuals = ContributorsAgent::merge(&provider, &entries()).await.unwrap();
        assert_eq!(individuals.len(), 1);
        assert_eq!(individuals[0].emails.len(), 2);
    }

    #[test]
    fn test_into_individual() {
        let individual = entries().remove(0).into_individual();
        assert_eq!(individual.name, "Jane Doe");
        assert_eq!(individual.emails, vec!["jane@acme.io"]);
    }
}
