//! Service Discovery Agent
//!
//! Fallback for mono-repos whose CI/CD files reference too few directories
//! to be trusted on their own: the model picks the deployable services from
//! the package-manager candidates.

use serde_json::Value;
use tracing::{debug, warn};

use super::{AgentSchemas, bullet_list};
use crate::ai::prompt::PromptBuilder;
use crate::ai::provider::LlmProvider;
use crate::types::{
    Confidence, PackageManagerDirectory, Result, json_string, json_string_array, truncate_chars,
};

pub struct ServiceDiscoveryInput<'a> {
    /// Repository name, used for the root service
    pub repo_name: &'a str,
    pub candidates: &'a [PackageManagerDirectory],
    /// `(path, content)` of every CI/CD file
    pub cicd_files: &'a [(String, String)],
    pub readme_head: Option<&'a str>,
    pub strong_signal_files: &'a [String],
    pub context: Option<&'a str>,
    /// Characters of each CI/CD file included in the prompt
    pub excerpt_chars: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredService {
    /// Repository-relative directory, empty for the root
    pub path: String,
    pub name: String,
    pub language: Option<String>,
    pub confidence: Confidence,
    pub evidence: Vec<String>,
}

impl DiscoveredService {
    /// Build from one `services[]` item; items without a path are dropped
    fn from_json(item: &Value, repo_name: &str) -> Option<Self> {
        let raw_path = json_string(item, "path")?;
        let path = normalize_path(&raw_path);

        let name = json_string(item, "name")
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| match path.rsplit('/').next() {
                Some(base) if !base.is_empty() => base.to_string(),
                _ => repo_name.to_string(),
            });

        Some(Self {
            path,
            name,
            language: json_string(item, "language").filter(|l| !l.trim().is_empty()),
            confidence: json_string(item, "confidence")
                .and_then(|c| c.parse().ok())
                .unwrap_or_default(),
            evidence: json_string_array(item, "evidence"),
        })
    }
}

/// `./services/api/` → `services/api`; `.` and `/` → root
fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches("./").trim_matches('/');
    if trimmed == "." {
        String::new()
    } else {
        trimmed.to_string()
    }
}

pub struct ServiceDiscoveryAgent;

impl ServiceDiscoveryAgent {
    pub fn build_prompt(input: &ServiceDiscoveryInput<'_>) -> String {
        let candidates = input
            .candidates
            .iter()
            .map(|c| {
                format!(
                    "- Path: {}, Package/Build file: {}, Language: {}",
                    c.path, c.manifest, c.language
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let excerpts = input
            .cicd_files
            .iter()
            .map(|(path, content)| {
                format!(
                    "### {}\n```\n{}\n```",
                    path,
                    truncate_chars(content, input.excerpt_chars)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        PromptBuilder::new()
            .role(
                "software architect",
                "Identify which candidate directories of this mono-repo are independently deployable services.",
            )
            .rules(&[
                "Only choose paths from the candidate list",
                "A service is built and shipped on its own (image, function, app); shared libraries are not services",
                "Prefer directories referenced by the CI/CD files",
                "Respond with {\"services\": [{\"path\", \"name\", \"language\", \"confidence\", \"evidence\": [..]}]}",
            ])
            .raw(input.context)
            .section("Repository", input.repo_name)
            .section("Candidate directories", &candidates)
            .section("CI/CD files (excerpts)", &excerpts)
            .section("Project README (head)", input.readme_head.unwrap_or_default())
            .section("Strong deployment signals", &bullet_list(input.strong_signal_files))
            .build()
    }

    /// Ask the model for services. A well-formed answer without a
    /// `services` list yields an empty list.
    pub async fn discover(
        provider: &dyn LlmProvider,
        input: &ServiceDiscoveryInput<'_>,
    ) -> Result<Vec<DiscoveredService>> {
        let prompt = Self::build_prompt(input);
        let response = provider
            .generate(&prompt, &AgentSchemas::services_schema())
            .await?;

        let items = match &response.content {
            Value::Array(items) => items.as_slice(),
            other => match other.get("services").and_then(Value::as_array) {
                Some(items) => items.as_slice(),
                None => {
                    warn!("Service discovery answer has no services list");
                    return Ok(Vec::new());
                }
            },
        };

        let services: Vec<DiscoveredService> = items
            .iter()
            .filter_map(|item| DiscoveredService::from_json(item, input.repo_name))
            .collect();
        debug!(count = services.len(), "Services discovered by model");
        Ok(services)
    }
}
