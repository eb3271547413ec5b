//! Languages Agent
//!
//! Picks the primary language of a component and the version its manifests
//! declare, from per-language file counts and manifest contents.

use tracing::debug;

use super::AgentSchemas;
use crate::ai::prompt::PromptBuilder;
use crate::ai::provider::LlmProvider;
use crate::types::{DiscoveryError, LanguageInfo, Result, json_string, json_string_or, truncate_chars};

/// Manifest content beyond this is cut before prompting
const MAX_MANIFEST_CHARS: usize = 4_000;

/// What the component directory says about one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageEvidence {
    pub language: String,
    pub file_count: usize,
    /// `(path, content)` of the language's build manifests
    pub manifests: Vec<(String, String)>,
}

pub struct LanguagesAgent;

impl LanguagesAgent {
    pub fn build_prompt(component: &str, evidence: &[LanguageEvidence]) -> String {
        let counts = evidence
            .iter()
            .map(|e| format!("- {}: {} source files", e.language, e.file_count))
            .collect::<Vec<_>>()
            .join("\n");

        let mut builder = PromptBuilder::new()
            .role(
                "software engineer",
                "Determine the primary programming language of this component and its version.",
            )
            .rules(&[
                "Choose one language from the counts below",
                "Take the version from the manifests (e.g. java.version, engines.node, go directive, python_requires); leave it empty if none is declared",
                "Respond with {\"name\", \"version\", \"reason\"}",
            ])
            .section("Component", component)
            .section("Source files per language", &counts);

        for e in evidence {
            for (path, content) in &e.manifests {
                builder = builder.code(
                    &format!("{} manifest: {}", e.language, path),
                    "",
                    truncate_chars(content, MAX_MANIFEST_CHARS),
                );
            }
        }
        builder.build()
    }

    pub async fn detect(
        provider: &dyn LlmProvider,
        component: &str,
        evidence: &[LanguageEvidence],
    ) -> Result<LanguageInfo> {
        let prompt = Self::build_prompt(component, evidence);
        let response = provider
            .generate(&prompt, &AgentSchemas::language_schema())
            .await?;

        let name = json_string(&response.content, "name")
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DiscoveryError::LlmApi("Language answer has no name".to_string()))?;

        debug!(component, language = %name, "Language detected");
        Ok(LanguageInfo {
            name,
            version: json_string_or(&response.content, "version", "").trim().to_string(),
            reason: json_string_or(&response.content, "reason", ""),
        })
    }
}
