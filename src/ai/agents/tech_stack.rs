//! Tech Stack Agent
//!
//! One call per manifest: frameworks, runtimes and notable libraries with
//! the lines that declare them.

use serde_json::Value;
use tracing::{debug, warn};

use super::AgentSchemas;
use crate::ai::prompt::PromptBuilder;
use crate::ai::provider::LlmProvider;
use crate::types::{Result, TechStack, truncate_chars};

const MAX_MANIFEST_CHARS: usize = 12_000;

pub struct TechStackAgent;

impl TechStackAgent {
    pub fn build_prompt(path: &str, content: &str) -> String {
        PromptBuilder::new()
            .role(
                "software engineer",
                "List the frameworks, runtimes and notable libraries this build manifest declares.",
            )
            .rules(&[
                "Only report what the manifest declares; do not guess",
                "Skip test-only and lint/format tooling",
                "Give the declared version, or an empty string",
                "Each entry cites the manifest path and the declaring snippet as evidence",
                "Respond with {\"tech_stacks\": [{\"name\", \"version\", \"confidence\", \"evidence\": [{\"path\", \"snippet\", \"reason\"}]}]}",
            ])
            .section("Manifest path", path)
            .code("Manifest content", "", truncate_chars(content, MAX_MANIFEST_CHARS))
            .build()
    }

    pub async fn detect(
        provider: &dyn LlmProvider,
        path: &str,
        content: &str,
    ) -> Result<Vec<TechStack>> {
        let prompt = Self::build_prompt(path, content);
        let response = provider
            .generate(&prompt, &AgentSchemas::tech_stack_schema())
            .await?;

        let items = match response.content {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("tech_stacks") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        let stacks: Vec<TechStack> = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<TechStack>(item) {
                Ok(stack) if !stack.name.trim().is_empty() => Some(stack),
                Ok(_) => None,
                Err(e) => {
                    warn!(path, error = %e, "Skipping malformed tech stack entry");
                    None
                }
            })
            .collect();

        debug!(path, count = stacks.len(), "Tech stack detected");
        Ok(stacks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::agents::testing::ScriptedProvider;
    use crate::types::Confidence;

    #[tokio::test]
    async fn test_detect_keeps_valid_entries() {
        let provider = ScriptedProvider::new(vec![
            r#"{"tech_stacks": [
                {"name": "spring-boot", "version": "3.2.1", "confidence": "high",
                 "evidence": [{"path": "pom.xml", "snippet": "<artifactId>spring-boot-starter</artifactId>"}]},
                {"name": "", "version": "1"},
                {"name": "kafka", "confidence": "certain"}
            ]}"#,
        ]);
        let stacks = TechStackAgent::detect(&provider, "pom.xml", "<project/>")
            .await
            .unwrap();
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks[0].name, "spring-boot");
        assert_eq!(stacks[0].confidence, Confidence::High);
        assert_eq!(stacks[0].evidence[0].path, "pom.xml");
    }

    #[test]
    fn test_prompt_includes_manifest() {
        let prompt = TechStackAgent::build_prompt("go.mod", "module example.com/x\n\ngo 1.22");
        assert!(prompt.contains("## Manifest path\ngo.mod"));
        assert!(prompt.contains("go 1.22"));
    }
}
