//! Workflow Classifier Agent
//!
//! Decides whether a CI/CD workflow performs an actual service deployment
//! or only runs tooling (tests, lint, release chores).

use serde_json::Value;
use std::fmt;
use tracing::debug;

use super::{AgentSchemas, bullet_list};
use crate::ai::prompt::PromptBuilder;
use crate::ai::provider::LlmProvider;
use crate::types::{Result, json_string_or, truncate_chars};

/// Workflow content beyond this is cut before prompting
const MAX_WORKFLOW_CHARS: usize = 12_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowClass {
    Deployment,
    Tooling,
    Unknown,
}

impl WorkflowClass {
    /// Parse a model answer; anything unexpected is `Unknown`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "deployment" => Self::Deployment,
            "tooling" => Self::Tooling,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for WorkflowClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deployment => write!(f, "deployment"),
            Self::Tooling => write!(f, "tooling"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

pub struct WorkflowInput<'a> {
    pub path: &'a str,
    pub content: &'a str,
    pub readme_head: Option<&'a str>,
    pub strong_signal_files: &'a [String],
    /// Formatted discovery context, if any
    pub context: Option<&'a str>,
}

pub struct WorkflowClassifierAgent;

impl WorkflowClassifierAgent {
    pub fn build_prompt(input: &WorkflowInput<'_>) -> String {
        PromptBuilder::new()
            .role(
                "DevOps engineer",
                "Classify whether this CI/CD workflow deploys a service built from this repository.",
            )
            .rules(&[
                "deployment: the workflow builds and ships a runnable artifact (image push, kubectl/helm, serverless deploy, cloud deploy)",
                "tooling: tests, linting, dependency updates, docs, releases of libraries, or housekeeping only",
                "unknown: not enough information to tell",
                "Respond with {\"classification\": \"deployment\" | \"tooling\" | \"unknown\"}",
            ])
            .raw(input.context)
            .section("Workflow path", input.path)
            .code(
                "Workflow content",
                "yaml",
                truncate_chars(input.content, MAX_WORKFLOW_CHARS),
            )
            .section("Project README (head)", input.readme_head.unwrap_or_default())
            .section(
                "Other strong deployment signals",
                &bullet_list(input.strong_signal_files),
            )
            .build()
    }

    pub async fn classify(
        provider: &dyn LlmProvider,
        input: &WorkflowInput<'_>,
    ) -> Result<WorkflowClass> {
        let prompt = Self::build_prompt(input);
        let response = provider
            .generate(&prompt, &AgentSchemas::workflow_schema())
            .await?;

        let raw = match &response.content {
            Value::String(s) => s.clone(),
            other => json_string_or(other, "classification", ""),
        };
        let class = WorkflowClass::parse(&raw);
        debug!(path = input.path, classification = %class, "Workflow classified");
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::agents::testing::ScriptedProvider;

    fn input<'a>(content: &'a str, strong: &'a [String]) -> WorkflowInput<'a> {
        WorkflowInput {
            path: ".github/workflows/ci.yml",
            content,
            readme_head: Some("# Shop API"),
            strong_signal_files: strong,
            context: None,
        }
    }

    #[test]
    fn test_parse_is_lenient() {
        assert_eq!(WorkflowClass::parse(" Deployment\n"), WorkflowClass::Deployment);
        assert_eq!(WorkflowClass::parse("TOOLING"), WorkflowClass::Tooling);
        assert_eq!(WorkflowClass::parse("deploy"), WorkflowClass::Unknown);
        assert_eq!(WorkflowClass::parse(""), WorkflowClass::Unknown);
    }

    #[test]
    fn test_prompt_contains_inputs() {
        let strong = vec!["Dockerfile".to_string()];
        let prompt = WorkflowClassifierAgent::build_prompt(&input("on: push", &strong));
        assert!(prompt.contains(".github/workflows/ci.yml"));
        assert!(prompt.contains("on: push"));
        assert!(prompt.contains("# Shop API"));
        assert!(prompt.contains("- Dockerfile"));
    }

    #[tokio::test]
    async fn test_classify_reads_classification_field() {
        let provider = ScriptedProvider::new(vec![r#"{"classification": "Deployment"}"#]);
        let class = WorkflowClassifierAgent::classify(&provider, &input("x", &[]))
            .await
            .unwrap();
        assert_eq!(class, WorkflowClass::Deployment);
    }

    #[tokio::test]
    async fn test_unexpected_answer_is_unknown() {
        let provider = ScriptedProvider::new(vec![r#"{"classification": "maybe"}"#]);
        let class = WorkflowClassifierAgent::classify(&provider, &input("x", &[]))
            .await
            .unwrap();
        assert_eq!(class, WorkflowClass::Unknown);
    }

    #[tokio::test]
    async fn test_provider_failure_is_err() {
        let provider = ScriptedProvider::failing();
        assert!(
            WorkflowClassifierAgent::classify(&provider, &input("x", &[]))
                .await
                .is_err()
        );
    }
}
