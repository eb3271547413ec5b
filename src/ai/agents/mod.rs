//! Prompt Agents
//!
//! Each agent owns one question put to the model: it builds the prompt,
//! names the expected JSON schema, and turns the answer into domain types.
//! Agents return `Err` only for provider failures; callers decide the
//! fallback.
//!
//! ## Agents
//!
//! - `workflow_classifier`: does a CI/CD workflow deploy a service?
//! - `service_discovery`: which candidate directories are deployable services?
//! - `languages`: primary language and version of a component
//! - `owners`: CODEOWNERS entries per service
//! - `contributors`: merge git author aliases into individuals
//! - `tech_stack`: frameworks and libraries declared in a manifest

pub mod contributors;
pub mod languages;
pub mod owners;
pub mod schemas;
pub mod service_discovery;
pub mod tech_stack;
pub mod workflow_classifier;

pub use contributors::{ContributorEntry, ContributorsAgent};
pub use languages::{LanguageEvidence, LanguagesAgent};
pub use owners::{OwnerEntry, OwnersAgent};
pub use schemas::AgentSchemas;
pub use service_discovery::{DiscoveredService, ServiceDiscoveryAgent, ServiceDiscoveryInput};
pub use tech_stack::TechStackAgent;
pub use workflow_classifier::{WorkflowClass, WorkflowClassifierAgent, WorkflowInput};

/// Markdown bullet list, empty for no items
pub(crate) fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted provider for agent and pipeline tests

    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::ai::provider::{Completion, LlmProvider};
    use crate::types::{DiscoveryError, ErrorCategory, LlmError, Result};

    /// Replays queued answers in order; an exhausted queue repeats the fallback
    pub struct ScriptedProvider {
        answers: Mutex<VecDeque<Result<String>>>,
        fallback: Option<String>,
        pub calls: AtomicUsize,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        pub fn new(answers: Vec<&str>) -> Self {
            Self {
                answers: Mutex::new(answers.into_iter().map(|a| Ok(a.to_string())).collect()),
                fallback: None,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Answers every call with `answer`
        pub fn always(answer: &str) -> Self {
            let mut provider = Self::new(Vec::new());
            provider.fallback = Some(answer.to_string());
            provider
        }

        /// Fails every call with an auth error
        pub fn failing() -> Self {
            Self::new(Vec::new())
        }

        pub fn push_error(self, category: ErrorCategory) -> Self {
            self.answers
                .lock()
                .unwrap()
                .push_back(Err(DiscoveryError::Llm(LlmError::new(category, "scripted"))));
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, prompt: &str, _schema: &Value) -> Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            let next = self.answers.lock().unwrap().pop_front();
            match (next, &self.fallback) {
                (Some(answer), _) => answer.map(Completion::text),
                (None, Some(fallback)) => Ok(Completion::text(fallback.clone())),
                (None, None) => Err(DiscoveryError::Llm(LlmError::new(
                    ErrorCategory::Auth,
                    "no scripted answer",
                ))),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }
}
