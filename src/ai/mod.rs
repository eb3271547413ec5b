//! AI Integration Layer
//!
//! Provides the LLM-backed capabilities of discovery: workflow
//! classification, service discovery and component enrichment.

pub mod agents;
pub mod json;
pub mod prompt;
pub mod provider;
pub mod retry;

pub use json::{extract_json_from_response, salvage_array_objects};
pub use prompt::PromptBuilder;
pub use provider::{
    Backend, Completion, ErrorCategory, ErrorClassifier, LlmError, LlmProvider, LlmResponse,
    ProviderConfig, SharedProvider, TokenUsage, create_provider,
};
pub use retry::{RetryPolicy, RetryingProvider};
