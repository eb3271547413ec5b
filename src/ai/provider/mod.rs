//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait for structured (JSON) completions.
//! The backend is chosen once at startup from [`ProviderConfig::resolve`]
//! and shared by every pipeline as a [`SharedProvider`].
//!
//! ## Modules
//!
//! - `openai`: OpenAI and Azure OpenAI chat completions
//! - `anthropic`: Anthropic messages API

mod anthropic;
mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::json::extract_json_from_response;
use super::retry::{RetryPolicy, RetryingProvider};
use crate::config::{LlmConfig, LlmProviderKind};
use crate::types::{DiscoveryError, Result};

// =============================================================================
// LLM Response
// =============================================================================

/// Raw model output
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
    pub model: String,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Structured response plus token usage
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Parsed JSON content
    pub content: Value,
    pub usage: TokenUsage,
    pub model: String,
}

impl LlmResponse {
    /// Response with content only (usage unknown)
    pub fn content_only(content: Value) -> Self {
        Self {
            content,
            usage: TokenUsage::default(),
            model: String::new(),
        }
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Shared LLM provider type for concurrent access across pipelines
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// LLM Provider Trait
// =============================================================================

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete `prompt`, asking for JSON matching `schema` (`Value::Null` for none)
    async fn complete(&self, prompt: &str, schema: &Value) -> Result<Completion>;

    /// Complete and parse the JSON payload of the answer
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        let completion = self.complete(prompt, schema).await?;
        Ok(LlmResponse {
            content: extract_json_from_response(&completion.text)?,
            usage: completion.usage,
            model: completion.model,
        })
    }

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the provider answers with the configured credentials
    async fn health_check(&self) -> Result<bool>;
}

// =============================================================================
// Provider Configuration
// =============================================================================

/// Concrete backend after `auto` resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    OpenAi,
    AzureOpenAi,
    Anthropic,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::AzureOpenAi => "azure-openai",
            Self::Anthropic => "anthropic",
        }
    }
}

/// Fully resolved provider settings
///
/// API keys are held as `SecretString` and never serialized or printed.
#[derive(Clone)]
pub struct ProviderConfig {
    pub backend: Backend,
    pub model: Option<String>,
    pub api_key: SecretString,
    pub api_base: Option<String>,
    /// Azure OpenAI API version
    pub api_version: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("backend", &self.backend)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve the backend from config and process environment
    pub fn resolve(config: &LlmConfig, model_override: Option<&str>) -> Result<Self> {
        Self::resolve_with(config, model_override, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    ///
    /// `auto` picks the first backend with credentials in the order
    /// OpenAI, Anthropic, Azure OpenAI.
    pub fn resolve_with<F>(config: &LlmConfig, model_override: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let openai = || lookup("OPENAI_API_KEY").map(|k| (Backend::OpenAi, k, None));
        let anthropic = || lookup("ANTHROPIC_API_KEY").map(|k| (Backend::Anthropic, k, None));
        let azure = || {
            let key = lookup("AZURE_OPENAI_API_KEY")?;
            let endpoint = config
                .api_base
                .clone()
                .or_else(|| lookup("AZURE_OPENAI_ENDPOINT"))?;
            Some((Backend::AzureOpenAi, key, Some(endpoint)))
        };

        let resolved = match config.provider {
            LlmProviderKind::Auto => openai().or_else(anthropic).or_else(azure),
            LlmProviderKind::Openai => openai(),
            LlmProviderKind::Anthropic => anthropic(),
            LlmProviderKind::AzureOpenai => azure(),
        };

        let (backend, key, endpoint) = resolved.ok_or_else(|| {
            DiscoveryError::Config(match config.provider {
                LlmProviderKind::Auto => "No LLM credentials found. Set OPENAI_API_KEY, \
                     ANTHROPIC_API_KEY, or AZURE_OPENAI_API_KEY with AZURE_OPENAI_ENDPOINT"
                    .to_string(),
                LlmProviderKind::AzureOpenai => {
                    "Azure OpenAI needs AZURE_OPENAI_API_KEY and AZURE_OPENAI_ENDPOINT".to_string()
                }
                other => format!("Missing API key for provider '{}'", other),
            })
        })?;

        let model = model_override
            .map(str::to_string)
            .or_else(|| config.model.clone())
            .or_else(|| {
                (backend == Backend::AzureOpenAi)
                    .then(|| lookup("AZURE_OPENAI_DEPLOYMENT"))
                    .flatten()
            });

        Ok(Self {
            backend,
            model,
            api_key: SecretString::from(key),
            api_base: endpoint.or_else(|| config.api_base.clone()),
            api_version: config
                .api_version
                .clone()
                .or_else(|| lookup("AZURE_OPENAI_API_VERSION")),
            timeout_secs: config.timeout_secs,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryPolicy::from_config(config),
        })
    }
}

/// Create the shared provider, wrapped with the retry policy
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    let inner: SharedProvider = match config.backend {
        Backend::OpenAi | Backend::AzureOpenAi => Arc::new(OpenAiProvider::new(config)?),
        Backend::Anthropic => Arc::new(AnthropicProvider::new(config)?),
    };
    Ok(Arc::new(RetryingProvider::new(inner, config.retry)))
}

/// Map a non-success HTTP response into a classified error
pub(crate) fn http_error(status: reqwest::StatusCode, body: &str, provider: &str) -> DiscoveryError {
    let message = format!("{} API error ({}): {}", provider, status, body);
    DiscoveryError::Llm(ErrorClassifier::classify_http_status(
        status.as_u16(),
        &message,
        provider,
    ))
}

/// Map a transport failure into a classified error
pub(crate) fn transport_error(err: reqwest::Error, provider: &str) -> DiscoveryError {
    let category = if err.is_timeout() || err.is_connect() {
        ErrorCategory::Network
    } else {
        ErrorClassifier::classify(&err.to_string(), provider).category
    };
    DiscoveryError::Llm(LlmError::with_provider(
        category,
        format!("{} request failed: {}", provider, err),
        provider,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_auto_prefers_openai() {
        let config = LlmConfig::default();
        let resolved = ProviderConfig::resolve_with(
            &config,
            None,
            env(&[("ANTHROPIC_API_KEY", "a"), ("OPENAI_API_KEY", "o")]),
        )
        .unwrap();
        assert_eq!(resolved.backend, Backend::OpenAi);
    }

    #[test]
    fn test_auto_falls_through_to_azure() {
        let config = LlmConfig::default();
        let resolved = ProviderConfig::resolve_with(
            &config,
            Some("gpt-4o"),
            env(&[
                ("AZURE_OPENAI_API_KEY", "z"),
                ("AZURE_OPENAI_ENDPOINT", "https://acme.openai.azure.com"),
            ]),
        )
        .unwrap();
        assert_eq!(resolved.backend, Backend::AzureOpenAi);
        assert_eq!(resolved.api_base.as_deref(), Some("https://acme.openai.azure.com"));
        assert_eq!(resolved.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_azure_without_endpoint_is_config_error() {
        let config = LlmConfig {
            provider: LlmProviderKind::AzureOpenai,
            ..Default::default()
        };
        let err = ProviderConfig::resolve_with(&config, None, env(&[("AZURE_OPENAI_API_KEY", "z")]))
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_credentials() {
        let err = ProviderConfig::resolve_with(&LlmConfig::default(), None, env(&[]))
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Config(_)));

        let blank = ProviderConfig::resolve_with(
            &LlmConfig::default(),
            None,
            env(&[("OPENAI_API_KEY", "  ")]),
        );
        assert!(blank.is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let resolved = ProviderConfig::resolve_with(
            &LlmConfig::default(),
            None,
            env(&[("OPENAI_API_KEY", "sk-very-secret")]),
        )
        .unwrap();
        let debug = format!("{:?}", resolved);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
