//! OpenAI Chat Completions Provider
//!
//! Serves both api.openai.com and Azure OpenAI deployments. The two differ
//! only in URL layout and the authentication header.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    Backend, Completion, LlmProvider, ProviderConfig, TokenUsage, http_error, transport_error,
};
use crate::ai::json::system_prompt;
use crate::types::{DiscoveryError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_AZURE_API_VERSION: &str = "2024-06-01";

pub struct OpenAiProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    /// Set for Azure deployments
    azure_api_version: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("azure_api_version", &self.azure_api_version)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let azure = config.backend == Backend::AzureOpenAi;

        let api_base = match (&config.api_base, azure) {
            (Some(base), _) => base.trim_end_matches('/').to_string(),
            (None, false) => DEFAULT_API_BASE.to_string(),
            (None, true) => {
                return Err(DiscoveryError::Config(
                    "Azure OpenAI endpoint not configured".to_string(),
                ));
            }
        };

        let model = match (&config.model, azure) {
            (Some(m), _) => m.clone(),
            (None, false) => DEFAULT_MODEL.to_string(),
            (None, true) => {
                return Err(DiscoveryError::Config(
                    "Azure OpenAI needs a deployment name (--llm or AZURE_OPENAI_DEPLOYMENT)"
                        .to_string(),
                ));
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DiscoveryError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            azure_api_version: azure.then(|| {
                config
                    .api_version
                    .clone()
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string())
            }),
            client,
        })
    }

    fn completions_url(&self) -> String {
        match &self.azure_api_version {
            Some(version) => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.api_base, self.model, version
            ),
            None => format!("{}/chat/completions", self.api_base),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.azure_api_version {
            Some(_) => request.header("api-key", self.api_key.expose_secret()),
            None => request.header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            ),
        }
    }

    fn build_request(&self, prompt: &str, schema: &Value) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(schema),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            response_format: Some(ResponseFormat {
                format_type: "json_object",
            }),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str, schema: &Value) -> Result<Completion> {
        debug!(model = %self.model, provider = self.name(), "Sending completion request");

        let start = Instant::now();
        let request = self.build_request(prompt, schema);

        let response = self
            .authorize(self.client.post(self.completions_url()))
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.name()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(http_error(status, &body, self.name()));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            DiscoveryError::LlmApi(format!("Failed to parse {} response: {}", self.name(), e))
        })?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let text = body
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| DiscoveryError::LlmApi(format!("No content in {} response", self.name())))?;

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            tokens = usage.total(),
            "Completion received"
        );

        Ok(Completion {
            text: text.to_string(),
            usage,
            model: self.model.clone(),
        })
    }

    fn name(&self) -> &str {
        if self.azure_api_version.is_some() {
            "azure-openai"
        } else {
            "openai"
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        // Azure has no cheap list endpoint per deployment; a tiny completion works for both
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: "Reply with {\"ok\": true}".to_string(),
            }],
            temperature: 0.0,
            max_tokens: Some(16),
            response_format: None,
        };

        let response = self
            .authorize(self.client.post(self.completions_url()))
            .json(&request)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!(provider = self.name(), model = %self.model, "LLM provider is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!(provider = self.name(), status = %resp.status(), "LLM health check failed");
                Ok(false)
            }
            Err(e) => {
                warn!(provider = self.name(), error = %e, "LLM health check failed");
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}
