//! Anthropic Messages API Provider

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Completion, LlmProvider, ProviderConfig, TokenUsage, http_error, transport_error};
use crate::ai::json::system_prompt;
use crate::types::{DiscoveryError, Result};

const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DiscoveryError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            api_base: config
                .api_base
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_base, path))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, prompt: &str, schema: &Value) -> Result<Completion> {
        debug!(model = %self.model, "Sending Anthropic messages request");

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: system_prompt(schema),
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .request(reqwest::Method::POST, "/v1/messages")
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, "anthropic"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(http_error(status, &body, "anthropic"));
        }

        let body: MessagesResponse = response.json().await.map_err(|e| {
            DiscoveryError::LlmApi(format!("Failed to parse anthropic response: {}", e))
        })?;

        let text: String = body
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();
        if text.is_empty() {
            return Err(DiscoveryError::LlmApi(
                "No text content in anthropic response".to_string(),
            ));
        }

        Ok(Completion {
            text,
            usage: body
                .usage
                .map(|u| TokenUsage {
                    input_tokens: u.input_tokens,
                    output_tokens: u.output_tokens,
                })
                .unwrap_or_default(),
            model: self.model.clone(),
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        match self.request(reqwest::Method::GET, "/v1/models").send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(model = %self.model, "Anthropic API is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "Anthropic API check failed");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Anthropic API check failed");
                Ok(false)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "content": [{"type": "text", "text": "{\"classification\": \"deployment\"}"}],
            "usage": {"input_tokens": 12, "output_tokens": 5}
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content.len(), 1);
        assert_eq!(parsed.usage.unwrap().output_tokens, 5);
    }

    #[test]
    fn test_request_serialization() {
        let request = MessagesRequest {
            model: "m",
            max_tokens: 100,
            temperature: 0.0,
            system: "sys".into(),
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["system"], "sys");
    }
}
