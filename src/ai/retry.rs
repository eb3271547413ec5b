//! Retry policy for LLM calls
//!
//! Exponential backoff with jitter, bounded attempts, and retries only for
//! recoverable failures (rate limits, network, transient server errors,
//! unparseable output).

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde_json::Value;
use std::time::Duration;
use tracing::{instrument, warn};

use super::provider::{Completion, LlmProvider, LlmResponse, SharedProvider};
use crate::config::LlmConfig;
use crate::constants;
use crate::types::{DiscoveryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Total attempts including the first call
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(constants::llm::RETRY_INITIAL_DELAY_SECS),
            max_delay: Duration::from_secs(constants::llm::RETRY_MAX_DELAY_SECS),
            max_attempts: constants::llm::RETRY_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            initial_delay: Duration::from_secs(config.retry_initial_delay_secs),
            max_delay: Duration::from_secs(config.retry_max_delay_secs),
            max_attempts: config.retry_max_attempts.max(1),
        }
    }

    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1))
            .with_jitter()
    }
}

/// Provider decorator applying a [`RetryPolicy`] to every completion
pub struct RetryingProvider {
    inner: SharedProvider,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: SharedProvider, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

fn log_retry(err: &DiscoveryError, delay: Duration) {
    warn!(
        error = %err,
        category = %err.category(),
        delay_ms = delay.as_millis() as u64,
        "LLM call failed, retrying"
    );
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    #[instrument(skip_all, fields(provider = self.inner.name()))]
    async fn complete(&self, prompt: &str, schema: &Value) -> Result<Completion> {
        let inner = &self.inner;
        let call = || async move { inner.complete(prompt, schema).await };

        call.retry(self.policy.backoff())
            .when(|e: &DiscoveryError| e.is_recoverable())
            .notify(log_retry)
            .await
    }

    /// Unparseable answers are retried along with transport failures
    #[instrument(skip_all, fields(provider = self.inner.name()))]
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        let inner = &self.inner;
        let call = || async move { inner.generate(prompt, schema).await };

        call.retry(self.policy.backoff())
            .when(|e: &DiscoveryError| e.is_recoverable())
            .notify(log_retry)
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn health_check(&self) -> Result<bool> {
        self.inner.health_check().await
    }
}
