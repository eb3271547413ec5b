//! Error model
//!
//! `DiscoveryError` is the single error type of the crate. Failures of LLM
//! and GitHub calls carry an [`ErrorCategory`] so retry loops can tell a rate
//! limit from a bad credential, and fatal errors map onto the exit codes of
//! the `discover` command.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    RateLimit,
    Auth,
    Network,
    /// Endpoint, model or deployment does not exist
    Unavailable,
    BadRequest,
    /// The answer was not the JSON we asked for
    ParseError,
    /// 5xx and overload answers
    Transient,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Auth => "auth",
            Self::Network => "network",
            Self::Unavailable => "unavailable",
            Self::BadRequest => "bad_request",
            Self::ParseError => "parse_error",
            Self::Transient => "transient",
            Self::Unknown => "unknown",
        }
    }

    /// Worth another attempt with the same request
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Transient | Self::ParseError | Self::Unknown
        )
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// LLM Error
// =============================================================================

#[derive(Debug, Clone)]
pub struct LlmError {
    pub category: ErrorCategory,
    pub message: String,
    pub provider: Option<String>,
}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            provider: Some(provider.into()),
            ..Self::new(category, message)
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "{} ", provider)?;
        }
        write!(f, "{}: {}", self.category, self.message)
    }
}

impl std::error::Error for LlmError {}

// =============================================================================
// Error Classifier
// =============================================================================

/// Keyword rules checked in order; the first hit decides the category
const MESSAGE_RULES: &[(ErrorCategory, &[&str])] = &[
    (
        ErrorCategory::RateLimit,
        &["rate limit", "429", "too many requests", "quota"],
    ),
    (
        ErrorCategory::Auth,
        &["401", "403", "api key", "unauthorized", "forbidden", "bad credentials"],
    ),
    (
        ErrorCategory::Network,
        &["connection", "dns", "timed out", "timeout", "network"],
    ),
    (
        ErrorCategory::Transient,
        &["500", "502", "503", "504", "overloaded", "temporarily"],
    ),
    (
        ErrorCategory::Unavailable,
        &["404", "not found", "deployment does not exist", "no such model"],
    ),
    (
        ErrorCategory::BadRequest,
        &["400", "422", "bad request", "invalid request", "context length"],
    ),
    (ErrorCategory::ParseError, &["parse", "json", "expected value"]),
];

/// Maps provider and GitHub failures to categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Category from free text, for failures without a usable status code
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();
        let category = MESSAGE_RULES
            .iter()
            .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
            .map(|(category, _)| *category)
            .unwrap_or(ErrorCategory::Unknown);
        LlmError::with_provider(category, message, provider)
    }

    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        let category = match status {
            429 => ErrorCategory::RateLimit,
            401 | 403 => ErrorCategory::Auth,
            404 => ErrorCategory::Unavailable,
            400 | 413 | 422 => ErrorCategory::BadRequest,
            408 => ErrorCategory::Network,
            500..=599 => ErrorCategory::Transient,
            _ => ErrorCategory::Unknown,
        };
        LlmError::with_provider(category, message, provider)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum DiscoveryError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // -------------------------------------------------------------------------
    // LLM Errors
    // -------------------------------------------------------------------------
    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("LLM API error: {0}")]
    LlmApi(String),

    // -------------------------------------------------------------------------
    // Source Control Errors
    // -------------------------------------------------------------------------
    #[error("GitHub API error ({status}): {message}")]
    Github { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Clone failed for {repo}: {message}")]
    Clone { repo: String, message: String },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    #[error("Stage {stage} failed: {message}")]
    Stage { stage: String, message: String },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Interrupted by user")]
    Interrupted,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<LlmError> for DiscoveryError {
    fn from(err: LlmError) -> Self {
        DiscoveryError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;

// =============================================================================
// Helper Functions
// =============================================================================

/// Exit codes reported by the `discover` command
pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const PARTIAL_FAILURE: u8 = 1;
    pub const CONFIG: u8 = 2;
    pub const FETCH: u8 = 3;
    pub const INVALID_INPUT: u8 = 5;
    pub const INTERRUPTED: u8 = 130;
}

impl DiscoveryError {
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub fn github(status: u16, message: impl Into<String>) -> Self {
        Self::Github {
            status,
            message: message.into(),
        }
    }

    /// Category of this error for retry decisions
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Llm(e) => e.category,
            Self::LlmApi(msg) => ErrorClassifier::classify(msg, "llm").category,
            Self::Http(e) if e.is_timeout() || e.is_connect() => ErrorCategory::Network,
            Self::Http(e) => match e.status() {
                Some(status) => ErrorClassifier::classify_http_status(status.as_u16(), "", "http")
                    .category,
                None => ErrorCategory::Network,
            },
            Self::Github { status, message } => {
                if *status == 403 && message.to_lowercase().contains("rate limit") {
                    ErrorCategory::RateLimit
                } else {
                    ErrorClassifier::classify_http_status(*status, message, "github").category
                }
            }
            Self::Timeout { .. } => ErrorCategory::Network,
            Self::Json(_) => ErrorCategory::ParseError,
            Self::Config(_) | Self::Validation(_) => ErrorCategory::BadRequest,
            Self::NotFound(_) => ErrorCategory::Unavailable,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::Interrupted | Self::Config(_) | Self::Validation(_) => false,
            _ => self.category().is_retryable(),
        }
    }

    /// Exit code for errors that abort the whole command
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => exit_code::CONFIG,
            Self::Validation(_) => exit_code::INVALID_INPUT,
            Self::Github { .. } | Self::NotFound(_) | Self::Http(_) => exit_code::FETCH,
            Self::Interrupted => exit_code::INTERRUPTED,
            _ => exit_code::PARTIAL_FAILURE,
        }
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| DiscoveryError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| DiscoveryError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
