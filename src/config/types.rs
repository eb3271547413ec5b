//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Every section is `#[serde(default)]` so partial TOML files merge cleanly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants;
use crate::types::{DiscoveryError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// GitHub API and clone settings
    pub github: GithubConfig,

    /// Heuristic thresholds and enrichment knobs
    pub discovery: DiscoveryConfig,

    /// Batch concurrency
    pub workers: WorkersConfig,

    /// Persistence settings
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            github: GithubConfig::default(),
            discovery: DiscoveryConfig::default(),
            workers: WorkersConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `DiscoveryError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(DiscoveryError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(DiscoveryError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.retry_max_attempts == 0 {
            return Err(DiscoveryError::Config(
                "LLM retry_max_attempts must be at least 1".to_string(),
            ));
        }

        if self.llm.retry_initial_delay_secs > self.llm.retry_max_delay_secs {
            return Err(DiscoveryError::Config(format!(
                "LLM retry_initial_delay_secs ({}) exceeds retry_max_delay_secs ({})",
                self.llm.retry_initial_delay_secs, self.llm.retry_max_delay_secs
            )));
        }

        if self.github.per_page == 0 || self.github.per_page > 100 {
            return Err(DiscoveryError::Config(format!(
                "GitHub per_page must be between 1 and 100, got {}",
                self.github.per_page
            )));
        }

        if self.discovery.reference_threshold == 0 {
            return Err(DiscoveryError::Config(
                "Discovery reference_threshold must be greater than 0".to_string(),
            ));
        }

        if self.workers.concurrency == 0 {
            return Err(DiscoveryError::Config(
                "Workers concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

/// Which LLM backend to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LlmProviderKind {
    /// First backend with credentials in the environment
    #[default]
    Auto,
    Openai,
    AzureOpenai,
    Anthropic,
}

impl std::fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Openai => write!(f, "openai"),
            Self::AzureOpenai => write!(f, "azure-openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl std::str::FromStr for LlmProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "openai" => Ok(Self::Openai),
            "azure-openai" | "azure" => Ok(Self::AzureOpenai),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            _ => Err(format!(
                "Unknown LLM provider: {}. Valid values: auto, openai, azure-openai, anthropic",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,

    /// Model or deployment name; provider default when unset
    pub model: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,

    pub max_tokens: u32,

    /// Override for the provider endpoint
    pub api_base: Option<String>,

    /// Azure OpenAI API version
    pub api_version: Option<String>,

    pub retry_initial_delay_secs: u64,
    pub retry_max_delay_secs: u64,
    pub retry_max_attempts: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::Auto,
            model: None,
            timeout_secs: constants::llm::DEFAULT_TIMEOUT_SECS,
            temperature: 0.0,
            max_tokens: 4096,
            api_base: None,
            api_version: None,
            retry_initial_delay_secs: constants::llm::RETRY_INITIAL_DELAY_SECS,
            retry_max_delay_secs: constants::llm::RETRY_MAX_DELAY_SECS,
            retry_max_attempts: constants::llm::RETRY_MAX_ATTEMPTS,
        }
    }
}

// =============================================================================
// GitHub Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_base: String,
    pub per_page: u32,
    pub request_timeout_secs: u64,
    pub max_backoff_secs: u64,
    /// Leave archived repositories out of org listings
    pub skip_archived: bool,
    pub clone_timeout_secs: u64,
    /// Clone with `--depth 1` (contributor history is lost)
    pub shallow_clone: bool,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: constants::github::API_BASE.to_string(),
            per_page: constants::github::PER_PAGE,
            request_timeout_secs: constants::github::REQUEST_TIMEOUT_SECS,
            max_backoff_secs: constants::github::MAX_BACKOFF_SECS,
            skip_archived: true,
            clone_timeout_secs: constants::git::CLONE_TIMEOUT_SECS,
            shallow_clone: false,
        }
    }
}

// =============================================================================
// Discovery Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Referenced directories needed to skip the LLM service discovery
    pub reference_threshold: usize,
    /// Repo-type score at or above which a repository is a mono-repo
    pub mono_repo_score_threshold: u32,
    pub repo_type_max_depth: usize,
    /// Size ceiling for evidence files (bytes)
    pub max_signal_file_size: u64,
    pub readme_head_lines: usize,
    pub cicd_excerpt_chars: usize,
    pub context_max_chars: usize,
    /// Directory holding `<org>.md` context files; `~/.sbs-discovery` when unset
    pub org_context_dir: Option<PathBuf>,
    pub contributors_timeout_secs: u64,
    /// Contributor names skipped when reading git history
    pub ignored_contributors: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            reference_threshold: constants::references::REFERENCE_THRESHOLD,
            mono_repo_score_threshold: constants::repo_type::MONO_REPO_SCORE_THRESHOLD,
            repo_type_max_depth: constants::repo_type::MAX_DEPTH,
            max_signal_file_size: constants::signals::MAX_SIGNAL_FILE_SIZE,
            readme_head_lines: constants::context::README_HEAD_LINES,
            cicd_excerpt_chars: constants::references::CICD_EXCERPT_CHARS,
            context_max_chars: constants::context::MAX_CONTEXT_CHARS,
            org_context_dir: None,
            contributors_timeout_secs: constants::git::SHORTLOG_TIMEOUT_SECS,
            ignored_contributors: vec!["renovate".to_string()],
        }
    }
}

impl DiscoveryConfig {
    /// Resolved org context directory
    pub fn org_context_dir(&self) -> Option<PathBuf> {
        self.org_context_dir.clone().or_else(|| {
            directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".sbs-discovery"))
        })
    }
}

// =============================================================================
// Workers & Storage
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub concurrency: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            concurrency: constants::workers::DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(".sbs-discovery/discovery.db"),
        }
    }
}
