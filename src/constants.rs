//! Global Constants
//!
//! Centralized constants for discovery heuristics and tuning.
//! Thresholds here are the defaults; `[discovery]` config overrides them.

/// Signal scanning constants
pub mod signals {
    /// Files larger than this are not treated as evidence (bytes)
    pub const MAX_SIGNAL_FILE_SIZE: u64 = 1024 * 1024;

    /// Number of required categories (package manager, CI/CD, way to run)
    /// at which substantive signals become strong
    pub const STRONG_COMBINATION: usize = 3;

    /// Combination count at which substantive signals become medium
    pub const MEDIUM_COMBINATION: usize = 2;
}

/// Repo-type classifier constants
pub mod repo_type {
    /// Deepest directory level inspected below the root
    pub const MAX_DEPTH: usize = 3;

    /// Score at or above which a repository is a mono-repo
    pub const MONO_REPO_SCORE_THRESHOLD: u32 = 3;
}

/// CI/CD reference matcher constants
pub mod references {
    /// Referenced directories needed to trust CI/CD evidence without an LLM
    pub const REFERENCE_THRESHOLD: usize = 4;

    /// Characters of each CI/CD file passed to the service-discovery prompt
    pub const CICD_EXCERPT_CHARS: usize = 600;
}

/// Prompt context constants
pub mod context {
    /// Maximum characters of user-provided context injected into prompts
    pub const MAX_CONTEXT_CHARS: usize = 4000;

    /// README lines passed along with classification prompts
    pub const README_HEAD_LINES: usize = 20;

    /// File name of the repository-level context inside a checkout
    pub const REPO_CONTEXT_FILE: &str = ".sbs-discovery.md";
}

/// LLM retry constants
pub mod llm {
    /// First retry delay (seconds)
    pub const RETRY_INITIAL_DELAY_SECS: u64 = 2;

    /// Maximum delay between retries (seconds)
    pub const RETRY_MAX_DELAY_SECS: u64 = 30;

    /// Total attempts per call, including the first
    pub const RETRY_MAX_ATTEMPTS: usize = 5;

    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
}

/// GitHub API constants
pub mod github {
    pub const API_BASE: &str = "https://api.github.com";

    /// Page size for repository listings
    pub const PER_PAGE: u32 = 100;

    /// Initial backoff when rate limited (seconds)
    pub const INITIAL_BACKOFF_SECS: u64 = 1;

    /// Backoff ceiling when rate limited (seconds)
    pub const MAX_BACKOFF_SECS: u64 = 60;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;

    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Git subprocess constants
pub mod git {
    /// Clone timeout (seconds)
    pub const CLONE_TIMEOUT_SECS: u64 = 300;

    /// `git shortlog` timeout (seconds)
    pub const SHORTLOG_TIMEOUT_SECS: u64 = 60;

    /// Prefix of temporary checkout directories
    pub const CHECKOUT_PREFIX: &str = "sbs-discovery-";
}

/// Batch runner constants
pub mod workers {
    /// Repositories processed concurrently
    pub const DEFAULT_CONCURRENCY: usize = 4;
}
