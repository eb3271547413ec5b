//! sbs-discovery - Self-Built Software Discovery
//!
//! Scans GitHub repositories for software an organization builds and deploys
//! itself, splits mono-repos into components and enriches each component
//! with language, ownership, contributors and technology stack.
//!
//! ## Quick Start
//!
//! ```ignore
//! use sbs_discovery::{BatchRunner, RepositoryWorkflow, GitCloner};
//!
//! let workflow = RepositoryWorkflow::new(provider, Arc::new(GitCloner::new(token)), settings);
//! let report = BatchRunner::new(Arc::new(workflow), 4).run(repos).await;
//! ```
//!
//! ## Modules
//!
//! - [`discovery`]: signal catalog, deployability, repo type, service
//!   discovery, enrichment, the per-repository workflow and the batch runner
//! - [`ai`]: LLM provider abstraction, retry policy and prompt agents
//! - [`github`]: repository selection through the GitHub REST API
//! - [`snapshot`]: local checkouts of repositories
//! - [`storage`]: SQLite persistence with connection pooling
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod discovery;
pub mod github;
pub mod snapshot;
pub mod storage;
pub mod timeout;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};

pub use types::error::{DiscoveryError, ErrorCategory, Result, ResultExt, exit_code};

pub use storage::{Database, PoolConfig, SharedDatabase};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use discovery::{
    BatchReport, BatchRunner, BatchSummary, RepositoryStatus, RepositoryWorkflow, Stage,
};
pub use snapshot::{GitCloner, LocalSnapshot};
pub use types::{RepoRef, RepoType, RepositoryOutcome, SelfBuiltComponent};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{LlmProvider, LlmResponse, ProviderConfig, SharedProvider, create_provider};
