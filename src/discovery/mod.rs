//! Self-Built Software Discovery
//!
//! The deterministic core plus the pipeline around it:
//!
//! 1. [`scanner`] matches the [`catalog`] against a snapshot and [`strength`]
//!    grades the signals by category combination
//! 2. [`deployability`] decides whether the repository ships anything
//! 3. [`repo_type`] separates mono-repos from single-purpose repositories
//! 4. [`package_dirs`] and [`references`] find the directories CI/CD builds,
//!    and [`services`] turns them into components
//! 5. [`enrichment`] attaches languages, owners, contributors and tech stacks
//!
//! [`workflow`] sequences these per repository and [`batch`] runs many
//! repositories side by side.

pub mod batch;
pub mod catalog;
pub mod context;
pub mod deployability;
pub mod enrichment;
pub mod filters;
pub mod package_dirs;
pub mod references;
pub mod repo_type;
pub mod scanner;
pub mod services;
pub mod strength;
pub mod workflow;

pub use batch::{BatchReport, BatchRunner, BatchSummary, RepositoryStatus, StatusObserver};
pub use context::{ContextSources, DiscoveryContext};
pub use deployability::DeployabilityDecision;
pub use package_dirs::find_package_manager_directories;
pub use repo_type::RepoTypeClassifier;
pub use scanner::SignalScanner;
pub use services::{ServiceDiscoveryOutcome, collapse_single_purpose, discover_services};
pub use workflow::{RepositoryWorkflow, RepositoryWorkflowState, Stage, next_stage};
