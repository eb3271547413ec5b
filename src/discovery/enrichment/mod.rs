//! Component Enrichment
//!
//! Stages that attach metadata to discovered components. A stage takes the
//! current components and returns the enriched copy; on `Err` the pipeline
//! keeps the input unchanged and records a warning.

mod contributors;
mod languages;
mod owners;
mod tech_stack;

pub use contributors::{ContributorsStage, parse_shortlog};
pub use languages::{LanguagesStage, collect_language_evidence};
pub use owners::{CODEOWNERS_LOCATIONS, OwnersStage};
pub use tech_stack::{TECH_STACK_MANIFESTS, TechStackStage};

use async_trait::async_trait;
use std::path::Path;

use crate::ai::provider::LlmProvider;
use crate::config::DiscoveryConfig;
use crate::snapshot::RepositorySnapshot;
use crate::types::{Result, SelfBuiltComponent};

/// Everything a stage may read
pub struct EnrichmentContext<'a> {
    pub provider: &'a dyn LlmProvider,
    pub snapshot: &'a dyn RepositorySnapshot,
    /// Checkout directory, for git history
    pub checkout_root: &'a Path,
    pub settings: &'a DiscoveryConfig,
    /// Formatted discovery context, if any
    pub context: Option<&'a str>,
}

#[async_trait]
pub trait EnrichmentStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn enrich(
        &self,
        ctx: &EnrichmentContext<'_>,
        components: &[SelfBuiltComponent],
    ) -> Result<Vec<SelfBuiltComponent>>;
}

/// Path of `file` inside the component directory
pub(crate) fn join_dir(dir: &str, file: &str) -> String {
    if dir == "." {
        file.to_string()
    } else {
        format!("{}/{}", dir, file)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::snapshot::LocalSnapshot;
    use tempfile::TempDir;

    pub fn repo(files: &[(&str, &str)]) -> (TempDir, LocalSnapshot) {
        let temp = TempDir::new().unwrap();
        for (path, content) in files {
            let full = temp.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        let snapshot = LocalSnapshot::open(temp.path()).unwrap();
        (temp, snapshot)
    }

    pub fn context<'a>(
        provider: &'a dyn LlmProvider,
        snapshot: &'a LocalSnapshot,
        root: &'a Path,
        settings: &'a DiscoveryConfig,
    ) -> EnrichmentContext<'a> {
        EnrichmentContext {
            provider,
            snapshot,
            checkout_root: root,
            settings,
            context: None,
        }
    }
}
