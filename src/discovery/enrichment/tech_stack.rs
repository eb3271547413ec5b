//! Tech stack detection from build manifests

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{EnrichmentContext, EnrichmentStage, join_dir};
use crate::ai::agents::TechStackAgent;
use crate::types::{Result, SelfBuiltComponent};

/// Manifests read from each component directory
pub const TECH_STACK_MANIFESTS: &[&str] = &[
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "setup.py",
    "Pipfile",
    "poetry.lock",
    "composer.json",
    "Gemfile",
    "go.mod",
    "Cargo.toml",
];

pub struct TechStackStage;

#[async_trait]
impl EnrichmentStage for TechStackStage {
    fn name(&self) -> &'static str {
        "tech_stack"
    }

    async fn enrich(
        &self,
        ctx: &EnrichmentContext<'_>,
        components: &[SelfBuiltComponent],
    ) -> Result<Vec<SelfBuiltComponent>> {
        let mut enriched = components.to_vec();

        for component in &mut enriched {
            let dir = component.dir().to_string();
            let mut stacks = Vec::new();

            for manifest in TECH_STACK_MANIFESTS {
                let path = join_dir(&dir, manifest);
                if !ctx.snapshot.exists(&path) {
                    continue;
                }
                let content = match ctx.snapshot.read_to_string(&path) {
                    Ok(content) => content,
                    Err(e) => {
                        warn!(path = %path, error = %e, "Cannot read manifest");
                        continue;
                    }
                };
                match TechStackAgent::detect(ctx.provider, &path, &content).await {
                    Ok(found) => {
                        debug!(path = %path, stacks = found.len(), "Manifest analyzed");
                        stacks.extend(found);
                    }
                    Err(e) => {
                        warn!(path = %path, error = %e, "Tech stack detection failed");
                    }
                }
            }

            component.tech_stacks = stacks;
        }

        Ok(enriched)
    }
}
