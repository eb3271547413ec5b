//! Repository Workflow
//!
//! Per-repository state machine. The state is owned by exactly one stage at
//! a time: [`next_stage`] picks the following stage from the state fields
//! alone, and each stage consumes the state and returns the updated one.
//!
//! ```text
//! Cloned → ContextLoaded → SignalsDetected ─┬→ NotDeployable ───────────────────────────┐
//!                                           └→ Deployable → RepoTypeClassified ─┬→ MonoRepoServicesDiscovered ─┐
//!                                                                               └→ SinglePurposeCollapsed ────┤
//!   LanguagesDetected ← ─────────────────────────────────────────────────────────────────────────────────────┘
//!   → OwnersExtracted → ContributorsAttached → TechStackDetected → CleanedUp
//! ```
//!
//! Cleanup runs on every exit, including stage errors.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::context::{ContextSources, DiscoveryContext};
use super::deployability::{self, DeployabilityContext};
use super::enrichment::{
    ContributorsStage, EnrichmentContext, EnrichmentStage, LanguagesStage, OwnersStage,
    TechStackStage,
};
use super::repo_type::RepoTypeClassifier;
use super::scanner::SignalScanner;
use super::services::{self, ServiceDiscoverySettings};
use super::strength;
use crate::ai::provider::SharedProvider;
use crate::config::DiscoveryConfig;
use crate::snapshot::{
    Checkout, LocalSnapshot, SnapshotProvider, cleanup_quietly, readme_head,
};
use crate::types::{
    DeploymentSignal, RepoRef, RepoType, RepoTypeClassification, RepositoryOutcome, Result,
    SelfBuiltComponent,
};

// =============================================================================
// Stages
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Cloned,
    ContextLoaded,
    SignalsDetected,
    Deployable,
    NotDeployable,
    RepoTypeClassified,
    MonoRepoServicesDiscovered,
    SinglePurposeCollapsed,
    LanguagesDetected,
    OwnersExtracted,
    ContributorsAttached,
    TechStackDetected,
    CleanedUp,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cloned => "cloned",
            Self::ContextLoaded => "context_loaded",
            Self::SignalsDetected => "signals_detected",
            Self::Deployable => "deployable",
            Self::NotDeployable => "not_deployable",
            Self::RepoTypeClassified => "repo_type_classified",
            Self::MonoRepoServicesDiscovered => "mono_repo_services_discovered",
            Self::SinglePurposeCollapsed => "single_purpose_collapsed",
            Self::LanguagesDetected => "languages_detected",
            Self::OwnersExtracted => "owners_extracted",
            Self::ContributorsAttached => "contributors_attached",
            Self::TechStackDetected => "tech_stack_detected",
            Self::CleanedUp => "cleaned_up",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CleanedUp)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// State
// =============================================================================

/// Everything one repository pipeline accumulates
#[derive(Debug, Clone)]
pub struct RepositoryWorkflowState {
    pub repo: RepoRef,
    pub stage: Stage,
    pub context: DiscoveryContext,
    pub readme_head: Option<String>,
    pub signals: Vec<DeploymentSignal>,
    pub deployable: bool,
    pub deployable_signal_files: Vec<String>,
    pub classification: Option<RepoTypeClassification>,
    pub components: Vec<SelfBuiltComponent>,
    pub warnings: Vec<String>,
    /// Stages entered so far, in order
    pub history: Vec<Stage>,
}

impl RepositoryWorkflowState {
    pub fn new(repo: RepoRef) -> Self {
        Self {
            repo,
            stage: Stage::Cloned,
            context: DiscoveryContext::default(),
            readme_head: None,
            signals: Vec::new(),
            deployable: false,
            deployable_signal_files: Vec::new(),
            classification: None,
            components: Vec::new(),
            warnings: Vec::new(),
            history: vec![Stage::Cloned],
        }
    }

    pub fn repo_type(&self) -> Option<RepoType> {
        self.classification.as_ref().map(|c| c.repo_type)
    }

    fn enter(mut self, stage: Stage) -> Self {
        debug!(repo = %self.repo.full_name(), stage = %stage, "Entering stage");
        self.stage = stage;
        self.history.push(stage);
        self
    }

    pub fn into_outcome(self) -> RepositoryOutcome {
        RepositoryOutcome {
            url: self.repo.url.clone(),
            full_name: self.repo.full_name(),
            deployable: self.deployable,
            deployable_signal_files: self.deployable_signal_files,
            repo_type: self.classification.as_ref().map(|c| c.repo_type),
            repo_type_evidence: self
                .classification
                .as_ref()
                .map(|c| c.evidence())
                .unwrap_or_default(),
            components: self.components,
            warnings: self.warnings,
        }
    }
}

/// Stage that follows the current one, decided from state fields only
pub fn next_stage(state: &RepositoryWorkflowState) -> Stage {
    match state.stage {
        Stage::Cloned => Stage::ContextLoaded,
        Stage::ContextLoaded => Stage::SignalsDetected,
        Stage::SignalsDetected if state.deployable => Stage::Deployable,
        Stage::SignalsDetected => Stage::NotDeployable,
        Stage::NotDeployable => Stage::CleanedUp,
        Stage::Deployable => Stage::RepoTypeClassified,
        Stage::RepoTypeClassified => match state.repo_type() {
            Some(RepoType::MonoRepo) => Stage::MonoRepoServicesDiscovered,
            _ => Stage::SinglePurposeCollapsed,
        },
        Stage::MonoRepoServicesDiscovered | Stage::SinglePurposeCollapsed => {
            Stage::LanguagesDetected
        }
        Stage::LanguagesDetected => Stage::OwnersExtracted,
        Stage::OwnersExtracted => Stage::ContributorsAttached,
        Stage::ContributorsAttached => Stage::TechStackDetected,
        Stage::TechStackDetected | Stage::CleanedUp => Stage::CleanedUp,
    }
}

// =============================================================================
// Workflow
// =============================================================================

/// Runs the state machine for one repository at a time
pub struct RepositoryWorkflow {
    provider: SharedProvider,
    snapshots: Arc<dyn SnapshotProvider>,
    settings: DiscoveryConfig,
    context_sources: ContextSources,
}

/// Per-run inputs shared by all stages
struct StageInputs<'a> {
    checkout: &'a Checkout,
    snapshot: &'a LocalSnapshot,
}

impl RepositoryWorkflow {
    pub fn new(
        provider: SharedProvider,
        snapshots: Arc<dyn SnapshotProvider>,
        settings: DiscoveryConfig,
    ) -> Self {
        let context_sources = ContextSources::new(settings.org_context_dir());
        Self {
            provider,
            snapshots,
            settings,
            context_sources,
        }
    }

    pub fn with_context_sources(mut self, sources: ContextSources) -> Self {
        self.context_sources = sources;
        self
    }

    /// Materialize, classify and enrich one repository
    pub async fn run(&self, repo: &RepoRef) -> Result<RepositoryOutcome> {
        Ok(self.run_state(repo).await?.into_outcome())
    }

    /// Same as [`run`](Self::run), keeping signals and stage history
    #[instrument(skip(self), fields(repo = %repo.full_name()))]
    pub async fn run_state(&self, repo: &RepoRef) -> Result<RepositoryWorkflowState> {
        let checkout = self.snapshots.materialize(repo).await?;

        let result = match checkout.snapshot() {
            Ok(snapshot) => {
                let inputs = StageInputs {
                    checkout: &checkout,
                    snapshot: &snapshot,
                };
                self.drive(RepositoryWorkflowState::new(repo.clone()), &inputs)
                    .await
            }
            Err(e) => Err(e),
        };

        let cleanup_warning = cleanup_quietly(&checkout);

        let mut state = result?;
        state.warnings.extend(cleanup_warning);
        let state = state.enter(Stage::CleanedUp);

        info!(
            deployable = state.deployable,
            repo_type = ?state.repo_type(),
            components = state.components.len(),
            warnings = state.warnings.len(),
            "Repository processed"
        );
        Ok(state)
    }

    /// Advance until only cleanup remains
    async fn drive(
        &self,
        mut state: RepositoryWorkflowState,
        inputs: &StageInputs<'_>,
    ) -> Result<RepositoryWorkflowState> {
        loop {
            let next = next_stage(&state);
            if next.is_terminal() {
                return Ok(state);
            }
            state = self.step(next, state.enter(next), inputs).await?;
        }
    }

    async fn step(
        &self,
        stage: Stage,
        mut state: RepositoryWorkflowState,
        inputs: &StageInputs<'_>,
    ) -> Result<RepositoryWorkflowState> {
        let snapshot = inputs.snapshot;

        match stage {
            Stage::Cloned | Stage::CleanedUp | Stage::Deployable | Stage::NotDeployable => {}

            Stage::ContextLoaded => {
                state.context = self
                    .context_sources
                    .load(&state.repo.url, inputs.checkout.root());
                state.readme_head = readme_head(snapshot, self.settings.readme_head_lines);
            }

            Stage::SignalsDetected => {
                let raw = SignalScanner::new()
                    .with_max_file_size(self.settings.max_signal_file_size)
                    .scan(snapshot);
                state.signals = strength::classify(&raw);

                let context = state.context.format_for_prompt(self.settings.context_max_chars);
                let ctx = DeployabilityContext {
                    readme_head: state.readme_head.as_deref(),
                    context: context.as_deref(),
                };
                let decision =
                    deployability::decide(self.provider.as_ref(), snapshot, &state.signals, &ctx)
                        .await;

                state.deployable = decision.deployable;
                state.deployable_signal_files = decision.signal_files;
                state.warnings.extend(decision.warnings);
            }

            Stage::RepoTypeClassified => {
                let classification = RepoTypeClassifier::new(
                    self.settings.repo_type_max_depth,
                    self.settings.mono_repo_score_threshold,
                )
                .classify(snapshot);
                info!(
                    repo_type = %classification.repo_type,
                    evidence = %classification.evidence(),
                    "Repository type classified"
                );
                state.classification = Some(classification);
            }

            Stage::MonoRepoServicesDiscovered => {
                let context = state.context.format_for_prompt(self.settings.context_max_chars);
                let settings = ServiceDiscoverySettings {
                    reference_threshold: self.settings.reference_threshold,
                    cicd_excerpt_chars: self.settings.cicd_excerpt_chars,
                    readme_head: state.readme_head.as_deref(),
                    context: context.as_deref(),
                };
                let outcome = services::discover_services(
                    self.provider.as_ref(),
                    snapshot,
                    &state.repo,
                    &state.deployable_signal_files,
                    &settings,
                )
                .await;
                state.components = outcome.components;
                state.warnings.extend(outcome.warnings);
            }

            Stage::SinglePurposeCollapsed => {
                let evidence = state
                    .classification
                    .as_ref()
                    .map(|c| c.evidence())
                    .unwrap_or_default();
                let components = std::mem::take(&mut state.components);
                state.components =
                    services::collapse_single_purpose(components, &state.repo, &evidence);
            }

            Stage::LanguagesDetected => state = self.enrich(&LanguagesStage, state, inputs).await,
            Stage::OwnersExtracted => state = self.enrich(&OwnersStage, state, inputs).await,
            Stage::ContributorsAttached => {
                state = self.enrich(&ContributorsStage, state, inputs).await
            }
            Stage::TechStackDetected => state = self.enrich(&TechStackStage, state, inputs).await,
        }

        Ok(state)
    }

    /// Run one enrichment stage; a failure keeps the components unchanged
    async fn enrich(
        &self,
        stage: &dyn EnrichmentStage,
        mut state: RepositoryWorkflowState,
        inputs: &StageInputs<'_>,
    ) -> RepositoryWorkflowState {
        if state.components.is_empty() {
            return state;
        }

        let context = state.context.format_for_prompt(self.settings.context_max_chars);
        let ctx = EnrichmentContext {
            provider: self.provider.as_ref(),
            snapshot: inputs.snapshot,
            checkout_root: inputs.checkout.root(),
            settings: &self.settings,
            context: context.as_deref(),
        };

        match stage.enrich(&ctx, &state.components).await {
            Ok(components) => state.components = components,
            Err(e) => {
                warn!(stage = stage.name(), error = %e, "Enrichment stage failed");
                state.warnings.push(format!("{}: {}", stage.name(), e));
            }
        }
        state
    }
}
