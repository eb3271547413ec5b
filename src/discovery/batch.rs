//! Batch Runner
//!
//! Runs independent repository pipelines with bounded concurrency, persists
//! each outcome and keeps the batch summary. Once the interrupt flag is set
//! no new pipeline starts; pipelines already running finish normally.

use futures::StreamExt;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

use super::workflow::RepositoryWorkflow;
use crate::storage::{RepositoryMetadata, SharedDatabase};
use crate::types::{RepoRef, RepoType, RepositoryOutcome, Result};

/// Terminal status of one repository in a batch
#[derive(Debug, Clone)]
pub enum RepositoryStatus {
    Completed(RepositoryOutcome),
    Failed { url: String, message: String },
    /// Not started because the batch was interrupted
    Skipped { url: String },
}

/// Counts reported after a batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total_processed: usize,
    pub deployable: usize,
    pub non_deployable: usize,
    pub mono_repos: usize,
    pub single_purpose: usize,
    pub services: usize,
    pub unique_teams: usize,
    pub tech_stacks: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<(String, String)>,
    #[serde(skip)]
    teams: BTreeSet<String>,
    #[serde(skip)]
    stacks: BTreeSet<String>,
}

impl BatchSummary {
    pub fn record(&mut self, status: &RepositoryStatus) {
        match status {
            RepositoryStatus::Completed(outcome) => {
                self.total_processed += 1;
                if outcome.deployable {
                    self.deployable += 1;
                } else {
                    self.non_deployable += 1;
                }
                match outcome.repo_type {
                    Some(RepoType::MonoRepo) => self.mono_repos += 1,
                    Some(RepoType::SinglePurpose) => self.single_purpose += 1,
                    None => {}
                }
                self.services += outcome.components.len();
                for component in &outcome.components {
                    self.teams.extend(component.owner.teams.iter().cloned());
                    self.stacks
                        .extend(component.tech_stacks.iter().map(|t| t.name.to_lowercase()));
                }
                self.unique_teams = self.teams.len();
                self.tech_stacks = self.stacks.len();
            }
            RepositoryStatus::Failed { url, message } => {
                self.total_processed += 1;
                self.failed += 1;
                self.errors.push((url.clone(), message.clone()));
            }
            RepositoryStatus::Skipped { .. } => self.skipped += 1,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Result of a whole batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<RepositoryOutcome>,
    pub summary: BatchSummary,
    pub interrupted: bool,
}

/// Callback for per-repository status lines
pub type StatusObserver = Arc<dyn Fn(&RepositoryStatus) + Send + Sync>;

pub struct BatchRunner {
    workflow: Arc<RepositoryWorkflow>,
    /// `None` in dry-run mode
    database: Option<SharedDatabase>,
    organization: Option<String>,
    concurrency: usize,
    interrupt: Arc<AtomicBool>,
    observer: Option<StatusObserver>,
}

impl BatchRunner {
    pub fn new(workflow: Arc<RepositoryWorkflow>, concurrency: usize) -> Self {
        Self {
            workflow,
            database: None,
            organization: None,
            concurrency: concurrency.max(1),
            interrupt: Arc::new(AtomicBool::new(false)),
            observer: None,
        }
    }

    pub fn with_database(mut self, database: Option<SharedDatabase>) -> Self {
        self.database = database;
        self
    }

    pub fn with_organization(mut self, organization: Option<String>) -> Self {
        self.organization = organization;
        self
    }

    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    pub fn with_observer(mut self, observer: StatusObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Flag that stops new pipelines from starting
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub async fn run(&self, repos: Vec<RepoRef>) -> BatchReport {
        if let (Some(db), Some(org)) = (&self.database, &self.organization)
            && let Err(e) = db.ensure_organization(org)
        {
            warn!(organization = %org, error = %e, "Failed to record organization");
        }

        info!(
            repositories = repos.len(),
            concurrency = self.concurrency,
            dry_run = self.database.is_none(),
            "Starting batch"
        );

        let mut report = BatchReport::default();
        let mut stream = futures::stream::iter(repos)
            .map(|repo| self.process(repo))
            .buffer_unordered(self.concurrency);

        while let Some(status) = stream.next().await {
            if let Some(observer) = &self.observer {
                observer(&status);
            }
            report.summary.record(&status);
            if let RepositoryStatus::Completed(outcome) = status {
                report.outcomes.push(outcome);
            }
        }

        report.interrupted = self.interrupt.load(Ordering::SeqCst);
        info!(
            processed = report.summary.total_processed,
            failed = report.summary.failed,
            skipped = report.summary.skipped,
            interrupted = report.interrupted,
            "Batch finished"
        );
        report
    }

    async fn process(&self, repo: RepoRef) -> RepositoryStatus {
        if self.interrupt.load(Ordering::SeqCst) {
            return RepositoryStatus::Skipped { url: repo.url };
        }

        let outcome = match self.workflow.run(&repo).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(repo = %repo.url, error = %e, "Repository pipeline failed");
                return RepositoryStatus::Failed {
                    url: repo.url,
                    message: e.to_string(),
                };
            }
        };

        if let Err(e) = self.persist(&repo, &outcome) {
            error!(repo = %repo.url, error = %e, "Failed to persist repository");
            return RepositoryStatus::Failed {
                url: repo.url,
                message: format!("persistence: {}", e),
            };
        }

        RepositoryStatus::Completed(outcome)
    }

    fn persist(&self, repo: &RepoRef, outcome: &RepositoryOutcome) -> Result<()> {
        let Some(db) = &self.database else {
            return Ok(());
        };

        let metadata = RepositoryMetadata::from_outcome(outcome, self.organization.clone());
        let id = db.upsert_repository(&repo.full_name(), &metadata)?;
        db.replace_components(&id, &outcome.components)?;
        Ok(())
    }
}
