//! Discover Command
//!
//! Usage:
//!   sbs-discovery discover --org <org> [--dry-run] [--limit N] [--output file.json]
//!   sbs-discovery discover --repo <owner/repo> [--llm MODEL] [--github-token T]
//!
//! Lists the selected repositories, runs the per-repository pipeline over
//! them and reports the outcome. Ctrl-C stops new repositories from starting.

use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{info, warn};

use crate::ai::{ProviderConfig, SharedProvider, create_provider};
use crate::cli::report::{DiscoveryReport, ReportSource};
use crate::cli::ui::Output;
use crate::config::Config;
use crate::discovery::{
    BatchReport, BatchRunner, ContextSources, RepositoryStatus, RepositoryWorkflow,
};
use crate::github::{GithubClient, validate_repo_format};
use crate::snapshot::GitCloner;
use crate::storage::Database;
use crate::types::{DiscoveryError, RepoRef, Result, exit_code};

#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    pub org: Option<String>,
    pub repo: Option<String>,
    pub dry_run: bool,
    pub limit: Option<usize>,
    pub output: Option<PathBuf>,
    /// Model or deployment override
    pub llm: Option<String>,
    pub github_token: Option<String>,
    pub include_archived: bool,
    pub concurrency: Option<usize>,
    pub org_context: Option<PathBuf>,
    pub repo_context: Option<PathBuf>,
}

/// What the run is pointed at
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Organization(String),
    Repository { owner: String, name: String },
}

impl Target {
    fn source(&self) -> ReportSource {
        match self {
            Self::Organization(org) => ReportSource::Organization(org.clone()),
            Self::Repository { owner, name } => {
                ReportSource::Repository(format!("{}/{}", owner, name))
            }
        }
    }

    fn organization(&self) -> &str {
        match self {
            Self::Organization(org) => org,
            Self::Repository { owner, .. } => owner,
        }
    }
}

impl DiscoverOptions {
    fn target(&self) -> Result<Target> {
        match (self.org.as_deref(), self.repo.as_deref()) {
            (Some(org), None) if !org.trim().is_empty() => {
                Ok(Target::Organization(org.trim().to_string()))
            }
            (None, Some(repo)) => {
                let (owner, name) = validate_repo_format(repo)?;
                Ok(Target::Repository { owner, name })
            }
            _ => Err(DiscoveryError::Validation(
                "Specify exactly one of --org <org> or --repo <owner/repo>".to_string(),
            )),
        }
    }
}

/// Token from the flag, then `GITHUB_TOKEN`, then `GH_TOKEN`
fn resolve_github_token<F>(flag: Option<&str>, env: F) -> Result<SecretString>
where
    F: Fn(&str) -> Option<String>,
{
    flag.map(str::to_string)
        .or_else(|| env("GITHUB_TOKEN"))
        .or_else(|| env("GH_TOKEN"))
        .filter(|t| !t.trim().is_empty())
        .map(SecretString::from)
        .ok_or_else(|| {
            DiscoveryError::Config(
                "No GitHub token found. Set GITHUB_TOKEN or GH_TOKEN, or pass --github-token"
                    .to_string(),
            )
        })
}

/// Content of a context override file
fn read_override(path: Option<&Path>) -> Result<Option<String>> {
    path.map(|p| {
        std::fs::read_to_string(p).map_err(|e| {
            DiscoveryError::Validation(format!("Cannot read context file {}: {}", p.display(), e))
        })
    })
    .transpose()
}

/// Exit code once the batch has finished
fn batch_exit_code(report: &BatchReport) -> u8 {
    if report.interrupted {
        exit_code::INTERRUPTED
    } else if report.summary.has_failures() {
        exit_code::PARTIAL_FAILURE
    } else {
        exit_code::SUCCESS
    }
}

async fn connect_llm(config: &Config, model: Option<&str>) -> Result<SharedProvider> {
    let provider_config = ProviderConfig::resolve(&config.llm, model)?;
    let provider = create_provider(&provider_config)?;

    match provider.health_check().await {
        Ok(true) => {
            info!(
                provider = provider.name(),
                model = provider.model(),
                "LLM provider ready"
            );
            Ok(provider)
        }
        Ok(false) => Err(DiscoveryError::Config(format!(
            "LLM provider {} failed its health check",
            provider.name()
        ))),
        Err(e) => Err(DiscoveryError::Config(format!(
            "LLM provider {} failed its health check: {}",
            provider.name(),
            e
        ))),
    }
}

async fn fetch_repositories(client: &GithubClient, target: &Target) -> Result<Vec<RepoRef>> {
    match target {
        Target::Organization(org) => client.list_org_repos(org).await,
        Target::Repository { owner, name } => Ok(vec![client.get_repo(owner, name).await?]),
    }
}

/// Run discovery and return the process exit code
pub async fn run(config: Config, options: DiscoverOptions) -> Result<u8> {
    let output = Output::new();

    let target = options.target()?;
    let org_override = read_override(options.org_context.as_deref())?;
    let repo_override = read_override(options.repo_context.as_deref())?;
    let token = resolve_github_token(options.github_token.as_deref(), |key| {
        std::env::var(key).ok()
    })?;
    let provider = connect_llm(&config, options.llm.as_deref()).await?;

    let mut github_config = config.github.clone();
    if options.include_archived {
        github_config.skip_archived = false;
    }
    let client = GithubClient::new(&github_config, Some(token.clone()))?;

    let mut repos = match fetch_repositories(&client, &target).await {
        Ok(repos) => repos,
        Err(e) => {
            output.error(&format!("Failed to fetch repositories: {}", e));
            return Ok(exit_code::FETCH);
        }
    };
    if let Some(limit) = options.limit {
        repos.truncate(limit);
    }
    if repos.is_empty() {
        output.info(&format!("No repositories found for {}", target.organization()));
        return Ok(exit_code::SUCCESS);
    }

    let database = if options.dry_run {
        output.info("Dry run: results will not be stored");
        None
    } else {
        let db = Database::open(&config.storage.database_path)?;
        db.initialize()?;
        Some(Arc::new(db))
    };

    let snapshots = GitCloner::new(Some(token))
        .with_timeout(Duration::from_secs(config.github.clone_timeout_secs))
        .with_shallow(config.github.shallow_clone);
    let context_sources = ContextSources::new(config.discovery.org_context_dir())
        .with_overrides(org_override, repo_override);
    let workflow = RepositoryWorkflow::new(
        provider,
        Arc::new(snapshots),
        config.discovery.clone(),
    )
    .with_context_sources(context_sources);

    let concurrency = options.concurrency.unwrap_or(config.workers.concurrency);
    let runner = BatchRunner::new(Arc::new(workflow), concurrency)
        .with_database(database)
        .with_organization(Some(target.organization().to_string()))
        .with_observer(Arc::new(|status: &RepositoryStatus| {
            Output::new().repository_status(status)
        }));

    let interrupt = runner.interrupt_flag();
    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, waiting for running repositories to finish");
            interrupt.store(true, Ordering::SeqCst);
        }
    });

    output.header(&format!(
        "Discovering {} repositor{} (concurrency {})",
        repos.len(),
        if repos.len() == 1 { "y" } else { "ies" },
        concurrency
    ));
    let total = repos.len();
    let report = runner.run(repos).await;
    listener.abort();

    output.summary(&report.summary);

    if let Some(path) = &options.output {
        let export = DiscoveryReport::new(&target.source(), total, &report);
        if let Err(e) = export.write_to(path) {
            output.error(&format!("Failed to export results: {}", e));
            return Ok(exit_code::PARTIAL_FAILURE);
        }
        output.success(&format!("Results written to {}", path.display()));
    }

    if report.interrupted {
        output.warning("Interrupted: remaining repositories were skipped");
    }
    Ok(batch_exit_code(&report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    fn options(org: Option<&str>, repo: Option<&str>) -> DiscoverOptions {
        DiscoverOptions {
            org: org.map(String::from),
            repo: repo.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_target_requires_exactly_one() {
        assert_eq!(
            options(Some("acme"), None).target().unwrap(),
            Target::Organization("acme".into())
        );
        assert_eq!(
            options(None, Some("acme/shop")).target().unwrap(),
            Target::Repository {
                owner: "acme".into(),
                name: "shop".into()
            }
        );

        for bad in [
            options(None, None),
            options(Some("acme"), Some("acme/shop")),
            options(None, Some("not-a-repo")),
        ] {
            assert_eq!(bad.target().unwrap_err().exit_code(), exit_code::INVALID_INPUT);
        }
    }

    #[test]
    fn test_github_token_resolution() {
        let env = |key: &str| (key == "GH_TOKEN").then(|| "gh-token".to_string());
        assert_eq!(
            resolve_github_token(None, env).unwrap().expose_secret(),
            "gh-token"
        );
        assert_eq!(
            resolve_github_token(Some("flag"), env)
                .unwrap()
                .expose_secret(),
            "flag"
        );

        let err = resolve_github_token(None, |_| None).unwrap_err();
        assert_eq!(err.exit_code(), exit_code::CONFIG);
    }

    #[test]
    fn test_read_override() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("org.md");
        std::fs::write(&path, "Payments org").unwrap();

        assert_eq!(
            read_override(Some(path.as_path())).unwrap().as_deref(),
            Some("Payments org")
        );
        assert_eq!(read_override(None).unwrap(), None);

        let missing = temp.path().join("missing.md");
        assert_eq!(
            read_override(Some(missing.as_path())).unwrap_err().exit_code(),
            exit_code::INVALID_INPUT
        );
    }

    #[test]
    fn test_batch_exit_code() {
        let mut report = BatchReport::default();
        assert_eq!(batch_exit_code(&report), exit_code::SUCCESS);

        report.summary.record(&RepositoryStatus::Failed {
            url: "https://github.com/acme/shop".into(),
            message: "clone failed".into(),
        });
        assert_eq!(batch_exit_code(&report), exit_code::PARTIAL_FAILURE);

        report.interrupted = true;
        assert_eq!(batch_exit_code(&report), exit_code::INTERRUPTED);
    }
}
