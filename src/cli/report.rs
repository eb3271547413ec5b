//! JSON export of a discovery run

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use crate::discovery::{BatchReport, BatchSummary};
use crate::types::{RepositoryOutcome, Result, ResultExt};

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub analyzed_at: DateTime<Utc>,
    /// `organization` or `repository`
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    pub total_repositories: usize,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub metadata: ReportMetadata,
    pub repositories: Vec<RepositoryOutcome>,
    pub summary: BatchSummary,
}

/// What a run was pointed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSource {
    Organization(String),
    Repository(String),
}

impl DiscoveryReport {
    pub fn new(source: &ReportSource, total_repositories: usize, batch: &BatchReport) -> Self {
        let (kind, organization, repository) = match source {
            ReportSource::Organization(org) => ("organization", Some(org.clone()), None),
            ReportSource::Repository(repo) => ("repository", None, Some(repo.clone())),
        };

        let mut repositories = batch.outcomes.clone();
        repositories.sort_by(|a, b| a.full_name.cmp(&b.full_name));

        Self {
            metadata: ReportMetadata {
                analyzed_at: Utc::now(),
                source: kind.to_string(),
                organization,
                repository,
                total_repositories,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            repositories,
            summary: batch.summary.clone(),
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context_fn(|| format!("Failed to write report to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::RepositoryStatus;
    use tempfile::TempDir;

    #[test]
    fn test_report_shape() {
        let mut batch = BatchReport::default();
        let outcome = RepositoryOutcome {
            url: "https://github.com/acme/shop".into(),
            full_name: "acme/shop".into(),
            deployable: true,
            ..Default::default()
        };
        batch
            .summary
            .record(&RepositoryStatus::Completed(outcome.clone()));
        batch.outcomes.push(outcome);

        let report = DiscoveryReport::new(&ReportSource::Organization("acme".into()), 1, &batch);
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out/report.json");
        report.write_to(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["metadata"]["source"], "organization");
        assert_eq!(value["metadata"]["organization"], "acme");
        assert!(value["metadata"].get("repository").is_none());
        assert_eq!(value["metadata"]["total_repositories"], 1);
        assert_eq!(value["repositories"][0]["full_name"], "acme/shop");
        assert_eq!(value["summary"]["deployable"], 1);
    }
}
