//! Signal Scanner
//!
//! Matches a snapshot against the evidence catalog and inspects the content
//! of CI/CD and compose files. Every emitted signal still needs the strength
//! classifier before it can be used for decisions.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::catalog::{self, DEPLOYMENT_KEYWORDS};
use crate::constants;
use crate::snapshot::{RepositorySnapshot, SnapshotFile};
use crate::types::{DEPLOYMENT_STEP, DeploymentSignal, LOCAL_BUILD, SignalCategory, SignalStrength};

/// Path components that disqualify a file from being evidence
const EXCLUDED_COMPONENTS: &[&str] = &[
    "node_modules",
    ".git",
    "__pycache__",
    "target",
    "build",
    "dist",
    ".venv",
    "venv",
    "vendor",
    "deps",
];

static COMPOSE_BUILD: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"build:\s*(\.|\w+)").ok());

pub struct SignalScanner {
    max_file_size: u64,
}

impl Default for SignalScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalScanner {
    pub fn new() -> Self {
        Self {
            max_file_size: constants::signals::MAX_SIGNAL_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Produce raw signals for a snapshot
    pub fn scan(&self, snapshot: &dyn RepositorySnapshot) -> Vec<DeploymentSignal> {
        let candidates: Vec<&SnapshotFile> = snapshot
            .files()
            .iter()
            .filter(|f| self.is_valid_evidence(f))
            .collect();

        let mut signals = Vec::new();

        for file in &candidates {
            for entry in catalog::matching_entries(&file.path) {
                signals.push(DeploymentSignal::new(
                    entry.category,
                    entry.signal_type,
                    &file.path,
                    entry.description,
                ));
            }
        }

        signals.extend(self.detect_cicd_deployment_steps(snapshot, &candidates));
        signals.extend(self.detect_compose_builds(snapshot, &candidates));

        debug!(count = signals.len(), "Raw deployment signals");
        signals
    }

    fn is_valid_evidence(&self, file: &SnapshotFile) -> bool {
        if file.size > self.max_file_size {
            return false;
        }
        !file
            .path
            .split('/')
            .any(|component| EXCLUDED_COMPONENTS.contains(&component))
    }

    /// One medium signal per CI/CD file, on the first keyword found
    fn detect_cicd_deployment_steps(
        &self,
        snapshot: &dyn RepositorySnapshot,
        candidates: &[&SnapshotFile],
    ) -> Vec<DeploymentSignal> {
        candidates
            .iter()
            .filter(|f| catalog::is_cicd_content_file(&f.path))
            .filter_map(|file| {
                let content = match snapshot.read_to_string(&file.path) {
                    Ok(c) => c.to_lowercase(),
                    Err(e) => {
                        debug!(path = %file.path, error = %e, "Could not read CI file");
                        return None;
                    }
                };
                let keyword = DEPLOYMENT_KEYWORDS.iter().find(|k| content.contains(*k))?;
                Some(
                    DeploymentSignal::new(
                        SignalCategory::CiCd,
                        DEPLOYMENT_STEP,
                        &file.path,
                        format!("CI/CD with deployment step: {}", keyword),
                    )
                    .with_strength(SignalStrength::Medium),
                )
            })
            .collect()
    }

    fn detect_compose_builds(
        &self,
        snapshot: &dyn RepositorySnapshot,
        candidates: &[&SnapshotFile],
    ) -> Vec<DeploymentSignal> {
        let Some(re) = COMPOSE_BUILD.as_ref() else {
            return Vec::new();
        };

        candidates
            .iter()
            .filter(|f| catalog::is_compose_file(&f.path))
            .filter_map(|file| match snapshot.read_to_string(&file.path) {
                Ok(content) => re.is_match(&content).then(|| {
                    DeploymentSignal::new(
                        SignalCategory::Containerization,
                        LOCAL_BUILD,
                        &file.path,
                        "Docker Compose with local build context",
                    )
                    .with_strength(SignalStrength::Medium)
                }),
                Err(e) => {
                    debug!(path = %file.path, error = %e, "Could not read compose file");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::LocalSnapshot;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scan(root: &Path) -> Vec<DeploymentSignal> {
        let snapshot = LocalSnapshot::open(root).unwrap();
        SignalScanner::new().scan(&snapshot)
    }

    #[test]
    fn test_basic_service_signals() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "package.json", "{}");
        write(temp.path(), "Dockerfile", "FROM node");
        write(
            temp.path(),
            ".github/workflows/deploy.yml",
            "steps:\n  - run: docker push x\n  - run: kubectl apply -f k.yaml\n",
        );

        let signals = scan(temp.path());
        let has = |cat: SignalCategory, ty: &str| {
            signals
                .iter()
                .any(|s| s.category == cat && s.signal_type == ty)
        };
        assert!(has(SignalCategory::PackageManager, "javascript"));
        assert!(has(SignalCategory::Containerization, "docker"));
        assert!(has(SignalCategory::CiCd, "github_actions"));
        assert!(has(SignalCategory::CiCd, DEPLOYMENT_STEP));
    }

    #[test]
    fn test_one_deployment_step_per_file() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            ".gitlab-ci.yml",
            "script:\n  - Docker Build .\n  - docker push\n  - helm upgrade\n",
        );

        let steps: Vec<_> = scan(temp.path())
            .into_iter()
            .filter(|s| s.is_deployment_step())
            .collect();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].description, "CI/CD with deployment step: docker build");
        assert_eq!(steps[0].strength, SignalStrength::Medium);
    }

    #[test]
    fn test_excluded_directories_and_size() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "node_modules/lib/package.json", "{}");
        write(temp.path(), "build/Dockerfile", "FROM x");
        write(temp.path(), "big/package.json", &" ".repeat(64));

        let snapshot = LocalSnapshot::open(temp.path()).unwrap();
        let signals = SignalScanner::new().with_max_file_size(32).scan(&snapshot);
        assert!(signals.is_empty(), "unexpected: {:?}", signals);
    }

    #[test]
    fn test_compose_local_build() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "docker-compose.yml",
            "services:\n  api:\n    build: ./api\n",
        );
        write(
            temp.path(),
            "docker-compose.prod.yml",
            "services:\n  api:\n    image: registry/api:1\n",
        );

        let local: Vec<_> = scan(temp.path())
            .into_iter()
            .filter(|s| s.signal_type == LOCAL_BUILD)
            .collect();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].file_path, "docker-compose.yml");
    }

    #[test]
    fn test_catalog_signals_start_weak() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "go.mod", "module x");

        let signals = scan(temp.path());
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].strength, SignalStrength::Weak);
    }
}
