//! Repo-Type Classifier
//!
//! Counts build manifests and Dockerfiles near the top of the tree and
//! scores how spread out they are.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::constants;
use crate::snapshot::{RepositorySnapshot, path_depth};
use crate::types::{RepoType, RepoTypeClassification};

const BUILD_MANIFESTS: &[&str] = &[
    "package.json",
    "pyproject.toml",
    "setup.py",
    "pom.xml",
    "go.mod",
    "Cargo.toml",
    "build.gradle",
    "build.gradle.kts",
    "requirements.txt",
];

const DOCKERFILE_NAMES: &[&str] = &["Dockerfile", "dockerfile"];

#[derive(Debug, Clone, Copy)]
pub struct RepoTypeClassifier {
    max_depth: usize,
    threshold: u32,
}

impl Default for RepoTypeClassifier {
    fn default() -> Self {
        Self {
            max_depth: constants::repo_type::MAX_DEPTH,
            threshold: constants::repo_type::MONO_REPO_SCORE_THRESHOLD,
        }
    }
}

impl RepoTypeClassifier {
    pub fn new(max_depth: usize, threshold: u32) -> Self {
        Self {
            max_depth,
            threshold,
        }
    }

    pub fn classify(&self, snapshot: &dyn RepositorySnapshot) -> RepoTypeClassification {
        let mut manifest_hits = 0;
        let mut dockerfile_hits = 0;
        let mut per_dir_hits: HashMap<&str, usize> = HashMap::new();

        for file in snapshot.files() {
            let dir = file.dir();
            if dir != "." && dir.split('/').any(|c| c.starts_with('.')) {
                continue;
            }
            if path_depth(dir) > self.max_depth {
                continue;
            }

            let name = file.name();
            if name.starts_with('.') {
                continue;
            }

            let top_dir = if dir == "." {
                ""
            } else {
                dir.split('/').next().unwrap_or_default()
            };

            if BUILD_MANIFESTS.contains(&name) {
                manifest_hits += 1;
                *per_dir_hits.entry(top_dir).or_default() += 1;
                debug!(path = %file.path, "Build manifest");
            } else if DOCKERFILE_NAMES.contains(&name) {
                dockerfile_hits += 1;
                *per_dir_hits.entry(top_dir).or_default() += 1;
                debug!(path = %file.path, "Dockerfile");
            }
        }

        let dirs_with_hits = per_dir_hits.len();
        let score = score(manifest_hits, dockerfile_hits, dirs_with_hits);
        let repo_type = if score >= self.threshold {
            RepoType::MonoRepo
        } else {
            RepoType::SinglePurpose
        };

        let classification = RepoTypeClassification {
            manifest_hits,
            dockerfile_hits,
            dirs_with_hits,
            score,
            repo_type,
        };
        info!(
            evidence = %classification.evidence(),
            score,
            repo_type = %repo_type,
            "Classified repository type"
        );
        classification
    }
}

/// Weighted spread score. Two manifests only count when they sit in
/// different top-level directories.
pub fn score(manifest_hits: usize, dockerfile_hits: usize, dirs_with_hits: usize) -> u32 {
    let mut score = 0;

    if manifest_hits >= 3 {
        score += 2;
    } else if manifest_hits == 2 && dirs_with_hits > 1 {
        score += 1;
    }

    if dockerfile_hits > 1 {
        score += 2;
    }

    match dirs_with_hits {
        n if n >= 3 => score += 2,
        2 => score += 1,
        _ => {}
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::LocalSnapshot;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for rel in files {
            let path = temp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }
        temp
    }

    fn classify(root: &Path) -> RepoTypeClassification {
        let snapshot = LocalSnapshot::open(root).unwrap();
        RepoTypeClassifier::default().classify(&snapshot)
    }

    #[test]
    fn test_score_boundaries() {
        assert_eq!(score(2, 0, 2), 2);
        assert_eq!(score(3, 0, 1), 2);
        assert_eq!(score(3, 0, 3), 4);
        assert_eq!(score(1, 1, 1), 0);
        assert_eq!(score(2, 0, 1), 0);
        assert_eq!(score(1, 2, 1), 2);
    }

    #[test]
    fn test_single_purpose_root_service() {
        let temp = tree(&["package.json", "Dockerfile", ".github/workflows/deploy.yml"]);
        let c = classify(temp.path());
        assert_eq!(c.manifest_hits, 1);
        assert_eq!(c.dockerfile_hits, 1);
        assert_eq!(c.dirs_with_hits, 1);
        assert_eq!(c.score, 0);
        assert_eq!(c.repo_type, RepoType::SinglePurpose);
        assert_eq!(c.evidence(), "manifests=1 dockerfiles=1 dirs_with_hits=1");
    }

    #[test]
    fn test_mono_repo() {
        let temp = tree(&[
            "services/api/package.json",
            "services/api/Dockerfile",
            "web/package.json",
            "web/Dockerfile",
            "worker/go.mod",
        ]);
        let c = classify(temp.path());
        assert_eq!(c.manifest_hits, 3);
        assert_eq!(c.dockerfile_hits, 2);
        assert_eq!(c.dirs_with_hits, 3);
        assert_eq!(c.score, 6);
        assert_eq!(c.repo_type, RepoType::MonoRepo);
    }

    #[test]
    fn test_hidden_and_deep_paths_ignored() {
        let temp = tree(&[
            "package.json",
            ".devcontainer/Dockerfile",
            "a/b/c/d/package.json",
            "a/b/c/pom.xml",
        ]);
        let c = classify(temp.path());
        // a/b/c is depth 3 and still counted; a/b/c/d is too deep
        assert_eq!(c.manifest_hits, 2);
        assert_eq!(c.dockerfile_hits, 0);
        assert_eq!(c.dirs_with_hits, 2);
        assert_eq!(c.score, 2);
        assert_eq!(c.repo_type, RepoType::SinglePurpose);
    }

    #[test]
    fn test_custom_threshold() {
        let temp = tree(&["a/package.json", "b/package.json"]);
        let snapshot = LocalSnapshot::open(temp.path()).unwrap();
        let c = RepoTypeClassifier::new(3, 2).classify(&snapshot);
        assert_eq!(c.score, 2);
        assert_eq!(c.repo_type, RepoType::MonoRepo);
    }
}
