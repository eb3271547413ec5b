//! Repository-level classification results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::component::SelfBuiltComponent;

/// A repository selected for discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    /// Browser URL, e.g. `https://github.com/acme/shop`
    pub url: String,
    pub default_branch: String,
    #[serde(default)]
    pub archived: bool,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        Self {
            url: format!("https://github.com/{}/{}", owner, name),
            owner,
            name,
            default_branch: "main".to_string(),
            archived: false,
        }
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A directory holding a recognized package-manager manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageManagerDirectory {
    /// Repository-relative path, `.` for the root
    pub path: String,
    /// Selected manifest file name
    pub manifest: String,
    pub language: String,
}

impl PackageManagerDirectory {
    pub fn is_root(&self) -> bool {
        self.path == "."
    }

    /// Last path segment of the directory
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Relative path of the manifest file inside the repository
    pub fn manifest_path(&self) -> String {
        if self.is_root() {
            self.manifest.clone()
        } else {
            format!("{}/{}", self.path, self.manifest)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepoType {
    #[serde(rename = "mono-repo")]
    MonoRepo,
    #[serde(rename = "single-purpose-repo")]
    SinglePurpose,
}

impl RepoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MonoRepo => "mono-repo",
            Self::SinglePurpose => "single-purpose-repo",
        }
    }
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mono-repo" => Ok(Self::MonoRepo),
            "single-purpose-repo" => Ok(Self::SinglePurpose),
            _ => Err(format!("Unknown repo type: {}", s)),
        }
    }
}

/// Outcome of the repo-type walk, computed once per repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTypeClassification {
    pub manifest_hits: usize,
    pub dockerfile_hits: usize,
    pub dirs_with_hits: usize,
    pub score: u32,
    pub repo_type: RepoType,
}

impl RepoTypeClassification {
    pub fn evidence(&self) -> String {
        format!(
            "manifests={} dockerfiles={} dirs_with_hits={}",
            self.manifest_hits, self.dockerfile_hits, self.dirs_with_hits
        )
    }
}

/// Terminal result of one repository pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryOutcome {
    pub url: String,
    pub full_name: String,
    pub deployable: bool,
    pub deployable_signal_files: Vec<String>,
    pub repo_type: Option<RepoType>,
    pub repo_type_evidence: String,
    pub components: Vec<SelfBuiltComponent>,
    /// Non-fatal problems collected from enrichment and cleanup
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Repository name from its URL: last segment with any `.git` suffix removed
pub fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&RepoType::MonoRepo).unwrap(),
            "\"mono-repo\""
        );
        assert_eq!(
            "single-purpose-repo".parse::<RepoType>(),
            Ok(RepoType::SinglePurpose)
        );
    }

    #[test]
    fn test_evidence_string() {
        let c = RepoTypeClassification {
            manifest_hits: 3,
            dockerfile_hits: 1,
            dirs_with_hits: 2,
            score: 3,
            repo_type: RepoType::MonoRepo,
        };
        assert_eq!(c.evidence(), "manifests=3 dockerfiles=1 dirs_with_hits=2");
    }

    #[test]
    fn test_repo_name_from_url() {
        assert_eq!(repo_name_from_url("https://github.com/acme/shop"), "shop");
        assert_eq!(repo_name_from_url("https://github.com/acme/shop.git"), "shop");
        assert_eq!(repo_name_from_url("git@github.com:acme/shop.git"), "shop");
        assert_eq!(repo_name_from_url("https://github.com/acme/shop/"), "shop");
    }

    #[test]
    fn test_package_dir_helpers() {
        let root = PackageManagerDirectory {
            path: ".".into(),
            manifest: "package.json".into(),
            language: "javascript".into(),
        };
        assert!(root.is_root());
        assert_eq!(root.manifest_path(), "package.json");

        let nested = PackageManagerDirectory {
            path: "apps/web".into(),
            manifest: "package.json".into(),
            language: "javascript".into(),
        };
        assert_eq!(nested.basename(), "web");
        assert_eq!(nested.manifest_path(), "apps/web/package.json");
    }
}
