//! Repository Snapshots
//!
//! Discovery never touches the network or git directly: it reads a
//! [`RepositorySnapshot`], an immutable view of one checkout's file tree.
//!
//! - [`LocalSnapshot`]: file tree of a directory on disk
//! - [`GitCloner`]: materializes a GitHub repository into a temporary
//!   [`Checkout`] and removes it again on cleanup

mod git;
mod local;

pub use git::{GitCloner, run_git};
pub use local::LocalSnapshot;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::types::{RepoRef, Result, head_lines};

/// A file inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    /// Repository-relative path with `/` separators
    pub path: String,
    pub size: u64,
}

impl SnapshotFile {
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Parent directory, `.` for files at the root
    pub fn dir(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => ".",
        }
    }
}

/// Read-only view of a repository file tree at one commit
pub trait RepositorySnapshot: Send + Sync {
    /// Absolute root of the tree
    fn root(&self) -> &Path;

    /// All regular files, sorted by path
    fn files(&self) -> &[SnapshotFile];

    fn read_to_string(&self, path: &str) -> Result<String>;

    fn exists(&self, path: &str) -> bool {
        self.files().iter().any(|f| f.path == path)
    }

    /// Number of directory components in a relative directory path (`.` is 0)
    fn depth(&self, dir: &str) -> usize {
        path_depth(dir)
    }

    /// Files whose path lies under `dir` (`.` or empty selects everything)
    fn files_under(&self, dir: &str) -> Vec<&SnapshotFile> {
        let dir = dir.trim_matches('/');
        if dir.is_empty() || dir == "." {
            return self.files().iter().collect();
        }
        let prefix = format!("{}/", dir);
        self.files()
            .iter()
            .filter(|f| f.path.starts_with(&prefix))
            .collect()
    }
}

/// First `lines` lines of the root `README.md` (or `README`), if present
pub fn readme_head(snapshot: &dyn RepositorySnapshot, lines: usize) -> Option<String> {
    ["README.md", "README"]
        .into_iter()
        .filter(|name| snapshot.exists(name))
        .find_map(|name| snapshot.read_to_string(name).ok())
        .map(|content| head_lines(&content, lines))
        .filter(|head| !head.trim().is_empty())
}

pub fn path_depth(dir: &str) -> usize {
    dir.split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .count()
}

// =============================================================================
// Checkouts
// =============================================================================

/// A materialized repository on local disk
#[derive(Debug)]
pub struct Checkout {
    root: PathBuf,
    owned: bool,
}

impl Checkout {
    /// Checkout whose directory is deleted on cleanup
    pub fn owned(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            owned: true,
        }
    }

    /// Checkout of a directory we must not delete
    pub fn borrowed(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            owned: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot(&self) -> Result<LocalSnapshot> {
        LocalSnapshot::open(&self.root)
    }

    /// Remove the checkout directory. Safe to call more than once.
    pub fn cleanup(&self) -> Result<()> {
        if !self.owned {
            return Ok(());
        }
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
            debug!(path = %self.root.display(), "Removed checkout");
        }
        Ok(())
    }
}

/// Produces local checkouts of repositories
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn materialize(&self, repo: &RepoRef) -> Result<Checkout>;
}

/// Best-effort cleanup used on every pipeline exit
pub fn cleanup_quietly(checkout: &Checkout) -> Option<String> {
    match checkout.cleanup() {
        Ok(()) => None,
        Err(e) => {
            warn!(path = %checkout.root().display(), error = %e, "Cleanup failed");
            Some(format!("cleanup: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_path_depth() {
        assert_eq!(path_depth("."), 0);
        assert_eq!(path_depth(""), 0);
        assert_eq!(path_depth("a"), 1);
        assert_eq!(path_depth("a/b/c"), 3);
    }

    #[test]
    fn test_snapshot_file_parts() {
        let f = SnapshotFile {
            path: "apps/web/package.json".into(),
            size: 10,
        };
        assert_eq!(f.name(), "package.json");
        assert_eq!(f.dir(), "apps/web");

        let root = SnapshotFile {
            path: "Dockerfile".into(),
            size: 1,
        };
        assert_eq!(root.dir(), ".");
    }

    #[test]
    fn test_readme_head() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("README.md"), "# Shop\nline2\nline3\n").unwrap();
        let snapshot = LocalSnapshot::open(temp.path()).unwrap();
        assert_eq!(readme_head(&snapshot, 2).as_deref(), Some("# Shop\nline2"));

        let empty = TempDir::new().unwrap();
        let snapshot = LocalSnapshot::open(empty.path()).unwrap();
        assert_eq!(readme_head(&snapshot, 20), None);
    }

    #[test]
    fn test_owned_checkout_cleanup() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("checkout");
        std::fs::create_dir_all(dir.join("src")).unwrap();

        let checkout = Checkout::owned(&dir);
        checkout.cleanup().unwrap();
        assert!(!dir.exists());
        // second call is a no-op
        checkout.cleanup().unwrap();
    }

    #[test]
    fn test_borrowed_checkout_is_kept() {
        let temp = TempDir::new().unwrap();
        let checkout = Checkout::borrowed(temp.path());
        checkout.cleanup().unwrap();
        assert!(temp.path().exists());
    }
}
