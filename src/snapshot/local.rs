use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use super::{RepositorySnapshot, SnapshotFile};
use crate::types::{DiscoveryError, Result};

/// File tree of a local directory, captured once at open time
#[derive(Debug, Clone)]
pub struct LocalSnapshot {
    root: PathBuf,
    files: Vec<SnapshotFile>,
}

impl LocalSnapshot {
    /// Walk `root` and record every regular file.
    ///
    /// `.git` is skipped; ignore files are not honored so that the view
    /// matches what was committed.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(DiscoveryError::Snapshot(format!(
                "Not a directory: {}",
                root.display()
            )));
        }

        let walker = WalkBuilder::new(&root)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false)
            .follow_links(false)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();

        let mut files = Vec::new();
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push(SnapshotFile {
                path: to_slash(relative),
                size,
            });
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(Self { root, files })
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl RepositorySnapshot for LocalSnapshot {
    fn root(&self) -> &Path {
        &self.root
    }

    fn files(&self) -> &[SnapshotFile] {
        &self.files
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);
        let bytes = std::fs::read(&full)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn exists(&self, path: &str) -> bool {
        self.files
            .binary_search_by(|f| f.path.as_str().cmp(path))
            .is_ok()
    }
}
