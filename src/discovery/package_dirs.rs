//! Package-Manager Directory Finder

use std::collections::BTreeMap;
use tracing::{debug, info};

use super::filters;
use crate::snapshot::RepositorySnapshot;
use crate::types::PackageManagerDirectory;

/// Manifest file names (or `*.ext` suffix patterns) and their language
const PACKAGE_MANAGER_FILES: &[(&str, &str)] = &[
    ("package.json", "javascript"),
    ("project.json", "javascript"),
    ("pom.xml", "java"),
    ("build.gradle", "java"),
    ("build.gradle.kts", "kotlin"),
    ("go.mod", "go"),
    ("Cargo.toml", "rust"),
    ("pyproject.toml", "python"),
    ("requirements.txt", "python"),
    ("setup.py", "python"),
    ("composer.json", "php"),
    ("Gemfile", "ruby"),
    ("*.csproj", "csharp"),
    ("*.fsproj", "fsharp"),
    ("*.vbproj", "vb.net"),
    ("project.clj", "clojure"),
    ("deps.edn", "clojure"),
    ("mix.exs", "elixir"),
    ("pubspec.yaml", "dart"),
];

/// Preferred manifest when a directory holds several
const PRIORITY_ORDER: &[&str] = &[
    "package.json",
    "project.json",
    "pom.xml",
    "build.gradle",
    "go.mod",
    "Cargo.toml",
];

/// Language of a package-manager file, `None` when the file is not one
pub fn manifest_language(file_name: &str) -> Option<&'static str> {
    PACKAGE_MANAGER_FILES
        .iter()
        .find(|(pattern, _)| match pattern.strip_prefix('*') {
            Some(suffix) => file_name.len() > suffix.len() && file_name.ends_with(suffix),
            None => *pattern == file_name,
        })
        .map(|(_, language)| *language)
}

pub fn is_package_manager_file(file_name: &str) -> bool {
    manifest_language(file_name).is_some()
}

/// Every non-excluded directory holding a recognized manifest, sorted by path
pub fn find_package_manager_directories(
    snapshot: &dyn RepositorySnapshot,
) -> Vec<PackageManagerDirectory> {
    let mut by_dir: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for file in snapshot.files() {
        let name = file.name();
        if filters::is_binary_file(name) || !is_package_manager_file(name) {
            continue;
        }
        if filters::is_under_skipped_directory(&file.path) {
            debug!(path = %file.path, "Manifest under excluded directory");
            continue;
        }
        by_dir.entry(file.dir()).or_default().push(name);
    }

    let dirs: Vec<PackageManagerDirectory> = by_dir
        .into_iter()
        .map(|(dir, found)| {
            let manifest = select_manifest(&found);
            PackageManagerDirectory {
                path: dir.to_string(),
                manifest: manifest.to_string(),
                language: manifest_language(manifest)
                    .unwrap_or("unknown")
                    .to_string(),
            }
        })
        .collect();

    info!(count = dirs.len(), "Package manager directories");
    dirs
}

fn select_manifest<'a>(found: &[&'a str]) -> &'a str {
    PRIORITY_ORDER
        .iter()
        .find_map(|preferred| found.iter().find(|f| *f == preferred).copied())
        .or_else(|| found.first().copied())
        .unwrap_or_default()
}
