//! Directory Exclusion Filter and Binary File Filter
//!
//! Static tables shared by every worker. A directory that matches is pruned
//! together with everything below it.

use regex::Regex;
use std::sync::LazyLock;

const BUILD_DIRS: &[&str] = &[
    "target", "build", "dist", "out", "bin", "obj", "generated", "output", "release", "debug",
    "artifacts",
];

const DEPENDENCY_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "deps",
    "_build",
    "packages",
    "bower_components",
    "jspm_packages",
    "typings",
];

const PYTHON_DIRS: &[&str] = &[
    "__pycache__",
    "venv",
    "env",
    "virtualenv",
    "site-packages",
    "pip-cache",
];

const IDE_DIRS: &[&str] = &[".idea", ".vscode", ".vs", ".eclipse", ".settings", ".gradle"];

const TEST_DIRS: &[&str] = &[
    "test",
    "tests",
    "spec",
    "specs",
    "__tests__",
    "e2e",
    "integration",
    "unit",
    "coverage",
];

const DOC_DIRS: &[&str] = &[
    "docs",
    "documentation",
    "doc",
    "examples",
    "example",
    "demo",
    "demos",
    "samples",
    "sample",
];

const TEMP_DIRS: &[&str] = &["tmp", "temp", "cache", "logs", "log"];

const OS_DIRS: &[&str] = &["System Volume Information", "$RECYCLE.BIN", ".Trash"];

/// Substrings that mark generated output anywhere in a directory name
const GENERATED_MARKERS: &[&str] = &[
    "generated",
    "autogen",
    "codegen",
    "compiled",
    "transpiled",
    "processed",
];

/// Short markers that only count as whole `-`, `_` or `.` delimited tokens
const GENERATED_TOKENS: &[&str] = &["gen", "compile", "auto"];

static HASH_LIKE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[a-f0-9]{8,}$").ok());
static DATE_LIKE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").ok());

const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "tar", "gz", "bz2", "7z", "rar", "xz", "tgz", "tbz", "tbz2"];

const EXECUTABLE_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "a", "lib", "o", "obj", "jar", "war", "ear", "class", "pyc", "pyo",
    "pyd",
];

const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "ico", "webp", "mp3", "mp4", "avi", "mov", "wmv",
    "flv", "mkv", "webm", "wav", "ogg", "m4a", "aac",
];

const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "rtf",
];

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "woff", "woff2", "eot"];

const DATA_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3", "mdb", "accdb", "dbf"];

const DESIGN_EXTENSIONS: &[&str] = &["psd", "ai", "sketch", "fig", "xd"];

/// Whether a directory (by its own name) should be pruned from discovery walks
pub fn should_skip_directory(name: &str) -> bool {
    if name.starts_with('.') {
        return true;
    }

    let listed = [
        BUILD_DIRS,
        DEPENDENCY_DIRS,
        PYTHON_DIRS,
        IDE_DIRS,
        TEST_DIRS,
        DOC_DIRS,
        TEMP_DIRS,
        OS_DIRS,
    ]
    .iter()
    .any(|set| set.contains(&name));

    listed || is_generated_or_derived(name)
}

/// Heuristic for directories produced by tooling rather than written by hand
pub fn is_generated_or_derived(name: &str) -> bool {
    if name.starts_with('@') || name.starts_with('_') {
        return true;
    }

    let lower = name.to_lowercase();
    if GENERATED_MARKERS.iter().any(|m| lower.contains(m)) {
        return true;
    }

    if lower
        .split(['-', '_', '.'])
        .any(|token| GENERATED_TOKENS.contains(&token))
    {
        return true;
    }

    let matches = |re: &LazyLock<Option<Regex>>| re.as_ref().is_some_and(|r| r.is_match(&lower));
    matches(&HASH_LIKE) || matches(&DATE_LIKE)
}

/// True when any directory component of a relative path is pruned
pub fn is_under_skipped_directory(path: &str) -> bool {
    let mut components: Vec<&str> = path.split('/').collect();
    // last component is the file itself
    components.pop();
    components
        .into_iter()
        .filter(|c| !c.is_empty() && *c != ".")
        .any(should_skip_directory)
}

/// Whether a file name looks binary by extension
pub fn is_binary_file(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    match lower.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => [
            ARCHIVE_EXTENSIONS,
            EXECUTABLE_EXTENSIONS,
            MEDIA_EXTENSIONS,
            DOCUMENT_EXTENSIONS,
            FONT_EXTENSIONS,
            DATA_EXTENSIONS,
            DESIGN_EXTENSIONS,
        ]
        .iter()
        .any(|set| set.contains(&ext)),
        _ => ["binary", "executable", ".bin", ".dat"]
            .iter()
            .any(|p| lower.contains(p)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listed_directories() {
        for name in ["node_modules", "target", "tests", "docs", ".github", "venv", "packages"] {
            assert!(should_skip_directory(name), "{} should be skipped", name);
        }
        for name in ["src", "apps", "services", "api", "web"] {
            assert!(!should_skip_directory(name), "{} should be kept", name);
        }
    }

    #[test]
    fn test_generated_heuristics() {
        assert!(is_generated_or_derived("@types"));
        assert!(is_generated_or_derived("_internal"));
        assert!(is_generated_or_derived("deadbeef01"));
        assert!(is_generated_or_derived("2024-01-15-backup"));
        assert!(is_generated_or_derived("api-generated"));
        assert!(is_generated_or_derived("proto-gen"));
        assert!(is_generated_or_derived("auto"));
        assert!(is_generated_or_derived("auto-scripts"));
    }

    #[test]
    fn test_short_tokens_need_delimiters() {
        assert!(!is_generated_or_derived("automations"));
        assert!(!is_generated_or_derived("agent"));
        assert!(!is_generated_or_derived("general"));
        assert!(!is_generated_or_derived("compiler-service"));
    }

    #[test]
    fn test_under_skipped_directory() {
        assert!(is_under_skipped_directory("node_modules/pkg/package.json"));
        assert!(is_under_skipped_directory("apps/web/dist/package.json"));
        assert!(!is_under_skipped_directory("apps/web/package.json"));
        assert!(!is_under_skipped_directory("package.json"));
    }

    #[test]
    fn test_binary_files() {
        assert!(is_binary_file("logo.PNG"));
        assert!(is_binary_file("app.jar"));
        assert!(is_binary_file("archive.tar.gz"));
        assert!(is_binary_file("some-binary"));
        assert!(!is_binary_file("package.json"));
        assert!(!is_binary_file("Dockerfile"));
        assert!(!is_binary_file("Makefile"));
    }
}
