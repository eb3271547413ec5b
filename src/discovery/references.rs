//! CI/CD Reference Matcher
//!
//! Decides whether a package-manager directory is actually built or deployed
//! by a pipeline: a directory counts as referenced when any of its generated
//! textual patterns occurs in a CI/CD file. Pattern generation lives behind
//! [`referenced`] so the heuristics can grow without touching the matcher.

use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::snapshot::RepositorySnapshot;
use crate::types::PackageManagerDirectory;

/// Path fragments identifying CI/CD pipeline definitions
const CICD_PATH_MARKERS: &[&str] = &[
    ".github/workflows/",
    ".gitlab-ci.yml",
    "Jenkinsfile",
    "azure-pipelines.yml",
    "azure-pipelines.yaml",
    ".circleci/config.yml",
    ".travis.yml",
];

const INFRASTRUCTURE_NAMES: &[&str] = &[
    "k8s",
    "kubernetes",
    "kube",
    "infrastructure",
    "infra",
    "deploy",
    "deployment",
    "deployments",
    "config",
    "configuration",
    "configs",
    "conf",
    "manifests",
    "helm",
    "charts",
    "chart",
    "terraform",
    "tf",
    "ansible",
    "playbooks",
    "scripts",
    "tools",
    "utilities",
    "utils",
    "docs",
    "documentation",
    "doc",
    "test",
    "tests",
    "testing",
    "e2e",
    "integration",
    "ci",
    "cd",
    "pipeline",
    "pipelines",
    "security",
    "secrets",
    "vault",
    "storybook",
    "styleguide",
    "design-system",
    "libs",
    "lib",
    "libraries",
    "monitoring",
    "logs",
    "logging",
];

const INFRASTRUCTURE_PREFIXES: &[&str] = &["libs/", "scripts/", "tools/", "utilities/"];

const INFRASTRUCTURE_MARKERS: &[&str] = &[
    "k8s-config",
    "kubernetes-config",
    "helm-config",
    "terraform-config",
    "ansible-config",
    "nginx-config",
    "apache-config",
    "docker-config",
    "compose-config",
    "ci-config",
    "cd-config",
    "pipeline-config",
    "deployment-config",
    "infrastructure-config",
    "metrics-config",
    "metrics-dashboard",
    "metrics-setup",
    "prometheus-config",
    "grafana-config",
    "observability-config",
];

const BUILD_PREFIXES: &[&str] = &["dist", "build", "out", "target", "compiled"];

/// Patterns this short only count when not glued to a neighboring word
const SHORT_TOKEN_LEN: usize = 3;

pub fn is_cicd_file(path: &str) -> bool {
    CICD_PATH_MARKERS.iter().any(|m| path.contains(m))
}

/// Directories that hold configuration or tooling rather than a service
pub fn is_infrastructure_directory(path: &str) -> bool {
    let lower = path.to_lowercase();
    let name = lower.rsplit('/').next().unwrap_or(&lower);

    INFRASTRUCTURE_NAMES.contains(&name)
        || INFRASTRUCTURE_PREFIXES.iter().any(|p| lower.starts_with(p))
        || INFRASTRUCTURE_MARKERS.iter().any(|m| name.contains(m))
}

/// A candidate directory together with the name it is known by
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub dir: &'a PackageManagerDirectory,
    /// Basename for nested directories; for the root, the manifest's
    /// declared name when available
    pub service_name: &'a str,
}

impl<'a> Candidate<'a> {
    pub fn new(dir: &'a PackageManagerDirectory, service_name: &'a str) -> Self {
        Self { dir, service_name }
    }
}

/// True when `cicd_text` (already lowercased) references the candidate
pub fn referenced(candidate: &Candidate<'_>, cicd_text: &str) -> bool {
    if is_infrastructure_directory(&candidate.dir.path) {
        return false;
    }
    patterns(candidate)
        .iter()
        .any(|pattern| occurs(cicd_text, pattern))
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Substring match, delimited for short patterns so `api` misses `rapid`
fn occurs(text: &str, pattern: &str) -> bool {
    if pattern.chars().count() > SHORT_TOKEN_LEN {
        return text.contains(pattern);
    }
    text.match_indices(pattern).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + pattern.len()..].chars().next();
        !before.is_some_and(is_token_char) && !after.is_some_and(is_token_char)
    })
}

/// Every lowercased pattern generated for a candidate
pub fn patterns(candidate: &Candidate<'_>) -> Vec<String> {
    let dir = &candidate.dir;
    let segments: Vec<&str> = if dir.is_root() {
        Vec::new()
    } else {
        dir.path.split('/').collect()
    };

    let mut out = Vec::new();
    if !dir.is_root() {
        out.extend(direct_path_patterns(&dir.path, &dir.manifest));
        out.extend(build_patterns(&dir.path));
    }
    if !candidate.service_name.is_empty() {
        out.extend(service_name_patterns(candidate.service_name, &segments));
        out.extend(tool_patterns(candidate.service_name));
    }

    out.into_iter().map(|p| p.to_lowercase()).collect()
}

// =============================================================================
// Pattern generators
// =============================================================================

fn direct_path_patterns(path: &str, manifest: &str) -> Vec<String> {
    vec![
        path.to_string(),
        format!("./{path}"),
        format!("cd {path}"),
        format!("working-directory: {path}"),
        format!("dir: {path}"),
        format!("path: {path}"),
        format!("context: {path}"),
        format!("dockerfile: {path}/dockerfile"),
        format!("{path}/{manifest}"),
        format!("./{path}/{manifest}"),
    ]
}

fn service_name_patterns(name: &str, segments: &[&str]) -> Vec<String> {
    let upper = name.to_uppercase();
    let mut out: Vec<String> = [
        "project: ",
        "name: ",
        "app: ",
        "service: ",
        "package: ",
        "module: ",
    ]
    .iter()
    .map(|key| format!("{key}{name}"))
    .collect();

    // monorepo tool invocations
    out.extend([
        format!("nx run {name}:"),
        format!("nx build {name}"),
        format!("nx test {name}"),
        format!("nx lint {name}"),
        format!("nx e2e {name}"),
        format!("nx run-many --projects={name}"),
        format!("--projects={name}"),
        format!("lerna run --scope {name}"),
        format!("--scope {name}"),
        format!("rush build --to {name}"),
        format!("rush test --to {name}"),
        format!("bazel build //{name}"),
        format!("bazel test //{name}"),
        format!("//{name}:"),
        format!("gradle :{name}:"),
        format!("./gradlew :{name}:"),
        format!(":{name}:build"),
        format!(":{name}:test"),
        format!("mvn -pl {name}"),
        format!("-pl {name}"),
        format!("--projects {name}"),
        format!("cargo build -p {name}"),
        format!("cargo test -p {name}"),
        format!("-p {name}"),
        format!("go build ./{name}"),
        format!("go test ./{name}"),
        format!("dotnet build {name}"),
        format!("dotnet test {name}"),
        format!("make {name}"),
        format!("task {name}"),
        format!("invoke {name}"),
    ]);

    // environment variables
    out.extend([
        format!("app_name={name}"),
        format!("service_name={name}"),
        format!("project_name={name}"),
        format!("package_name={name}"),
        format!("component={name}"),
        format!("APP_NAME={upper}"),
        format!("SERVICE_NAME={upper}"),
        format!("PROJECT_NAME={upper}"),
    ]);

    // container and release naming
    out.extend([
        format!("image: {name}"),
        format!("container: {name}"),
        format!("deployment: {name}"),
        format!("app-name: {name}"),
        format!("release: {name}"),
        format!("version: {name}"),
    ]);

    if segments.len() > 1 {
        for segment in segments {
            out.extend([
                format!("project: {segment}"),
                format!("nx run {segment}:"),
                format!("--scope {segment}"),
                format!(":{segment}:build"),
                format!("-p {segment}"),
            ]);
        }
    }

    out
}

/// Build output locations a source directory may be published from
pub fn build_directory_mappings(path: &str) -> Vec<String> {
    let parts: Vec<&str> = path.split('/').collect();
    let mut mappings = Vec::new();

    for prefix in BUILD_PREFIXES {
        mappings.push(format!("{prefix}/{path}"));
        if parts.len() >= 2 {
            mappings.push(format!("{prefix}/{}", parts[parts.len() - 1]));
            if parts.len() >= 3 {
                mappings.push(format!("{prefix}/{}", parts[parts.len() - 2..].join("/")));
            }
        }
    }
    mappings
}

fn build_patterns(path: &str) -> Vec<String> {
    build_directory_mappings(path)
        .into_iter()
        .flat_map(|b| {
            [
                format!("./{b}"),
                format!("source-directory: ./{b}"),
                format!("source-directory: {b}"),
                format!("path: ./{b}"),
                format!("path: {b}"),
                format!("dist: {b}"),
                format!("output: {b}"),
                format!("build: {b}"),
                format!("target: {b}"),
                format!("artifact-path: {b}"),
                format!("dist-dir: {b}"),
                format!("output-dir: {b}"),
                format!("build-dir: {b}"),
                b,
            ]
        })
        .collect()
}

fn tool_patterns(name: &str) -> Vec<String> {
    vec![
        // turborepo
        format!("\"name\": \"{name}\""),
        format!("\"{name}#build\""),
        format!("\"{name}#test\""),
        format!("\"{name}#lint\""),
        // kubernetes and helm labels
        format!("app.kubernetes.io/name: {name}"),
        format!("chart: {name}"),
        // compose service keys
        format!("{name}:"),
        // cloud functions and stacks
        format!("function-name: {name}"),
        format!("stack-name: {name}"),
        format!("resource-group: {name}"),
        format!("function: {name}"),
        // pipeline jobs
        format!("uses: ./.github/actions/{name}"),
        format!("uses: ./.github/workflows/{name}"),
        format!("extends: {name}"),
        format!("needs: {name}"),
        format!("stage('{name}')"),
        format!("stage(\"{name}\")"),
        format!("job: {name}"),
        format!("task: {name}"),
    ]
}

// =============================================================================
// Matcher
// =============================================================================

/// Union of referenced directory paths across all CI/CD files
pub fn referenced_directories(
    snapshot: &dyn RepositorySnapshot,
    candidates: &[Candidate<'_>],
    signal_files: &[String],
) -> BTreeSet<String> {
    let cicd_files: Vec<&String> = signal_files.iter().filter(|f| is_cicd_file(f)).collect();
    info!(files = ?cicd_files, "Analyzing CI/CD files for service references");

    let mut referenced_dirs = BTreeSet::new();
    for file in cicd_files {
        let content = match snapshot.read_to_string(file) {
            Ok(c) => c.to_lowercase(),
            Err(e) => {
                warn!(path = %file, error = %e, "Could not read CI/CD file");
                continue;
            }
        };
        referenced_dirs.extend(referenced_in(&content, candidates).into_iter().inspect(|dir| {
            debug!(dir = %dir, cicd = %file, "Directory referenced");
        }));
    }

    info!(count = referenced_dirs.len(), dirs = ?referenced_dirs, "Referenced directories");
    referenced_dirs
}

/// Candidate paths referenced by one lowercased CI/CD document
pub fn referenced_in(content: &str, candidates: &[Candidate<'_>]) -> BTreeSet<String> {
    candidates
        .iter()
        .filter(|c| referenced(c, content))
        .map(|c| c.dir.path.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::LocalSnapshot;
    use tempfile::TempDir;

    fn dir(path: &str, manifest: &str) -> PackageManagerDirectory {
        PackageManagerDirectory {
            path: path.into(),
            manifest: manifest.into(),
            language: "javascript".into(),
        }
    }

    fn basename(d: &PackageManagerDirectory) -> &str {
        d.basename()
    }

    #[test]
    fn test_cicd_file_detection() {
        assert!(is_cicd_file(".github/workflows/deploy.yml"));
        assert!(is_cicd_file("services/api/.gitlab-ci.yml"));
        assert!(is_cicd_file("Jenkinsfile"));
        assert!(!is_cicd_file("Dockerfile"));
        assert!(!is_cicd_file("package.json"));
    }

    #[test]
    fn test_infrastructure_directories() {
        assert!(is_infrastructure_directory("deploy/k8s"));
        assert!(is_infrastructure_directory("Helm"));
        assert!(is_infrastructure_directory("libs/shared"));
        assert!(is_infrastructure_directory("ops/prometheus-config-v2"));
        assert!(!is_infrastructure_directory("apps/checkout"));
        assert!(!is_infrastructure_directory("services/config-service"));
    }

    #[test]
    fn test_direct_path_reference() {
        let d = dir("apps/checkout", "package.json");
        let c = Candidate::new(&d, basename(&d));
        assert!(referenced(&c, "run: cd apps/checkout && npm ci"));
        assert!(referenced(&c, "working-directory: apps/checkout"));
        assert!(!referenced(&c, "run: npm ci"));
    }

    #[test]
    fn test_tool_invocation_reference() {
        let d = dir("apps/billing-api", "project.json");
        let c = Candidate::new(&d, basename(&d));
        assert!(referenced(&c, "run: npx nx run billing-api:build"));
        assert!(referenced(&c, "run: ./gradlew :billing-api:build"));
        assert!(referenced(&c, "env:\n  service_name=billing-api"));
    }

    #[test]
    fn test_build_output_reference() {
        assert!(build_directory_mappings("apps/web").contains(&"dist/apps/web".to_string()));
        assert!(build_directory_mappings("apps/web").contains(&"dist/web".to_string()));
        assert!(
            build_directory_mappings("a/apps/web").contains(&"build/apps/web".to_string())
        );
        assert_eq!(build_directory_mappings("web").len(), BUILD_PREFIXES.len());
    }

    #[test]
    fn test_patterns_are_lowercase() {
        let d = dir("Apps/Web", "package.json");
        let c = Candidate::new(&d, "Web");
        assert!(patterns(&c).iter().all(|p| *p == p.to_lowercase()));
        assert!(referenced(&c, "cd apps/web"));
    }

    #[test]
    fn test_root_never_matches_by_raw_path() {
        let root = dir(".", "package.json");
        let c = Candidate::new(&root, "");
        assert!(!referenced(&c, "run: ./scripts/build.sh . && docker build ."));

        let named = Candidate::new(&root, "storefront");
        assert!(referenced(&named, "image: storefront:latest"));
    }

    #[test]
    fn test_infrastructure_directory_never_referenced() {
        let d = dir("deploy", "package.json");
        let c = Candidate::new(&d, basename(&d));
        assert!(!referenced(&c, "cd deploy && npm run release"));
    }

    #[test]
    fn test_union_across_files() {
        let dirs = [
            dir("apps/alpha", "package.json"),
            dir("apps/beta", "package.json"),
            dir("apps/gamma", "package.json"),
        ];
        let candidates: Vec<_> = dirs.iter().map(|d| Candidate::new(d, d.basename())).collect();

        let first = referenced_in("cd apps/alpha", &candidates);
        let second = referenced_in("working-directory: apps/gamma", &candidates);
        assert!(first.is_disjoint(&second));

        let mut union = first.clone();
        union.extend(second.clone());
        let combined = referenced_in("cd apps/alpha\nworking-directory: apps/gamma", &candidates);
        assert_eq!(combined, union);
        assert_eq!(union.len(), 2);
    }

    #[test]
    fn test_union_over_snapshot_files() {
        let temp = TempDir::new().unwrap();
        let workflows = temp.path().join(".github/workflows");
        std::fs::create_dir_all(&workflows).unwrap();
        std::fs::write(workflows.join("a.yml"), "steps:\n  - run: cd apps/Alpha && npm ci\n")
            .unwrap();
        std::fs::write(workflows.join("b.yml"), "defaults:\n  working-directory: apps/gamma\n")
            .unwrap();
        std::fs::write(temp.path().join("README.md"), "cd apps/beta").unwrap();

        let dirs = [
            dir("apps/alpha", "package.json"),
            dir("apps/beta", "package.json"),
            dir("apps/gamma", "package.json"),
        ];
        let candidates: Vec<_> = dirs.iter().map(|d| Candidate::new(d, d.basename())).collect();
        let signal_files = vec![
            ".github/workflows/a.yml".to_string(),
            ".github/workflows/b.yml".to_string(),
            "README.md".to_string(),
            ".github/workflows/missing.yml".to_string(),
        ];

        let snapshot = LocalSnapshot::open(temp.path()).unwrap();
        let found = referenced_directories(&snapshot, &candidates, &signal_files);
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec!["apps/alpha".to_string(), "apps/gamma".to_string()]
        );

        let per_file = |name: &str| {
            let content = snapshot.read_to_string(name).unwrap().to_lowercase();
            referenced_in(&content, &candidates)
        };
        assert_eq!(
            per_file(".github/workflows/a.yml").into_iter().collect::<Vec<_>>(),
            vec!["apps/alpha".to_string()]
        );
        assert_eq!(
            per_file(".github/workflows/b.yml").into_iter().collect::<Vec<_>>(),
            vec!["apps/gamma".to_string()]
        );
    }

    #[test]
    fn test_short_names_match_as_whole_tokens() {
        let d = dir("api", "package.json");
        let c = Candidate::new(&d, "api");

        assert!(!referenced(&c, "run: ./rapid-deploy.sh"));
        assert!(referenced(&c, "run: ./api/build.sh"));
        assert!(referenced(&c, "image: api:latest"));
        assert!(referenced(&c, "needs: [lint, api]"));
    }

    #[test]
    fn test_occurs_delimits_only_short_patterns() {
        assert!(!occurs("rapid-deploy", "api"));
        assert!(occurs("(api)", "api"));
        assert!(occurs("api", "api"));
        assert!(occurs("apps/webshop", "apps/web"));
    }
}
