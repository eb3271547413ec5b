//! Service Discovery
//!
//! Mono-repos: turn package-manager directories into components, trusting
//! CI/CD references when there are enough of them and asking the model
//! otherwise. Single-purpose repositories collapse into one component named
//! after the repository.

use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::ai::agents::{DiscoveredService, ServiceDiscoveryAgent, ServiceDiscoveryInput};
use crate::ai::provider::LlmProvider;
use crate::discovery::package_dirs::find_package_manager_directories;
use crate::discovery::references::{self, Candidate};
use crate::snapshot::RepositorySnapshot;
use crate::types::{
    Confidence, LanguageInfo, PackageManagerDirectory, RepoRef, SelfBuiltComponent, json_string,
    repo_name_from_url,
};

/// Knobs and prompt inputs for one discovery run
pub struct ServiceDiscoverySettings<'a> {
    pub reference_threshold: usize,
    pub cicd_excerpt_chars: usize,
    pub readme_head: Option<&'a str>,
    pub context: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceDiscoveryOutcome {
    pub components: Vec<SelfBuiltComponent>,
    /// Directories matched in CI/CD files
    pub referenced: BTreeSet<String>,
    /// True when CI/CD references alone produced the components
    pub authoritative: bool,
    pub warnings: Vec<String>,
}

/// Browser URL of a directory at the default branch; the repository URL for the root
pub fn display_url(repo: &RepoRef, path: &str) -> String {
    let path = path.trim_matches('/');
    if path.is_empty() || path == "." {
        repo.url.clone()
    } else {
        format!("{}/tree/{}/{}", repo.url, repo.default_branch, path)
    }
}

/// `name` of the root `package.json`, empty when absent
pub fn root_package_name(snapshot: &dyn RepositorySnapshot) -> String {
    if !snapshot.exists("package.json") {
        return String::new();
    }
    snapshot
        .read_to_string("package.json")
        .ok()
        .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
        .and_then(|json| json_string(&json, "name"))
        .map(|name| name.trim().to_string())
        .unwrap_or_default()
}

fn component_path(dir: &str) -> &str {
    if dir == "." { "" } else { dir }
}

/// Signal files inside `dir` (everything for the root)
fn files_under<'a>(dir: &str, files: &'a [String]) -> Vec<&'a str> {
    if dir == "." {
        return files.iter().map(String::as_str).collect();
    }
    let prefix = format!("{}/", dir);
    files
        .iter()
        .filter(|f| f.starts_with(&prefix))
        .map(String::as_str)
        .collect()
}

/// Component for a directory referenced by CI/CD
fn referenced_component(
    dir: &PackageManagerDirectory,
    repo: &RepoRef,
    root_name: &str,
    signal_files: &[String],
    cicd_files: &[String],
) -> SelfBuiltComponent {
    let name = if dir.is_root() {
        if root_name.is_empty() {
            repo_name_from_url(&repo.url)
        } else {
            root_name.to_string()
        }
    } else {
        dir.basename().to_string()
    };

    let mut evidence: Vec<&str> = files_under(&dir.path, signal_files);
    for file in cicd_files {
        if !evidence.contains(&file.as_str()) {
            evidence.push(file);
        }
    }

    SelfBuiltComponent::new(name, component_path(&dir.path))
        .with_display_url(display_url(repo, &dir.path))
        .with_evidence(format!("Referenced by CI/CD: {}", evidence.join(", ")))
        .with_confidence(Confidence::High)
}

fn discovered_component(service: DiscoveredService, repo: &RepoRef) -> SelfBuiltComponent {
    let mut component = SelfBuiltComponent::new(service.name, service.path.clone())
        .with_display_url(display_url(repo, &service.path))
        .with_evidence(service.evidence.join("; "))
        .with_confidence(service.confidence);
    component.language = service.language.map(|name| LanguageInfo {
        name,
        version: String::new(),
        reason: "Reported by service discovery".to_string(),
    });
    component
}

/// Discover the services of a mono-repo
pub async fn discover_services(
    provider: &dyn LlmProvider,
    snapshot: &dyn RepositorySnapshot,
    repo: &RepoRef,
    signal_files: &[String],
    settings: &ServiceDiscoverySettings<'_>,
) -> ServiceDiscoveryOutcome {
    let directories = find_package_manager_directories(snapshot);
    let root_name = root_package_name(snapshot);
    let candidates: Vec<Candidate<'_>> = directories
        .iter()
        .map(|dir| {
            let service_name = if dir.is_root() { root_name.as_str() } else { dir.basename() };
            Candidate::new(dir, service_name)
        })
        .collect();

    let cicd_files: Vec<String> = signal_files
        .iter()
        .filter(|f| references::is_cicd_file(f))
        .cloned()
        .collect();
    let referenced = references::referenced_directories(snapshot, &candidates, signal_files);

    if referenced.len() >= settings.reference_threshold {
        info!(
            referenced = referenced.len(),
            threshold = settings.reference_threshold,
            "CI/CD references are authoritative"
        );
        let components = directories
            .iter()
            .filter(|dir| referenced.contains(&dir.path))
            .map(|dir| referenced_component(dir, repo, &root_name, signal_files, &cicd_files))
            .collect();
        return ServiceDiscoveryOutcome {
            components,
            referenced,
            authoritative: true,
            warnings: Vec::new(),
        };
    }

    info!(
        referenced = referenced.len(),
        candidates = directories.len(),
        "Too few CI/CD references, asking the model"
    );

    let cicd_contents: Vec<(String, String)> = cicd_files
        .iter()
        .filter_map(|path| {
            snapshot
                .read_to_string(path)
                .ok()
                .map(|content| (path.clone(), content))
        })
        .collect();

    let repo_name = repo_name_from_url(&repo.url);
    let input = ServiceDiscoveryInput {
        repo_name: &repo_name,
        candidates: &directories,
        cicd_files: &cicd_contents,
        readme_head: settings.readme_head,
        strong_signal_files: signal_files,
        context: settings.context,
        excerpt_chars: settings.cicd_excerpt_chars,
    };

    let mut warnings = Vec::new();
    let services = match ServiceDiscoveryAgent::discover(provider, &input).await {
        Ok(services) => services,
        Err(e) => {
            warn!(error = %e, "Service discovery failed, no services recorded");
            warnings.push(format!("service discovery: {}", e));
            Vec::new()
        }
    };

    ServiceDiscoveryOutcome {
        components: services
            .into_iter()
            .map(|s| discovered_component(s, repo))
            .collect(),
        referenced,
        authoritative: false,
        warnings,
    }
}

/// Collapse a single-purpose repository into one component
pub fn collapse_single_purpose(
    components: Vec<SelfBuiltComponent>,
    repo: &RepoRef,
    repo_type_evidence: &str,
) -> Vec<SelfBuiltComponent> {
    let name = repo_name_from_url(&repo.url);

    let component = match components.into_iter().next() {
        Some(mut first) => {
            first.name = name;
            first.path = String::new();
            if first.display_url.is_empty() {
                first.display_url = repo.url.clone();
            }
            first.evidence = repo_type_evidence.to_string();
            first.confidence = Confidence::High;
            first
        }
        None => SelfBuiltComponent::new(name, "")
            .with_display_url(repo.url.clone())
            .with_evidence(repo_type_evidence)
            .with_confidence(Confidence::High),
    };

    vec![component]
}
