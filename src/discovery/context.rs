//! Discovery Context
//!
//! Optional Markdown hints written by people who know the organization or
//! the repository. The organization file lives at `<org_context_dir>/<org>.md`,
//! the repository file at `.sbs-discovery.md` in the checkout root. Both are
//! merged and injected into every prompt.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::constants;
use crate::github::extract_org;
use crate::types::{DiscoveryError, Result, truncate_chars};

/// Marker used as the path of context passed on the command line
pub const CLI_OVERRIDE: &str = "<cli-override>";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryContext {
    pub org_context: Option<String>,
    pub repo_context: Option<String>,
    pub merged: Option<String>,
    pub org_context_path: Option<String>,
    pub repo_context_path: Option<String>,
}

impl DiscoveryContext {
    pub fn new(org: Option<(String, String)>, repo: Option<(String, String)>) -> Self {
        let (org_context, org_context_path) = org.unzip();
        let (repo_context, repo_context_path) = repo.unzip();
        let merged = merge(org_context.as_deref(), repo_context.as_deref());
        Self {
            org_context,
            repo_context,
            merged,
            org_context_path,
            repo_context_path,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_none()
    }

    /// Prompt block for the merged context, `None` when there is none
    pub fn format_for_prompt(&self, max_chars: usize) -> Option<String> {
        let merged = self.merged.as_deref()?.trim();
        if merged.is_empty() {
            return None;
        }

        let body = if merged.chars().count() > max_chars {
            format!("{}\n... [context truncated]", truncate_chars(merged, max_chars))
        } else {
            merged.to_string()
        };

        Some(format!(
            "## User-Provided Context\n\
             The following context was provided by the user to help with discovery. \
             Use it for service classification, tech stack detection and naming.\n\n\
             {}\n\n---",
            body
        ))
    }
}

/// Merge organization and repository context; blank text counts as absent
pub fn merge(org: Option<&str>, repo: Option<&str>) -> Option<String> {
    let org = org.map(str::trim).filter(|s| !s.is_empty());
    let repo = repo.map(str::trim).filter(|s| !s.is_empty());
    match (org, repo) {
        (Some(o), Some(r)) => Some(format!(
            "## Organization Context\n{}\n\n## Repository Context\n{}",
            o, r
        )),
        (Some(o), None) => Some(o.to_string()),
        (None, Some(r)) => Some(r.to_string()),
        (None, None) => None,
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Where context comes from for a batch run
#[derive(Debug, Clone, Default)]
pub struct ContextSources {
    /// Directory of `<org>.md` files
    pub org_dir: Option<PathBuf>,
    /// Organization context given on the command line, replacing the file lookup
    pub org_override: Option<String>,
    /// Repository context given on the command line, replacing the file lookup
    pub repo_override: Option<String>,
}

impl ContextSources {
    pub fn new(org_dir: Option<PathBuf>) -> Self {
        Self {
            org_dir,
            ..Default::default()
        }
    }

    pub fn with_overrides(mut self, org: Option<String>, repo: Option<String>) -> Self {
        self.org_override = org;
        self.repo_override = repo;
        self
    }

    /// Build the context for one repository checkout
    pub fn load(&self, repo_url: &str, checkout_root: &Path) -> DiscoveryContext {
        let org = match &self.org_override {
            Some(content) => {
                info!("Using command-line organization context");
                Some((content.clone(), CLI_OVERRIDE.to_string()))
            }
            None => extract_org(repo_url).and_then(|org| {
                let dir = self.org_dir.as_ref()?;
                read_context_file(&dir.join(format!("{}.md", org)))
            }),
        };

        let repo = match &self.repo_override {
            Some(content) => {
                info!("Using command-line repository context");
                Some((content.clone(), CLI_OVERRIDE.to_string()))
            }
            None => read_context_file(&checkout_root.join(constants::context::REPO_CONTEXT_FILE)),
        };

        let context = DiscoveryContext::new(org, repo);
        debug!(
            org_loaded = context.org_context.is_some(),
            repo_loaded = context.repo_context.is_some(),
            merged_len = context.merged.as_ref().map_or(0, String::len),
            "Discovery context built"
        );
        context
    }
}

/// `(content, path)` of a readable context file
fn read_context_file(path: &Path) -> Option<(String, String)> {
    if !path.is_file() {
        debug!(path = %path.display(), "No context file");
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(content) => Some((content, path.display().to_string())),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read context file");
            None
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

const ORG_TEMPLATE: &str = r#"# Organization Context for {org}

Hints for repository discovery across the {org} organization.

## Naming Conventions
<!-- e.g. services are named <team>-<function>-service -->

## Deployment Patterns
<!-- e.g. production services deploy to Kubernetes namespace 'prod' -->

## Team Ownership Rules
<!-- e.g. repositories prefixed with 'platform-' belong to the Platform team -->

## Technology Standards
<!-- e.g. backend services use Java 21 and Spring Boot -->

## Custom Indicators
<!-- anything else that helps identify deployable services -->
"#;

const REPO_TEMPLATE: &str = r#"# Repository Context

Hints for discovery of this repository. They refine the organization context.

## Service Information
<!-- e.g. microservice handling user authentication -->

## Deployment Details
<!-- e.g. GitHub Actions deploys to AWS ECS -->

## Team Ownership
<!-- e.g. owned by the Identity team -->

## Technology Notes
<!-- e.g. FastAPI with PostgreSQL -->

## Special Considerations
<!-- unusual layout or exceptions -->
"#;

/// Write `<dir>/<org>.md` from the template
pub fn init_org_context(dir: &Path, org: &str, force: bool) -> Result<PathBuf> {
    if org.trim().is_empty() || org.contains(['/', '\\']) {
        return Err(DiscoveryError::Validation(format!(
            "Invalid organization name: '{}'",
            org
        )));
    }
    std::fs::create_dir_all(dir)?;
    write_template(&dir.join(format!("{}.md", org)), &ORG_TEMPLATE.replace("{org}", org), force)
}

/// Write `.sbs-discovery.md` into `dir` from the template
pub fn init_repo_context(dir: &Path, force: bool) -> Result<PathBuf> {
    write_template(&dir.join(constants::context::REPO_CONTEXT_FILE), REPO_TEMPLATE, force)
}

fn write_template(path: &Path, content: &str, force: bool) -> Result<PathBuf> {
    if path.exists() && !force {
        return Err(DiscoveryError::Validation(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    std::fs::write(path, content)?;
    info!(path = %path.display(), "Context template written");
    Ok(path.to_path_buf())
}
