//! Evidence Pattern Catalog
//!
//! Static table of file patterns that indicate how a repository is built,
//! shipped, or run. Patterns are globs over repository-relative paths and
//! match at any depth.

use glob::{MatchOptions, Pattern};
use std::sync::LazyLock;

use crate::types::{SignalCategory, log_filter_warn};

use SignalCategory::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub category: SignalCategory,
    pub signal_type: &'static str,
    pub pattern: &'static str,
    pub description: &'static str,
}

const fn entry(
    category: SignalCategory,
    signal_type: &'static str,
    pattern: &'static str,
    description: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        category,
        signal_type,
        pattern,
        description,
    }
}

pub static CATALOG: &[CatalogEntry] = &[
    // package_manager
    entry(PackageManager, "java", "pom.xml", "Maven Project"),
    entry(PackageManager, "java", "build.gradle", "Gradle Project"),
    entry(PackageManager, "java", "build.gradle.kts", "Gradle Kotlin Project"),
    entry(PackageManager, "javascript", "package.json", "NPM/Node.js Project"),
    entry(PackageManager, "javascript", "project.json", "NX/Build Tool Project"),
    entry(PackageManager, "javascript", "yarn.lock", "Yarn Project"),
    entry(PackageManager, "javascript", "pnpm-lock.yaml", "PNPM Project"),
    entry(PackageManager, "python", "requirements.txt", "Python Requirements"),
    entry(PackageManager, "python", "pyproject.toml", "Python Project"),
    entry(PackageManager, "python", "setup.py", "Python Setup"),
    entry(PackageManager, "python", "Pipfile", "Pipenv Project"),
    entry(PackageManager, "python", "poetry.lock", "Poetry Project"),
    entry(PackageManager, "dotnet", "*.csproj", ".NET Project"),
    entry(PackageManager, "dotnet", "*.sln", ".NET Solution"),
    entry(PackageManager, "dotnet", "packages.config", ".NET Packages"),
    entry(PackageManager, "go", "go.mod", "Go Module"),
    entry(PackageManager, "rust", "Cargo.toml", "Rust Cargo Project"),
    entry(PackageManager, "php", "composer.json", "PHP Composer Project"),
    entry(PackageManager, "ruby", "Gemfile", "Ruby Gem Project"),
    // kubernetes
    entry(Kubernetes, "deployment_manifests", "deployment.yaml", "Kubernetes Deployment"),
    entry(Kubernetes, "deployment_manifests", "deployment.yml", "Kubernetes Deployment"),
    entry(Kubernetes, "deployment_manifests", "statefulset.yaml", "Kubernetes StatefulSet"),
    entry(Kubernetes, "deployment_manifests", "statefulset.yml", "Kubernetes StatefulSet"),
    entry(Kubernetes, "deployment_manifests", "job.yaml", "Kubernetes Job"),
    entry(Kubernetes, "deployment_manifests", "job.yml", "Kubernetes Job"),
    entry(Kubernetes, "deployment_manifests", "cronjob.yaml", "Kubernetes CronJob"),
    entry(Kubernetes, "deployment_manifests", "cronjob.yml", "Kubernetes CronJob"),
    entry(Kubernetes, "deployment_manifests", "*-deployment.yaml", "Kubernetes Deployment"),
    entry(Kubernetes, "deployment_manifests", "*-deployment.yml", "Kubernetes Deployment"),
    entry(Kubernetes, "deployment_manifests", "k8s/**/*.yaml", "Kubernetes Manifest"),
    entry(Kubernetes, "deployment_manifests", "k8s/**/*.yml", "Kubernetes Manifest"),
    entry(Kubernetes, "deployment_manifests", "kubernetes/**/*.yaml", "Kubernetes Manifest"),
    entry(Kubernetes, "deployment_manifests", "kubernetes/**/*.yml", "Kubernetes Manifest"),
    entry(Kubernetes, "deployment_manifests", "manifests/**/*.yaml", "Kubernetes Manifest"),
    entry(Kubernetes, "deployment_manifests", "manifests/**/*.yml", "Kubernetes Manifest"),
    entry(Kubernetes, "helm", "Chart.yaml", "Helm Chart"),
    entry(Kubernetes, "helm", "Chart.yml", "Helm Chart"),
    entry(Kubernetes, "helm", "values.yaml", "Helm Values"),
    entry(Kubernetes, "helm", "values.yml", "Helm Values"),
    entry(Kubernetes, "helm", "charts/**", "Helm Chart Directory"),
    entry(Kubernetes, "helm", "templates/**/*.yaml", "Helm Template"),
    entry(Kubernetes, "helm", "templates/**/*.yml", "Helm Template"),
    entry(Kubernetes, "kustomize", "kustomization.yaml", "Kustomize"),
    entry(Kubernetes, "kustomize", "kustomization.yml", "Kustomize"),
    entry(Kubernetes, "kustomize", "Kustomization", "Kustomize"),
    // containerization
    entry(Containerization, "docker", "Dockerfile", "Docker Build"),
    entry(Containerization, "docker", "Dockerfile.*", "Docker Build Variant"),
    entry(Containerization, "docker", "docker-compose.yml", "Docker Compose"),
    entry(Containerization, "docker", "docker-compose.yaml", "Docker Compose"),
    entry(Containerization, "docker", "docker-compose.*.yml", "Docker Compose Variant"),
    entry(Containerization, "docker", "docker-compose.*.yaml", "Docker Compose Variant"),
    entry(Containerization, "docker", ".dockerignore", "Docker Configuration"),
    entry(Containerization, "buildpacks", "project.toml", "Cloud Native Buildpacks"),
    entry(Containerization, "buildpacks", "Procfile", "Buildpack Process File"),
    // serverless
    entry(Serverless, "framework_agnostic", "serverless.yml", "Serverless Framework"),
    entry(Serverless, "framework_agnostic", "serverless.yaml", "Serverless Framework"),
    entry(Serverless, "aws", "template.yaml", "AWS SAM Template"),
    entry(Serverless, "aws", "template.yml", "AWS SAM Template"),
    entry(Serverless, "aws", "sam-template.yaml", "AWS SAM Template"),
    entry(Serverless, "aws", "cloudformation.yaml", "AWS CloudFormation"),
    entry(Serverless, "aws", "cloudformation.yml", "AWS CloudFormation"),
    entry(Serverless, "aws", "*.sam.yaml", "AWS SAM"),
    entry(Serverless, "aws", "*.sam.yml", "AWS SAM"),
    entry(Serverless, "azure", "host.json", "Azure Functions"),
    entry(Serverless, "azure", "function.json", "Azure Function"),
    entry(Serverless, "azure", "proxies.json", "Azure Functions Proxies"),
    entry(Serverless, "gcp", "app.yaml", "Google App Engine"),
    entry(Serverless, "gcp", "app.yml", "Google App Engine"),
    entry(Serverless, "gcp", "cron.yaml", "Google App Engine Cron"),
    entry(Serverless, "gcp", "queue.yaml", "Google App Engine Queue"),
    entry(Serverless, "gcp", "cloudbuild.yaml", "Google Cloud Build"),
    entry(Serverless, "gcp", "cloudbuild.yml", "Google Cloud Build"),
    entry(Serverless, "vercel", "vercel.json", "Vercel Deployment"),
    entry(Serverless, "vercel", "now.json", "Vercel (Now) Deployment"),
    entry(Serverless, "netlify", "netlify.toml", "Netlify Deployment"),
    entry(Serverless, "cloudflare", "wrangler.toml", "Cloudflare Workers"),
    // platform_specific
    entry(PlatformSpecific, "heroku", "Procfile", "Heroku Process File"),
    entry(PlatformSpecific, "heroku", "app.json", "Heroku App Configuration"),
    entry(PlatformSpecific, "heroku", "runtime.txt", "Heroku Runtime"),
    entry(PlatformSpecific, "fly_io", "fly.toml", "Fly.io Deployment"),
    entry(PlatformSpecific, "render", "render.yaml", "Render Deployment"),
    entry(PlatformSpecific, "railway", "railway.json", "Railway Deployment"),
    entry(PlatformSpecific, "railway", "railway.toml", "Railway Deployment"),
    // ci_cd
    entry(CiCd, "github_actions", ".github/workflows/*.yml", "GitHub Actions Workflow"),
    entry(CiCd, "github_actions", ".github/workflows/*.yaml", "GitHub Actions Workflow"),
    entry(CiCd, "gitlab", ".gitlab-ci.yml", "GitLab CI"),
    entry(CiCd, "jenkins", "Jenkinsfile", "Jenkins Pipeline"),
    entry(CiCd, "azure_pipelines", "azure-pipelines.yml", "Azure Pipelines"),
    entry(CiCd, "azure_pipelines", "azure-pipelines.yaml", "Azure Pipelines"),
    entry(CiCd, "circle_ci", ".circleci/config.yml", "CircleCI"),
    entry(CiCd, "travis", ".travis.yml", "Travis CI"),
    // infrastructure_as_code
    entry(InfrastructureAsCode, "terraform", "*.tf", "Terraform"),
    entry(InfrastructureAsCode, "terraform", "main.tf", "Terraform Main"),
    entry(InfrastructureAsCode, "terraform", "variables.tf", "Terraform Variables"),
    entry(InfrastructureAsCode, "terraform", "outputs.tf", "Terraform Outputs"),
    entry(InfrastructureAsCode, "pulumi", "Pulumi.yaml", "Pulumi"),
    entry(InfrastructureAsCode, "pulumi", "Pulumi.yml", "Pulumi"),
    entry(InfrastructureAsCode, "pulumi", "__main__.py", "Pulumi Python"),
    entry(InfrastructureAsCode, "pulumi", "index.ts", "Pulumi TypeScript"),
    entry(InfrastructureAsCode, "cdk", "cdk.json", "AWS CDK"),
    entry(InfrastructureAsCode, "cdk", "cdk.yaml", "AWS CDK"),
    // gitops
    entry(Gitops, "argocd", "application.yaml", "Argo CD Application"),
    entry(Gitops, "argocd", "application.yml", "Argo CD Application"),
    entry(Gitops, "argocd", "argocd/**/*.yaml", "Argo CD Configuration"),
    entry(Gitops, "flux", "kustomization.yaml", "Flux Kustomization"),
    entry(Gitops, "flux", "helmrelease.yaml", "Flux Helm Release"),
    entry(Gitops, "flux", "gitrepository.yaml", "Flux Git Repository"),
];

/// CI/CD files whose content is searched for deployment keywords
pub const CICD_CONTENT_PATTERNS: &[&str] = &[
    ".github/workflows/*.yml",
    ".github/workflows/*.yaml",
    ".gitlab-ci.yml",
    "Jenkinsfile",
    "azure-pipelines.yml",
    "azure-pipelines.yaml",
];

/// Compose files inspected for a local build context
pub const COMPOSE_PATTERNS: &[&str] = &["docker-compose*.yml", "docker-compose*.yaml"];

/// Deployment-action vocabulary for CI/CD content detection (lowercase)
pub const DEPLOYMENT_KEYWORDS: &[&str] = &[
    "docker build",
    "docker push",
    "kubectl apply",
    "helm upgrade",
    "helm install",
    "serverless deploy",
    "aws ecs",
    "gcloud deploy",
    "terraform apply",
    "pulumi up",
    "deploy:",
    "deployment:",
    "aws lambda",
    "azure functions",
    "vercel --prod",
    "netlify deploy",
];

// =============================================================================
// Matching
// =============================================================================

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A catalog glob anchored to match at the root or at any depth below it
#[derive(Debug, Clone)]
pub struct AnyDepthPattern {
    at_root: Pattern,
    nested: Pattern,
}

impl AnyDepthPattern {
    pub fn new(pattern: &str) -> Result<Self, glob::PatternError> {
        Ok(Self {
            at_root: Pattern::new(pattern)?,
            nested: Pattern::new(&format!("**/{}", pattern))?,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.at_root.matches_with(path, MATCH_OPTIONS)
            || self.nested.matches_with(path, MATCH_OPTIONS)
    }
}

fn compile_all<'a, T: 'a>(
    items: impl IntoIterator<Item = (&'a str, T)>,
) -> Vec<(T, AnyDepthPattern)> {
    items
        .into_iter()
        .filter_map(|(pattern, item)| {
            log_filter_warn(AnyDepthPattern::new(pattern), "invalid catalog pattern")
                .map(|compiled| (item, compiled))
        })
        .collect()
}

static COMPILED_CATALOG: LazyLock<Vec<(&'static CatalogEntry, AnyDepthPattern)>> =
    LazyLock::new(|| compile_all(CATALOG.iter().map(|e| (e.pattern, e))));

static COMPILED_CICD: LazyLock<Vec<((), AnyDepthPattern)>> =
    LazyLock::new(|| compile_all(CICD_CONTENT_PATTERNS.iter().map(|p| (*p, ()))));

static COMPILED_COMPOSE: LazyLock<Vec<((), AnyDepthPattern)>> =
    LazyLock::new(|| compile_all(COMPOSE_PATTERNS.iter().map(|p| (*p, ()))));

/// Catalog entries matching a repository-relative path, in catalog order
pub fn matching_entries(path: &str) -> impl Iterator<Item = &'static CatalogEntry> + '_ {
    COMPILED_CATALOG
        .iter()
        .filter(move |(_, pattern)| pattern.matches(path))
        .map(|(entry, _)| *entry)
}

pub fn is_cicd_content_file(path: &str) -> bool {
    COMPILED_CICD.iter().any(|(_, p)| p.matches(path))
}

pub fn is_compose_file(path: &str) -> bool {
    COMPILED_COMPOSE.iter().any(|(_, p)| p.matches(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types_for(path: &str) -> Vec<(SignalCategory, &'static str)> {
        matching_entries(path)
            .map(|e| (e.category, e.signal_type))
            .collect()
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(COMPILED_CATALOG.len(), CATALOG.len());
        assert_eq!(COMPILED_CICD.len(), CICD_CONTENT_PATTERNS.len());
    }

    #[test]
    fn test_root_and_nested_matches() {
        assert_eq!(types_for("package.json"), vec![(PackageManager, "javascript")]);
        assert_eq!(
            types_for("apps/web/package.json"),
            vec![(PackageManager, "javascript")]
        );
        assert!(types_for("package.json.bak").is_empty());
    }

    #[test]
    fn test_workflow_patterns() {
        assert_eq!(
            types_for(".github/workflows/deploy.yml"),
            vec![(CiCd, "github_actions")]
        );
        assert_eq!(
            types_for("services/api/.github/workflows/ci.yaml"),
            vec![(CiCd, "github_actions")]
        );
        // wildcard must not cross directories
        assert!(types_for(".github/workflows/nested/ci.yml").is_empty());
    }

    #[test]
    fn test_recursive_directory_patterns() {
        assert!(types_for("deploy/k8s/base/svc.yaml").contains(&(Kubernetes, "deployment_manifests")));
        assert!(types_for("k8s/svc.yml").contains(&(Kubernetes, "deployment_manifests")));
        assert!(types_for("charts/api/Chart.yaml").contains(&(Kubernetes, "helm")));
    }

    #[test]
    fn test_procfile_counts_twice() {
        let matches = types_for("Procfile");
        assert!(matches.contains(&(Containerization, "buildpacks")));
        assert!(matches.contains(&(PlatformSpecific, "heroku")));
    }

    #[test]
    fn test_kustomization_in_kubernetes_and_gitops() {
        let matches = types_for("overlays/prod/kustomization.yaml");
        assert!(matches.contains(&(Kubernetes, "kustomize")));
        assert!(matches.contains(&(Gitops, "flux")));
    }

    #[test]
    fn test_content_file_predicates() {
        assert!(is_cicd_content_file(".github/workflows/release.yaml"));
        assert!(is_cicd_content_file("ci/Jenkinsfile"));
        assert!(!is_cicd_content_file(".travis.yml"));
        assert!(is_compose_file("docker-compose.yml"));
        assert!(is_compose_file("ops/docker-compose.prod.yaml"));
        assert!(!is_compose_file("compose.yml"));
    }

    #[test]
    fn test_terraform_main_matches_two_entries() {
        let matches = types_for("infra/main.tf");
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|(c, _)| *c == InfrastructureAsCode));
    }
}
