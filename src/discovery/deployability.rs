//! Deployability Decision
//!
//! Strong signals settle the question without a model call. Otherwise every
//! CI/CD file carrying a medium or strong signal is shown to the workflow
//! classifier until one of them turns out to deploy something.

use tracing::{debug, info, warn};

use crate::ai::agents::{WorkflowClass, WorkflowClassifierAgent, WorkflowInput};
use crate::ai::provider::LlmProvider;
use crate::discovery::strength::strong_signal_files;
use crate::snapshot::RepositorySnapshot;
use crate::types::{DeploymentSignal, SignalCategory, SignalStrength};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployabilityDecision {
    pub deployable: bool,
    /// Strong signal files, plus the deploying workflow found by the fallback
    pub signal_files: Vec<String>,
    /// Whether the workflow classifier was consulted
    pub used_fallback: bool,
    /// Workflows the classifier could not judge
    pub warnings: Vec<String>,
}

/// Shared inputs for the workflow classifier
pub struct DeployabilityContext<'a> {
    pub readme_head: Option<&'a str>,
    pub context: Option<&'a str>,
}

/// CI/CD files with a medium or strong signal, first occurrence order
pub fn fallback_candidates(signals: &[DeploymentSignal]) -> Vec<&str> {
    let mut files: Vec<&str> = Vec::new();
    for signal in signals {
        let eligible = signal.category == SignalCategory::CiCd
            && matches!(signal.strength, SignalStrength::Medium | SignalStrength::Strong);
        if eligible && !files.contains(&signal.file_path.as_str()) {
            files.push(&signal.file_path);
        }
    }
    files
}

/// Decide deployability from classified signals
pub async fn decide(
    provider: &dyn LlmProvider,
    snapshot: &dyn RepositorySnapshot,
    signals: &[DeploymentSignal],
    ctx: &DeployabilityContext<'_>,
) -> DeployabilityDecision {
    let mut signal_files = strong_signal_files(signals);
    if !signal_files.is_empty() {
        debug!(strong = signal_files.len(), "Strong signals present");
        return DeployabilityDecision {
            deployable: true,
            signal_files,
            ..Default::default()
        };
    }

    let candidates = fallback_candidates(signals);
    if candidates.is_empty() {
        debug!("No strong signals and no CI/CD workflows to classify");
        return DeployabilityDecision::default();
    }

    let mut warnings = Vec::new();
    for path in candidates {
        let content = match snapshot.read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path, error = %e, "Cannot read workflow file");
                warnings.push(format!("deployability: cannot read {}: {}", path, e));
                continue;
            }
        };

        let input = WorkflowInput {
            path,
            content: &content,
            readme_head: ctx.readme_head,
            strong_signal_files: &signal_files,
            context: ctx.context,
        };

        match WorkflowClassifierAgent::classify(provider, &input).await {
            Ok(WorkflowClass::Deployment) => {
                info!(path, "Workflow classified as deployment");
                signal_files.push(path.to_string());
                return DeployabilityDecision {
                    deployable: true,
                    signal_files,
                    used_fallback: true,
                    warnings,
                };
            }
            Ok(class) => debug!(path, classification = %class, "Workflow does not deploy"),
            Err(e) => {
                warn!(path, error = %e, "Workflow classification failed");
                warnings.push(format!("deployability: classifier failed for {}: {}", path, e));
            }
        }
    }

    DeployabilityDecision {
        deployable: false,
        signal_files,
        used_fallback: true,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::agents::testing::ScriptedProvider;
    use crate::discovery::scanner::SignalScanner;
    use crate::discovery::strength;
    use crate::snapshot::LocalSnapshot;
    use crate::types::ErrorCategory;
    use tempfile::TempDir;

    fn repo(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (path, content) in files {
            let full = temp.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        temp
    }

    async fn run(temp: &TempDir, provider: &ScriptedProvider) -> DeployabilityDecision {
        let snapshot = LocalSnapshot::open(temp.path()).unwrap();
        let signals = strength::classify(&SignalScanner::new().scan(&snapshot));
        let ctx = DeployabilityContext {
            readme_head: None,
            context: None,
        };
        decide(provider, &snapshot, &signals, &ctx).await
    }

    #[tokio::test]
    async fn test_strong_signals_skip_classifier() {
        let temp = repo(&[
            ("package.json", "{}"),
            ("Dockerfile", "FROM node"),
            (".github/workflows/deploy.yml", "run: docker push x && kubectl apply -f k8s"),
        ]);
        let provider = ScriptedProvider::failing();
        let decision = run(&temp, &provider).await;

        assert!(decision.deployable);
        assert!(!decision.used_fallback);
        assert_eq!(provider.call_count(), 0);
        assert!(decision.signal_files.contains(&"Dockerfile".to_string()));
    }

    #[tokio::test]
    async fn test_no_signals_is_not_deployable_without_llm() {
        let temp = repo(&[("notes.txt", "hello")]);
        let provider = ScriptedProvider::failing();
        let decision = run(&temp, &provider).await;
        assert!(!decision.deployable);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_finds_deploying_workflow() {
        // package manager + CI/CD gives medium signals only
        let temp = repo(&[
            ("pom.xml", "<project/>"),
            (".github/workflows/a.yml", "run: mvn test"),
            (".github/workflows/b.yml", "run: ./release.sh"),
        ]);
        let provider = ScriptedProvider::new(vec![
            r#"{"classification": "tooling"}"#,
            r#"{"classification": "deployment"}"#,
        ]);
        let decision = run(&temp, &provider).await;

        assert!(decision.deployable);
        assert!(decision.used_fallback);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(decision.signal_files, vec![".github/workflows/b.yml"]);
    }

    #[tokio::test]
    async fn test_classifier_failures_are_not_fatal() {
        let temp = repo(&[
            ("pom.xml", "<project/>"),
            (".github/workflows/a.yml", "run: mvn test"),
            (".github/workflows/b.yml", "run: mvn verify"),
        ]);
        let provider = ScriptedProvider::new(vec![r#"{"classification": "tooling"}"#])
            .push_error(ErrorCategory::Auth);
        // queue order: tooling answer is consumed first, then the error
        let decision = run(&temp, &provider).await;

        assert!(!decision.deployable);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(decision.warnings.len(), 1);
    }

    #[test]
    fn test_fallback_candidates_dedup_and_filter() {
        let signals = vec![
            DeploymentSignal::new(SignalCategory::CiCd, "github_actions", "w.yml", "")
                .with_strength(SignalStrength::Medium),
            DeploymentSignal::new(SignalCategory::CiCd, "deployment_step", "w.yml", "")
                .with_strength(SignalStrength::Medium),
            DeploymentSignal::new(SignalCategory::CiCd, "gitlab", ".gitlab-ci.yml", "")
                .with_strength(SignalStrength::Weak),
            DeploymentSignal::new(SignalCategory::PackageManager, "java", "pom.xml", "")
                .with_strength(SignalStrength::Medium),
        ];
        assert_eq!(fallback_candidates(&signals), vec!["w.yml"]);
    }
}
