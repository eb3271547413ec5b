//! Signal Strength Classifier
//!
//! Strength is a property of the whole signal set: three presence flags
//! (package manager, CI/CD, a way to run) are computed across all signals and
//! every signal is re-tiered from their count.

use crate::constants::signals::{MEDIUM_COMBINATION, STRONG_COMBINATION};
use crate::types::{DeploymentSignal, SignalCategory, SignalStrength};

/// Presence of the three required evidence kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Combination {
    pub has_package_manager: bool,
    pub has_ci_cd: bool,
    pub has_way_to_run: bool,
}

impl Combination {
    pub fn of(signals: &[DeploymentSignal]) -> Self {
        Self {
            has_package_manager: signals
                .iter()
                .any(|s| s.category == SignalCategory::PackageManager),
            has_ci_cd: signals
                .iter()
                .any(|s| s.category == SignalCategory::CiCd || s.is_deployment_step()),
            has_way_to_run: signals.iter().any(|s| s.category.is_way_to_run()),
        }
    }

    pub fn count(&self) -> usize {
        [self.has_package_manager, self.has_ci_cd, self.has_way_to_run]
            .into_iter()
            .filter(|b| *b)
            .count()
    }
}

/// Return the signals with their final strength assigned.
///
/// Pure and idempotent: the result only depends on the set of categories.
pub fn classify(signals: &[DeploymentSignal]) -> Vec<DeploymentSignal> {
    let combination = Combination::of(signals);
    let count = combination.count();

    tracing::debug!(
        package_manager = combination.has_package_manager,
        ci_cd = combination.has_ci_cd,
        way_to_run = combination.has_way_to_run,
        "Deployment components found"
    );

    signals
        .iter()
        .map(|signal| {
            let substantive = signal.category.is_substantive() || signal.is_deployment_step();
            let strength = match (count, substantive) {
                (c, true) if c >= STRONG_COMBINATION => SignalStrength::Strong,
                (c, false) if c >= STRONG_COMBINATION => SignalStrength::Medium,
                (c, true) if c >= MEDIUM_COMBINATION => SignalStrength::Medium,
                _ => SignalStrength::Weak,
            };
            signal.clone().with_strength(strength)
        })
        .collect()
}

/// Paths of strong signals, deduplicated in first-seen order
pub fn strong_signal_files(signals: &[DeploymentSignal]) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for signal in signals.iter().filter(|s| s.strength == SignalStrength::Strong) {
        if !files.contains(&signal.file_path) {
            files.push(signal.file_path.clone());
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEPLOYMENT_STEP;
    use proptest::prelude::*;

    fn sig(category: SignalCategory, ty: &str, path: &str) -> DeploymentSignal {
        DeploymentSignal::new(category, ty, path, "test")
    }

    #[test]
    fn test_all_three_components_make_strong() {
        let signals = vec![
            sig(SignalCategory::PackageManager, "javascript", "package.json"),
            sig(SignalCategory::CiCd, "github_actions", ".github/workflows/d.yml"),
            sig(SignalCategory::Containerization, "docker", "Dockerfile"),
            sig(SignalCategory::InfrastructureAsCode, "terraform", "main.tf"),
        ];
        let classified = classify(&signals);
        let strengths: Vec<_> = classified.iter().map(|s| s.strength).collect();
        assert_eq!(
            strengths,
            vec![
                SignalStrength::Strong,
                SignalStrength::Strong,
                SignalStrength::Strong,
                SignalStrength::Medium
            ]
        );
    }

    #[test]
    fn test_two_components_make_medium() {
        let signals = vec![
            sig(SignalCategory::PackageManager, "go", "go.mod"),
            sig(SignalCategory::Kubernetes, "helm", "Chart.yaml"),
            sig(SignalCategory::Gitops, "flux", "helmrelease.yaml"),
        ];
        let classified = classify(&signals);
        assert_eq!(classified[0].strength, SignalStrength::Medium);
        assert_eq!(classified[1].strength, SignalStrength::Medium);
        assert_eq!(classified[2].strength, SignalStrength::Weak);
    }

    #[test]
    fn test_single_component_is_weak() {
        let signals = vec![
            sig(SignalCategory::CiCd, DEPLOYMENT_STEP, ".gitlab-ci.yml")
                .with_strength(SignalStrength::Medium),
        ];
        assert_eq!(classify(&signals)[0].strength, SignalStrength::Weak);
    }

    #[test]
    fn test_empty_input() {
        assert!(classify(&[]).is_empty());
        assert_eq!(Combination::of(&[]).count(), 0);
    }

    #[test]
    fn test_strong_signal_files_dedup() {
        let signals = vec![
            sig(SignalCategory::PackageManager, "javascript", "package.json"),
            sig(SignalCategory::CiCd, "github_actions", "ci.yml"),
            sig(SignalCategory::CiCd, DEPLOYMENT_STEP, "ci.yml"),
            sig(SignalCategory::Containerization, "docker", "Dockerfile"),
        ];
        let files = strong_signal_files(&classify(&signals));
        assert_eq!(files, vec!["package.json", "ci.yml", "Dockerfile"]);
    }

    fn arb_category() -> impl Strategy<Value = SignalCategory> {
        prop::sample::select(SignalCategory::ALL.to_vec())
    }

    fn arb_strength() -> impl Strategy<Value = SignalStrength> {
        prop::sample::select(vec![
            SignalStrength::Strong,
            SignalStrength::Medium,
            SignalStrength::Weak,
        ])
    }

    fn arb_signals() -> impl Strategy<Value = Vec<DeploymentSignal>> {
        prop::collection::vec(
            (arb_category(), prop::bool::ANY, arb_strength()).prop_map(|(c, step, s)| {
                let ty = if step { DEPLOYMENT_STEP } else { "file" };
                sig(c, ty, "f").with_strength(s)
            }),
            0..12,
        )
    }

    proptest! {
        #[test]
        fn prop_classify_is_idempotent(signals in arb_signals()) {
            let once = classify(&signals);
            let twice = classify(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_classify_ignores_order(signals in arb_signals()) {
            let forward = classify(&signals);
            let mut reversed_input = signals.clone();
            reversed_input.reverse();
            let mut backward = classify(&reversed_input);
            backward.reverse();
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn prop_full_combination_promotes_substantive(signals in arb_signals()) {
            let classified = classify(&signals);
            if Combination::of(&signals).count() == 3 {
                for s in classified.iter().filter(|s| s.category.is_substantive()) {
                    prop_assert_eq!(s.strength, SignalStrength::Strong);
                }
            } else {
                prop_assert!(classified.iter().all(|s| s.strength != SignalStrength::Strong));
            }
        }
    }
}
