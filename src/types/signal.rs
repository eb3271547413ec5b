//! Deployment signal types
//!
//! A signal is a single piece of filesystem evidence that a repository builds
//! or ships something runnable. Scanning produces weak signals; the strength
//! classifier assigns the final tier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Evidence category a signal belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    PackageManager,
    Kubernetes,
    Containerization,
    Serverless,
    PlatformSpecific,
    CiCd,
    InfrastructureAsCode,
    Gitops,
}

impl SignalCategory {
    pub const ALL: [SignalCategory; 8] = [
        Self::PackageManager,
        Self::Kubernetes,
        Self::Containerization,
        Self::Serverless,
        Self::PlatformSpecific,
        Self::CiCd,
        Self::InfrastructureAsCode,
        Self::Gitops,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackageManager => "package_manager",
            Self::Kubernetes => "kubernetes",
            Self::Containerization => "containerization",
            Self::Serverless => "serverless",
            Self::PlatformSpecific => "platform_specific",
            Self::CiCd => "ci_cd",
            Self::InfrastructureAsCode => "infrastructure_as_code",
            Self::Gitops => "gitops",
        }
    }

    /// Categories that count as "a way to run" the built artifact
    pub fn is_way_to_run(&self) -> bool {
        matches!(
            self,
            Self::Containerization | Self::Serverless | Self::PlatformSpecific | Self::Kubernetes
        )
    }

    /// Categories promoted by the strength classifier
    pub fn is_substantive(&self) -> bool {
        matches!(self, Self::PackageManager | Self::CiCd) || self.is_way_to_run()
    }
}

impl fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown signal category: {}", s))
    }
}

/// Confidence tier of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStrength {
    Strong,
    Medium,
    #[default]
    Weak,
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strong => write!(f, "strong"),
            Self::Medium => write!(f, "medium"),
            Self::Weak => write!(f, "weak"),
        }
    }
}

/// Signal type for CI/CD files whose content contains a deployment keyword
pub const DEPLOYMENT_STEP: &str = "deployment_step";

/// Signal type for compose files with a local build context
pub const LOCAL_BUILD: &str = "local_build";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSignal {
    pub category: SignalCategory,
    pub signal_type: String,
    /// Repository-relative path with `/` separators
    pub file_path: String,
    pub description: String,
    #[serde(default)]
    pub strength: SignalStrength,
}

impl DeploymentSignal {
    pub fn new(
        category: SignalCategory,
        signal_type: impl Into<String>,
        file_path: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category,
            signal_type: signal_type.into(),
            file_path: file_path.into(),
            description: description.into(),
            strength: SignalStrength::Weak,
        }
    }

    pub fn with_strength(mut self, strength: SignalStrength) -> Self {
        self.strength = strength;
        self
    }

    pub fn is_deployment_step(&self) -> bool {
        self.category == SignalCategory::CiCd && self.signal_type == DEPLOYMENT_STEP
    }
}
