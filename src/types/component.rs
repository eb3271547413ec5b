//! Self-built component model
//!
//! A component is one independently deployable unit found in a repository,
//! together with the ownership, language and tech-stack metadata attached by
//! the enrichment stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Fe,
    Be,
    Library,
    #[default]
    Unknown,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fe => write!(f, "fe"),
            Self::Be => write!(f, "be"),
            Self::Library => write!(f, "library"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fe" | "frontend" => Ok(Self::Fe),
            "be" | "backend" => Ok(Self::Be),
            "library" | "lib" => Ok(Self::Library),
            "unknown" | "" => Ok(Self::Unknown),
            _ => Err(format!("Unknown component type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!("Unknown confidence: {}", s)),
        }
    }
}

// =============================================================================
// Metadata
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub individuals: Vec<Individual>,
}

impl Owner {
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty() && self.individuals.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub reason: String,
}

impl LanguageInfo {
    /// Marker used when a component has no recognizable source files
    pub fn not_applicable() -> Self {
        Self {
            name: "NA".to_string(),
            version: String::new(),
            reason: "No source files found".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub path: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechStack {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

// =============================================================================
// Component
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfBuiltComponent {
    pub id: String,
    pub name: String,
    /// Repository-relative directory; empty for the repository root
    pub path: String,
    pub display_url: String,
    #[serde(default)]
    pub owner: Owner,
    #[serde(default)]
    pub language: Option<LanguageInfo>,
    #[serde(default)]
    pub component_type: ComponentType,
    #[serde(default)]
    pub tech_stacks: Vec<TechStack>,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub confidence: Confidence,
}

impl SelfBuiltComponent {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            path: path.into(),
            display_url: String::new(),
            owner: Owner::default(),
            language: None,
            component_type: ComponentType::Unknown,
            tech_stacks: Vec::new(),
            evidence: String::new(),
            confidence: Confidence::Medium,
        }
    }

    pub fn with_display_url(mut self, url: impl Into<String>) -> Self {
        self.display_url = url.into();
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    /// Directory the component lives in, `.` for the root
    pub fn dir(&self) -> &str {
        match self.path.trim_matches('/') {
            "" => ".",
            p => p,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_defaults() {
        let c = SelfBuiltComponent::new("api", "services/api");
        assert_eq!(c.component_type, ComponentType::Unknown);
        assert_eq!(c.confidence, Confidence::Medium);
        assert!(c.owner.is_empty());
        assert_eq!(c.id.len(), 36);
        assert_eq!(c.dir(), "services/api");
        assert_eq!(SelfBuiltComponent::new("x", "").dir(), ".");
    }

    #[test]
    fn test_component_ids_unique() {
        let a = SelfBuiltComponent::new("a", "a");
        let b = SelfBuiltComponent::new("a", "a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_confidence_parse() {
        assert_eq!(" High ".parse::<Confidence>(), Ok(Confidence::High));
        assert!("certain".parse::<Confidence>().is_err());
        assert_eq!("backend".parse::<ComponentType>(), Ok(ComponentType::Be));
    }

    #[test]
    fn test_tech_stack_lenient_deserialize() {
        let stack: TechStack = serde_json::from_str(r#"{"name":"spring-boot"}"#).unwrap();
        assert_eq!(stack.name, "spring-boot");
        assert!(stack.evidence.is_empty());
        assert_eq!(stack.confidence, Confidence::Medium);
    }
}
