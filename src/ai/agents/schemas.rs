//! JSON Schemas for Agent Outputs
//!
//! Sent in the system prompt so every provider sees the same contract.

use serde_json::{Value, json};

/// Schema provider for prompt agents
pub struct AgentSchemas;

impl AgentSchemas {
    pub fn workflow_schema() -> Value {
        json!({
            "type": "object",
            "required": ["classification"],
            "properties": {
                "classification": {
                    "type": "string",
                    "description": "deployment if the workflow ships a runnable service to an environment, tooling for tests/lint/release chores",
                    "enum": ["deployment", "tooling", "unknown"]
                },
                "reason": {"type": "string"}
            }
        })
    }

    pub fn services_schema() -> Value {
        json!({
            "type": "object",
            "required": ["services"],
            "properties": {
                "services": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["path"],
                        "properties": {
                            "path": {"type": "string", "description": "Directory path from the candidate list"},
                            "name": {"type": "string"},
                            "language": {"type": "string"},
                            "confidence": {"type": "string", "enum": ["high", "medium", "low"]},
                            "evidence": {"type": "array", "items": {"type": "string"}}
                        }
                    }
                }
            }
        })
    }

    pub fn language_schema() -> Value {
        json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": {"type": "string", "description": "Primary programming language"},
                "version": {"type": "string", "description": "Language or runtime version declared in manifests, empty if unknown"},
                "reason": {"type": "string"}
            }
        })
    }

    pub fn owners_schema() -> Value {
        json!({
            "type": "object",
            "required": ["owners"],
            "properties": {
                "owners": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["service", "owner_team"],
                        "properties": {
                            "service": {"type": "string", "description": "Path pattern or service name, * for the default rule"},
                            "owner_team": {
                                "description": "Owning team handle(s)",
                                "oneOf": [
                                    {"type": "string"},
                                    {"type": "array", "items": {"type": "string"}}
                                ]
                            }
                        }
                    }
                }
            }
        })
    }

    pub fn contributors_schema() -> Value {
        json!({
            "type": "object",
            "required": ["individuals"],
            "properties": {
                "individuals": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "name": {"type": "string"},
                            "emails": {"type": "array", "items": {"type": "string"}}
                        }
                    }
                }
            }
        })
    }

    pub fn tech_stack_schema() -> Value {
        json!({
            "type": "object",
            "required": ["tech_stacks"],
            "properties": {
                "tech_stacks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "name": {"type": "string"},
                            "version": {"type": "string"},
                            "confidence": {"type": "string", "enum": ["high", "medium", "low"]},
                            "evidence": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "path": {"type": "string"},
                                        "snippet": {"type": "string"},
                                        "reason": {"type": "string"}
                                    }
                                }
                            }
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas_are_objects_with_required() {
        for schema in [
            AgentSchemas::workflow_schema(),
            AgentSchemas::services_schema(),
            AgentSchemas::language_schema(),
            AgentSchemas::owners_schema(),
            AgentSchemas::contributors_schema(),
            AgentSchemas::tech_stack_schema(),
        ] {
            assert_eq!(schema["type"], "object");
            assert!(schema["required"].as_array().is_some_and(|r| !r.is_empty()));
        }
    }
}
