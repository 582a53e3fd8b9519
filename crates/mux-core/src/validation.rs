//! Validation for loaded configuration.

use serde::{Deserialize, Serialize};

use crate::agents::AgentRoster;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: ValidationLevel,
    pub code: &'static str,
    pub message: String,
}

pub trait Validate {
    fn validate(&self) -> Vec<ValidationIssue>;
}

impl Validate for AgentRoster {
    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for agent in self.iter() {
            if agent.path.as_os_str().is_empty() {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Error,
                    code: "agents.path.empty",
                    message: format!("agent '{}' has no working directory", agent.name),
                });
            } else if agent.path.is_relative() {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Warning,
                    code: "agents.path.relative",
                    message: format!(
                        "agent '{}' uses relative path {}; the config contract expects absolute paths",
                        agent.name,
                        agent.path.display()
                    ),
                });
            }

            // A missing directory is only fatal at subprocess launch time.
            if agent.path.is_absolute() && !agent.path.is_dir() {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Warning,
                    code: "agents.path.missing",
                    message: format!(
                        "agent '{}' working directory {} does not exist",
                        agent.name,
                        agent.path.display()
                    ),
                });
            }

            if agent.description.trim().is_empty() {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Warning,
                    code: "agents.description.empty",
                    message: format!("agent '{}' has no description", agent.name),
                });
            }
        }

        issues
    }
}
