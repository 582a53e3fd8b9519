//! Implicit agent delegation for non-slash prompts.
//!
//! A prompt like "ask the family agent for gift ideas" runs one-off in the
//! family agent's context without switching the session's persisted agent.
//! Keywords are derived from the configured roster, so only real agents can
//! be delegated to.

use regex::Regex;

use mux_core::AgentRoster;

const DELEGATION_PHRASES: &[&str] = &[
    "ask the",
    "have the",
    "this is in the",
    "in the",
    "from the",
    "use the",
    "check the",
    "find in the",
    "search the",
];

/// Returns the targeted agent and the prompt with the delegation phrase
/// removed, or `None` when the prompt does not delegate.
pub fn detect_delegation(prompt: &str, roster: &AgentRoster) -> Option<(String, String)> {
    for agent in roster.iter() {
        let keyword = format!("{} agent", agent.name);
        for phrase in DELEGATION_PHRASES {
            let pattern = format!(
                r"(?i)\b{}\s+{}[,.]?\s*",
                regex::escape(phrase),
                regex::escape(&keyword)
            );
            let Ok(matcher) = Regex::new(&pattern) else {
                continue;
            };
            if matcher.is_match(prompt) {
                let cleaned = matcher.replace(prompt, "").trim().to_string();
                return Some((agent.name.clone(), cleaned));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use mux_core::{AgentDescriptor, AgentRoster};

    use super::detect_delegation;

    fn roster() -> AgentRoster {
        AgentRoster::from_agents(
            ["family", "devops"]
                .into_iter()
                .map(|name| AgentDescriptor {
                    name: name.to_string(),
                    description: format!("{name} agent"),
                    path: PathBuf::from(format!("/srv/{name}")),
                })
                .collect(),
        )
    }

    #[test]
    fn detects_ask_the_agent_phrase_and_strips_it() {
        let (agent, cleaned) = detect_delegation(
            "ask the family agent for Parker's Christmas ideas",
            &roster(),
        )
        .expect("delegation detected");
        assert_eq!(agent, "family");
        assert_eq!(cleaned, "for Parker's Christmas ideas");
    }

    #[test]
    fn detection_is_case_insensitive() {
        let (agent, cleaned) =
            detect_delegation("Have the DevOps agent check production status", &roster())
                .expect("delegation detected");
        assert_eq!(agent, "devops");
        assert_eq!(cleaned, "check production status");
    }

    #[test]
    fn plain_prompts_are_not_delegated() {
        assert_eq!(detect_delegation("what's the weather like", &roster()), None);
        assert_eq!(
            detect_delegation("the family agenda is busy", &roster()),
            None
        );
    }

    #[test]
    fn unconfigured_agents_are_not_delegated() {
        assert_eq!(
            detect_delegation("ask the billing agent about invoices", &roster()),
            None
        );
    }
}
