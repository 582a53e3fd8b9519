//! Slash-command dispatcher.
//!
//! One parsed command per invocation. Every verb renders a human-readable
//! string; nothing escapes this module as an error, so the caller can always
//! print the result and exit zero.

use mux_core::{
    build_context_preamble, AgentDescriptor, AgentRoster, ExternalId, SessionRecord, ALL_RUNTIMES,
};
use mux_runtimes::{default_model, model_catalog, resolve_model, RuntimeError};

use crate::session_store::SessionStore;
use crate::tracking::{CancelOutcome, RunningQueryStore};

/// Seam between the dispatcher and the process supervisor, used by
/// `/agent invoke` and implicit delegation. Implementations run one prompt to
/// completion and render the outcome as a string.
pub trait QueryExecutor {
    /// One-off execution in `agent`'s context with a fresh backend session;
    /// must not mutate the persisted session record.
    fn execute_detached(&self, record: &SessionRecord, agent: &AgentDescriptor, prompt: &str)
        -> String;
}

/// Splits a command line on whitespace; single- or double-quoted segments
/// preserve embedded spaces.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

pub struct Dispatcher<'a> {
    pub roster: &'a AgentRoster,
    pub sessions: &'a SessionStore,
    pub tracker: &'a RunningQueryStore,
}

impl Dispatcher<'_> {
    /// Handles `input` when it is a slash command; returns `None` so the
    /// caller forwards anything else as a literal prompt.
    pub fn dispatch(
        &self,
        external_id: &ExternalId,
        input: &str,
        executor: &dyn QueryExecutor,
    ) -> Option<String> {
        let trimmed = input.trim();
        if !trimmed.starts_with('/') {
            return None;
        }

        let tokens = tokenize(trimmed);
        let verb = tokens
            .first()
            .map(|token| token.to_lowercase())
            .unwrap_or_default();

        Some(match verb.as_str() {
            "/help" => self.help(),
            "/capabilities" => self.capabilities(),
            "/runtime" => self.runtime_command(external_id, &tokens),
            "/model" => self.model_command(external_id, &tokens),
            "/agent" => self.agent_command(external_id, &tokens, executor),
            "/session" => self.session_command(external_id, &tokens),
            "/status" => self.tracker.describe(external_id),
            "/cancel" => self.cancel_command(external_id),
            other => format!("Unknown command '{other}'. Use /help to list available commands."),
        })
    }

    fn help(&self) -> String {
        let agents = if self.roster.is_empty() {
            "none configured".to_string()
        } else {
            self.roster.names().join(", ")
        };

        format!(
            "**Available Commands**\n\n\
             **Runtime Management:**\n\
             - `/runtime list` - Show available runtimes\n\
             - `/runtime set <copilot|opencode|claude|gemini|codex>` - Switch runtime\n\
             - `/runtime current` - Show current runtime\n\n\
             **Model Management:**\n\
             - `/model list` - Show available models for the current runtime\n\
             - `/model set \"<model>\"` - Switch model\n\
             - `/model current` - Show current model\n\n\
             **Agent Management:**\n\
             - `/agent list` - Show available agents\n\
             - `/agent set \"<agent>\"` - Switch agent (starts a fresh backend session)\n\
             - `/agent current` - Show current agent\n\
             - `/agent invoke \"<agent>\" \"<prompt>\"` - One-off call into another agent\n\n\
             **Session:**\n\
             - `/session reset` - Forget the backend session; next message starts fresh\n\n\
             **Tracking:**\n\
             - `/status` - Report the in-flight query for this conversation\n\
             - `/cancel` - Terminate the in-flight query\n\n\
             **Other:**\n\
             - `/capabilities` - Show what the configured agents can help with\n\n\
             You can also mention an agent directly, e.g. \
             \"ask the devops agent to check the server\".\n\n\
             Configured agents: {agents}"
        )
    }

    fn capabilities(&self) -> String {
        if self.roster.is_empty() {
            return "No agents configured. Add agents to the agents config file to extend \
                    capabilities."
                .to_string();
        }

        let mut out = String::from("# Capabilities\n\nI can help with the following agents:\n\n");
        for agent in self.roster.iter() {
            let description = if agent.description.is_empty() {
                "No description"
            } else {
                &agent.description
            };
            out.push_str(&format!(
                "### {}\n- **Description:** {description}\n- **Location:** `{}`\n\n",
                agent.name,
                agent.path.display()
            ));
        }
        out.push_str(
            "#### How to use\n\
             - `/agent set <agent_name>` - switch to an agent and work with it.\n\
             - `/agent list` - show all available agents and their locations.",
        );
        out
    }

    fn runtime_command(&self, external_id: &ExternalId, tokens: &[String]) -> String {
        let Some(action) = tokens.get(1) else {
            return "Usage: /runtime <list|set|current>".to_string();
        };

        match action.to_lowercase().as_str() {
            "list" => {
                let mut out = String::from("**Available Runtimes**\n\n");
                for kind in ALL_RUNTIMES {
                    out.push_str(&format!("- `{}` ({})\n", kind, kind.label()));
                }
                out.trim_end().to_string()
            }
            "current" => {
                let record = self.sessions.load(external_id);
                format!("**Current Runtime:** `{}`", record.runtime)
            }
            "set" => {
                let Some(raw) = tokens.get(2) else {
                    return "Usage: /runtime set <copilot|opencode|claude|gemini|codex>"
                        .to_string();
                };
                match raw.parse::<mux_core::RuntimeKind>() {
                    Ok(kind) => {
                        let mut record = self.sessions.load(external_id);
                        record.runtime = kind;
                        // Re-default the model unless the new runtime
                        // resolves the current id to something of its own.
                        record.model = match resolve_model(kind, &record.model) {
                            Ok(id) => id.to_string(),
                            Err(_) => default_model(kind).to_string(),
                        };
                        record.touch();
                        match self.sessions.save(&record) {
                            Ok(()) => format!(
                                "Switched runtime to **{kind}**. Model set to `{}`.",
                                record.model
                            ),
                            Err(err) => format!("Error: could not persist runtime switch: {err}"),
                        }
                    }
                    Err(_) => RuntimeError::UnknownRuntime { value: raw.clone() }.to_string(),
                }
            }
            other => format!("Unknown runtime action '{other}'. Usage: /runtime <list|set|current>"),
        }
    }

    fn model_command(&self, external_id: &ExternalId, tokens: &[String]) -> String {
        let record = self.sessions.load(external_id);
        let action = tokens
            .get(1)
            .map(|token| token.to_lowercase())
            .unwrap_or_else(|| "list".to_string());

        match action.as_str() {
            "list" => {
                let mut out = format!("**Available Models ({})**\n\n", record.runtime);
                for entry in model_catalog(record.runtime) {
                    out.push_str(&format!("- `{}` - {}\n", entry.id, entry.label));
                }
                out.trim_end().to_string()
            }
            "current" => format!(
                "Current Model: `{}` ({})",
                record.model, record.runtime
            ),
            "set" => {
                let Some(requested) = tokens.get(2) else {
                    return "Usage: /model set \"<model>\"".to_string();
                };
                match resolve_model(record.runtime, requested) {
                    Ok(id) => {
                        let mut record = record;
                        record.model = id.to_string();
                        record.touch();
                        match self.sessions.save(&record) {
                            Ok(()) => format!("Switched to model `{id}`"),
                            Err(err) => format!("Error: could not persist model switch: {err}"),
                        }
                    }
                    Err(_) => {
                        let catalog = model_catalog(record.runtime)
                            .iter()
                            .map(|entry| format!("`{}`", entry.id))
                            .collect::<Vec<_>>()
                            .join(", ");
                        format!(
                            "Unknown model '{requested}' for runtime {}. Available: {catalog}",
                            record.runtime
                        )
                    }
                }
            }
            other => format!("Unknown model action '{other}'. Usage: /model <list|set|current>"),
        }
    }

    fn agent_command(
        &self,
        external_id: &ExternalId,
        tokens: &[String],
        executor: &dyn QueryExecutor,
    ) -> String {
        let Some(action) = tokens.get(1) else {
            return "Usage: /agent <list|set|current|invoke>".to_string();
        };

        match action.to_lowercase().as_str() {
            "list" => {
                if self.roster.is_empty() {
                    return "No agents configured.".to_string();
                }
                let mut out = String::from("# Available Agents\n\n");
                for agent in self.roster.iter() {
                    out.push_str(&format!(
                        "### {}\n{}\n\n**Location:** `{}`\n\n",
                        agent.name,
                        agent.description,
                        agent.path.display()
                    ));
                }
                out.trim_end().to_string()
            }
            "current" => {
                let record = self.sessions.load(external_id);
                match self.roster.get(&record.agent) {
                    Some(agent) => {
                        format!("Current Agent: **{}**\n{}", agent.name, agent.description)
                    }
                    None => format!(
                        "Current Agent: **{}** (not present in the agents config)",
                        record.agent
                    ),
                }
            }
            "set" => {
                let Some(name) = tokens.get(2) else {
                    return "Usage: /agent set \"<agent>\"".to_string();
                };
                let Some(agent) = self.roster.get(name) else {
                    return self.unknown_agent(name);
                };

                let mut record = self.sessions.load(external_id);
                record.agent = agent.name.clone();
                // A new agent means a new backend session.
                record.backend_session_id = None;
                record.touch();
                match self.sessions.save(&record) {
                    Ok(()) => format!(
                        "Switched to **{}** agent. Backend session reset.\n\n{}\n\nLocation: `{}`",
                        agent.name,
                        agent.description,
                        agent.path.display()
                    ),
                    Err(err) => format!("Error: could not persist agent switch: {err}"),
                }
            }
            "invoke" => {
                let Some(name) = tokens.get(2) else {
                    return "Usage: /agent invoke <agent_name> <prompt>".to_string();
                };
                let prompt = tokens[3..].join(" ");
                if prompt.trim().is_empty() {
                    return "Usage: /agent invoke <agent_name> <prompt>".to_string();
                }
                let Some(agent) = self.roster.get(name) else {
                    return self.unknown_agent(name);
                };

                let record = self.sessions.load(external_id);
                log::info!("invoking agent '{}' one-off", agent.name);
                executor.execute_detached(&record, agent, &prompt)
            }
            other => {
                format!("Unknown agent action '{other}'. Usage: /agent <list|set|current|invoke>")
            }
        }
    }

    fn session_command(&self, external_id: &ExternalId, tokens: &[String]) -> String {
        match tokens.get(1).map(|token| token.to_lowercase()).as_deref() {
            Some("reset") => match self.sessions.reset_backend_id(external_id) {
                Ok(_) => "Session reset. Next message starts fresh.".to_string(),
                Err(err) => format!("Error: could not reset session: {err}"),
            },
            _ => "Usage: /session reset".to_string(),
        }
    }

    fn cancel_command(&self, external_id: &ExternalId) -> String {
        match self.tracker.cancel(external_id) {
            Ok(CancelOutcome::Cancelled(query)) => format!(
                "Cancelled running query (runtime {}, pid {}).",
                query.runtime, query.pid
            ),
            Ok(CancelOutcome::NothingToCancel) => {
                "No running query to cancel for this session.".to_string()
            }
            Err(err) => format!("Error: could not update tracking state: {err}"),
        }
    }

    fn unknown_agent(&self, name: &str) -> String {
        if self.roster.is_empty() {
            format!("Unknown agent: '{name}'. No agents configured.")
        } else {
            format!(
                "Unknown agent: '{name}'. Available agents: {}",
                self.roster.names().join(", ")
            )
        }
    }
}

/// Renders the preamble-wrapped prompt for an agent context. Kept beside the
/// dispatcher so `/agent invoke` and the main prompt path share it.
pub fn contextual_prompt(agent: &AgentDescriptor, external_id: &ExternalId, prompt: &str) -> String {
    build_context_preamble(agent, external_id.as_ref(), prompt)
}
