//! Environment-derived defaults, resolved once at process start and passed
//! explicitly into the components that need them.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::types::RuntimeKind;

pub const DEFAULT_AGENT_VAR: &str = "PROMPTMUX_DEFAULT_AGENT";
pub const DEFAULT_MODEL_VAR: &str = "PROMPTMUX_DEFAULT_MODEL";
pub const DEFAULT_RUNTIME_VAR: &str = "PROMPTMUX_DEFAULT_RUNTIME";
pub const AGENTS_CONFIG_VAR: &str = "PROMPTMUX_AGENTS_CONFIG";

const FALLBACK_AGENT: &str = "orchestrator";
const FALLBACK_MODEL: &str = "gpt-5-mini";
const FALLBACK_RUNTIME: RuntimeKind = RuntimeKind::Copilot;

/// Defaults applied to newly created session records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub runtime: RuntimeKind,
    pub model: String,
    pub agent: String,
    /// Agents config path override from the environment, if any.
    pub agents_config_override: Option<PathBuf>,
}

impl Defaults {
    /// Reads the environment. An unparseable runtime value falls back to
    /// copilot with a warning rather than failing the invocation.
    pub fn from_env() -> Self {
        let runtime = match env::var(DEFAULT_RUNTIME_VAR) {
            Ok(raw) => match RuntimeKind::from_str(&raw) {
                Ok(kind) => kind,
                Err(err) => {
                    log::warn!("{DEFAULT_RUNTIME_VAR}: {err}; using {FALLBACK_RUNTIME}");
                    FALLBACK_RUNTIME
                }
            },
            Err(_) => FALLBACK_RUNTIME,
        };

        Self {
            runtime,
            model: non_empty_var(DEFAULT_MODEL_VAR).unwrap_or_else(|| FALLBACK_MODEL.to_string()),
            agent: non_empty_var(DEFAULT_AGENT_VAR).unwrap_or_else(|| FALLBACK_AGENT.to_string()),
            agents_config_override: non_empty_var(AGENTS_CONFIG_VAR).map(PathBuf::from),
        }
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            runtime: FALLBACK_RUNTIME,
            model: FALLBACK_MODEL.to_string(),
            agent: FALLBACK_AGENT.to_string(),
            agents_config_override: None,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
