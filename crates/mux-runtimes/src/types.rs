use mux_core::RuntimeKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything an adapter needs to build a subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub runtime: RuntimeKind,
    pub model: String,
    /// Prompt with the agent context preamble already applied.
    pub prompt: String,
    /// Backend session id recorded for this conversation, if any.
    pub backend_session_id: Option<String>,
    /// Whether the backend session should be resumed. Only meaningful when
    /// `backend_session_id` is present.
    pub resume: bool,
    pub working_dir: PathBuf,
}

/// A fully rendered subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeCommand {
    pub executable: String,
    pub args: Vec<String>,
}

impl RuntimeCommand {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }
}

/// Why a tracked subprocess stopped producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Completed,
    Failed,
    Killed,
}

/// Captured result of one subprocess run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub stop_reason: StopReason,
    pub exit_code: Option<i32>,
    /// Combined stdout + stderr, in arrival order.
    pub output: String,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.stop_reason == StopReason::Completed
    }
}
