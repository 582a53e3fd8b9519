//! One adapter per runtime. The adapter owns everything runtime-specific
//! about an invocation: binary location, argv shape, and the resume flag
//! convention. Adding a runtime is one struct plus one `adapter_for` arm.

use mux_core::RuntimeKind;

use crate::types::{LaunchRequest, RuntimeCommand};

pub trait RuntimeAdapter: Send + Sync {
    fn kind(&self) -> RuntimeKind;

    /// Renders the subprocess argv for a request. Resume semantics are the
    /// adapter's business; callers only set `request.resume`.
    fn build_command(&self, request: &LaunchRequest) -> RuntimeCommand;

    /// Whether a brand-new session can be pinned to a caller-chosen id. When
    /// true the supervisor passes a synthesized id instead of probing the
    /// runtime's storage after the fact.
    fn accepts_assigned_session_id(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopilotAdapter {
    pub executable: String,
}

impl Default for CopilotAdapter {
    fn default() -> Self {
        Self {
            executable: "/usr/bin/copilot".to_string(),
        }
    }
}

impl RuntimeAdapter for CopilotAdapter {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Copilot
    }

    fn build_command(&self, request: &LaunchRequest) -> RuntimeCommand {
        let mut command = RuntimeCommand::new(self.executable.clone())
            .arg("-p")
            .arg(request.prompt.clone())
            .arg("--allow-all-tools")
            .arg("--allow-all-paths")
            .arg("--no-color")
            .arg("--silent")
            .arg("--model")
            .arg(request.model.clone());

        if request.resume {
            if let Some(session_id) = &request.backend_session_id {
                command = command.arg("--resume").arg(session_id.clone());
            }
        }
        command
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpencodeAdapter {
    pub executable: String,
}

impl Default for OpencodeAdapter {
    fn default() -> Self {
        let executable = dirs::home_dir()
            .map(|home| home.join(".opencode/bin/opencode"))
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|| "opencode".to_string());
        Self { executable }
    }
}

impl RuntimeAdapter for OpencodeAdapter {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Opencode
    }

    fn build_command(&self, request: &LaunchRequest) -> RuntimeCommand {
        let mut command = RuntimeCommand::new(self.executable.clone())
            .arg("run")
            .arg("--model")
            .arg(request.model.clone());

        if request.resume {
            if let Some(session_id) = &request.backend_session_id {
                command = command.arg("--session").arg(session_id.clone());
            }
        }
        command.arg(request.prompt.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaudeAdapter {
    pub executable: String,
}

impl Default for ClaudeAdapter {
    fn default() -> Self {
        Self {
            executable: "/usr/bin/claude".to_string(),
        }
    }
}

impl RuntimeAdapter for ClaudeAdapter {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Claude
    }

    fn build_command(&self, request: &LaunchRequest) -> RuntimeCommand {
        let mut command = RuntimeCommand::new(self.executable.clone())
            .arg("-p")
            .arg(request.prompt.clone())
            .arg("--permission-mode")
            .arg("dontAsk")
            .arg("--model")
            .arg(request.model.clone());

        match (&request.backend_session_id, request.resume) {
            (Some(session_id), true) => {
                command = command.arg("--resume").arg(session_id.clone());
            }
            (Some(session_id), false) => {
                // New session pinned to the id we will record.
                command = command.arg("--session-id").arg(session_id.clone());
            }
            (None, _) => {}
        }
        command
    }

    fn accepts_assigned_session_id(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiAdapter {
    pub executable: String,
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self {
            executable: "gemini".to_string(),
        }
    }
}

impl RuntimeAdapter for GeminiAdapter {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Gemini
    }

    fn build_command(&self, request: &LaunchRequest) -> RuntimeCommand {
        // The gemini CLI mishandles --model with several published names, so
        // the invocation relies on the CLI's own default model.
        let mut command = RuntimeCommand::new(self.executable.clone())
            .arg("--yolo")
            .arg(request.prompt.clone());

        if request.resume {
            if let Some(session_id) = &request.backend_session_id {
                command = command.arg("--resume").arg(session_id.clone());
            }
        }
        command
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodexAdapter {
    pub executable: String,
}

impl Default for CodexAdapter {
    fn default() -> Self {
        Self {
            executable: "codex".to_string(),
        }
    }
}

impl RuntimeAdapter for CodexAdapter {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Codex
    }

    fn build_command(&self, request: &LaunchRequest) -> RuntimeCommand {
        match (&request.backend_session_id, request.resume) {
            (Some(session_id), true) => RuntimeCommand::new(self.executable.clone())
                .arg("exec")
                .arg("resume")
                .arg(session_id.clone())
                .arg(request.prompt.clone()),
            _ => RuntimeCommand::new(self.executable.clone())
                .arg("exec")
                .arg(request.prompt.clone())
                .arg("--dangerously-bypass-approvals-and-sandbox"),
        }
    }
}

pub fn adapter_for(runtime: RuntimeKind) -> Box<dyn RuntimeAdapter> {
    match runtime {
        RuntimeKind::Copilot => Box::new(CopilotAdapter::default()),
        RuntimeKind::Opencode => Box::new(OpencodeAdapter::default()),
        RuntimeKind::Claude => Box::new(ClaudeAdapter::default()),
        RuntimeKind::Gemini => Box::new(GeminiAdapter::default()),
        RuntimeKind::Codex => Box::new(CodexAdapter::default()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use mux_core::RuntimeKind;

    use super::*;
    use crate::types::LaunchRequest;

    fn mk_request(runtime: RuntimeKind) -> LaunchRequest {
        LaunchRequest {
            runtime,
            model: "test-model".to_string(),
            prompt: "do work".to_string(),
            backend_session_id: None,
            resume: false,
            working_dir: PathBuf::from("/tmp/agent"),
        }
    }

    #[test]
    fn adapter_for_covers_every_runtime() {
        for runtime in mux_core::ALL_RUNTIMES {
            assert_eq!(adapter_for(runtime).kind(), runtime);
        }
    }

    #[test]
    fn copilot_command_includes_permission_and_model_flags() {
        let command = CopilotAdapter::default().build_command(&mk_request(RuntimeKind::Copilot));
        assert_eq!(command.executable, "/usr/bin/copilot");
        assert_eq!(command.args[0], "-p");
        assert_eq!(command.args[1], "do work");
        assert!(command.args.contains(&"--allow-all-tools".to_string()));
        assert!(command.args.contains(&"--no-color".to_string()));
        let model_pos = command
            .args
            .iter()
            .position(|arg| arg == "--model")
            .expect("model flag");
        assert_eq!(command.args[model_pos + 1], "test-model");
        assert!(!command.args.contains(&"--resume".to_string()));
    }

    #[test]
    fn copilot_resume_appends_resume_flag() {
        let mut request = mk_request(RuntimeKind::Copilot);
        request.backend_session_id = Some("sess-1".to_string());
        request.resume = true;

        let command = CopilotAdapter::default().build_command(&request);
        let resume_pos = command
            .args
            .iter()
            .position(|arg| arg == "--resume")
            .expect("resume flag");
        assert_eq!(command.args[resume_pos + 1], "sess-1");
    }

    #[test]
    fn opencode_prompt_is_the_final_argument() {
        let mut request = mk_request(RuntimeKind::Opencode);
        request.backend_session_id = Some("ses_9".to_string());
        request.resume = true;

        let command = OpencodeAdapter::default().build_command(&request);
        assert_eq!(command.args[0], "run");
        let session_pos = command
            .args
            .iter()
            .position(|arg| arg == "--session")
            .expect("session flag");
        assert_eq!(command.args[session_pos + 1], "ses_9");
        assert_eq!(command.args.last(), Some(&"do work".to_string()));
    }

    #[test]
    fn claude_pins_new_sessions_and_resumes_old_ones() {
        let adapter = ClaudeAdapter::default();
        assert!(adapter.accepts_assigned_session_id());

        let mut request = mk_request(RuntimeKind::Claude);
        request.backend_session_id = Some("id-1".to_string());

        let fresh = adapter.build_command(&request);
        assert!(fresh.args.contains(&"--session-id".to_string()));
        assert!(!fresh.args.contains(&"--resume".to_string()));

        request.resume = true;
        let resumed = adapter.build_command(&request);
        assert!(resumed.args.contains(&"--resume".to_string()));
        assert!(!resumed.args.contains(&"--session-id".to_string()));
    }

    #[test]
    fn gemini_command_never_passes_a_model_flag() {
        let command = GeminiAdapter::default().build_command(&mk_request(RuntimeKind::Gemini));
        assert_eq!(command.args, vec!["--yolo".to_string(), "do work".to_string()]);
    }

    #[test]
    fn codex_resume_switches_to_the_resume_subcommand() {
        let adapter = CodexAdapter::default();

        let fresh = adapter.build_command(&mk_request(RuntimeKind::Codex));
        assert_eq!(fresh.args[0], "exec");
        assert_eq!(fresh.args[1], "do work");
        assert!(fresh
            .args
            .contains(&"--dangerously-bypass-approvals-and-sandbox".to_string()));

        let mut request = mk_request(RuntimeKind::Codex);
        request.backend_session_id = Some("rollout-1".to_string());
        request.resume = true;
        let resumed = adapter.build_command(&request);
        assert_eq!(
            resumed.args,
            vec![
                "exec".to_string(),
                "resume".to_string(),
                "rollout-1".to_string(),
                "do work".to_string(),
            ]
        );
    }
}
