use mux_core::RuntimeKind;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("unknown runtime '{value}'. valid runtimes: copilot, opencode, claude, gemini, codex")]
    UnknownRuntime { value: String },
    #[error("no model matching '{requested}' for runtime {runtime}")]
    UnresolvedModel {
        runtime: RuntimeKind,
        requested: String,
    },
    #[error("failed to launch {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },
    #[error("runtime subprocess error: {message}")]
    Subprocess { message: String },
}

#[cfg(test)]
mod tests {
    use super::RuntimeError;
    use mux_core::RuntimeKind;

    #[test]
    fn unknown_runtime_error_lists_valid_runtimes() {
        let err = RuntimeError::UnknownRuntime {
            value: "cursor".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("cursor"));
        assert!(text.contains("copilot"));
        assert!(text.contains("codex"));
    }

    #[test]
    fn unresolved_model_error_names_runtime_and_request() {
        let err = RuntimeError::UnresolvedModel {
            runtime: RuntimeKind::Gemini,
            requested: "flash-9".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "no model matching 'flash-9' for runtime gemini"
        );
    }

    #[test]
    fn spawn_error_names_executable() {
        let err = RuntimeError::Spawn {
            executable: "/usr/bin/claude".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("/usr/bin/claude"));
    }
}
