//! Filesystem layout of the shim's own durable state.
//!
//! The external-id → session map is scoped per runtime family (backend
//! session id formats are historically incompatible between runtimes), while
//! the running-query tracking map is one shared file.

use std::path::PathBuf;

use mux_core::RuntimeKind;

pub const SESSION_MAP_FILE: &str = "promptmux-sessions.json";
pub const TRACKING_FILE: &str = "running-queries.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    copilot_root: PathBuf,
    opencode_root: PathBuf,
    claude_root: PathBuf,
    gemini_root: PathBuf,
    codex_root: PathBuf,
    /// The shim's own directory, holding the shared tracking file.
    shim_root: PathBuf,
}

impl StorageLayout {
    /// Conventional home-relative layout.
    pub fn from_home() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            copilot_root: home.join(".copilot"),
            opencode_root: home.join(".opencode"),
            claude_root: home.join(".claude"),
            gemini_root: home.join(".gemini"),
            codex_root: home.join(".codex"),
            shim_root: home.join(".promptmux"),
        }
    }

    /// Everything under one base directory. Used by tests.
    pub fn under(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            copilot_root: base.join("copilot"),
            opencode_root: base.join("opencode"),
            claude_root: base.join("claude"),
            gemini_root: base.join("gemini"),
            codex_root: base.join("codex"),
            shim_root: base.join("promptmux"),
        }
    }

    pub fn runtime_root(&self, runtime: RuntimeKind) -> &PathBuf {
        match runtime {
            RuntimeKind::Copilot => &self.copilot_root,
            RuntimeKind::Opencode => &self.opencode_root,
            RuntimeKind::Claude => &self.claude_root,
            RuntimeKind::Gemini => &self.gemini_root,
            RuntimeKind::Codex => &self.codex_root,
        }
    }

    pub fn session_map_path(&self, runtime: RuntimeKind) -> PathBuf {
        self.runtime_root(runtime).join(SESSION_MAP_FILE)
    }

    pub fn tracking_path(&self) -> PathBuf {
        self.shim_root.join(TRACKING_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_maps_are_scoped_per_runtime_root() {
        let layout = StorageLayout::under("/base");
        assert_eq!(
            layout.session_map_path(RuntimeKind::Copilot),
            PathBuf::from("/base/copilot/promptmux-sessions.json")
        );
        assert_eq!(
            layout.session_map_path(RuntimeKind::Codex),
            PathBuf::from("/base/codex/promptmux-sessions.json")
        );
    }

    #[test]
    fn tracking_file_is_shared_under_the_shim_root() {
        let layout = StorageLayout::under("/base");
        assert_eq!(
            layout.tracking_path(),
            PathBuf::from("/base/promptmux/running-queries.json")
        );
    }
}
