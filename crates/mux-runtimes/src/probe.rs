//! Probing of each runtime's own session storage.
//!
//! The invoked CLIs keep their conversation history in per-runtime file
//! trees. This module only checks whether a backend session id still exists
//! (resume is pointless otherwise) and recovers the id a CLI auto-generated
//! on a first run by finding the newest session file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use mux_core::RuntimeKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProbe {
    runtime: RuntimeKind,
    root: PathBuf,
}

impl SessionProbe {
    /// Probe rooted at the runtime's conventional storage location.
    pub fn for_runtime(runtime: RuntimeKind) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let root = match runtime {
            RuntimeKind::Copilot => home.join(".copilot/session-state"),
            RuntimeKind::Opencode => home.join(".local/share/opencode/storage/session/global"),
            RuntimeKind::Claude => home.join(".claude/debug"),
            RuntimeKind::Gemini => home.join(".gemini/sessions"),
            RuntimeKind::Codex => home.join(".codex/sessions"),
        };
        Self { runtime, root }
    }

    /// Probe with an explicit root. Used by tests and anything that relocates
    /// runtime storage.
    pub fn with_root(runtime: RuntimeKind, root: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            root: root.into(),
        }
    }

    pub fn runtime(&self) -> RuntimeKind {
        self.runtime
    }

    /// Whether the runtime still has state for `session_id`.
    pub fn session_exists(&self, session_id: &str) -> bool {
        match self.runtime {
            RuntimeKind::Copilot => self.root.join(format!("{session_id}.jsonl")).exists(),
            RuntimeKind::Opencode => self.root.join(format!("{session_id}.json")).exists(),
            RuntimeKind::Claude => self.root.join(format!("{session_id}.txt")).exists(),
            RuntimeKind::Gemini => self.root.join(format!("{session_id}.json")).exists(),
            RuntimeKind::Codex => rollout_files(&self.root)
                .iter()
                .any(|(path, _)| file_name_contains(path, session_id)),
        }
    }

    /// The most recently written session id, if any. Used to map a backend
    /// session the runtime created on its own.
    pub fn latest_session_id(&self) -> Option<String> {
        match self.runtime {
            RuntimeKind::Copilot => newest_stem(&self.root, "jsonl"),
            RuntimeKind::Opencode => newest_stem(&self.root, "json"),
            RuntimeKind::Claude => newest_stem(&self.root, "txt"),
            RuntimeKind::Gemini => newest_stem(&self.root, "json"),
            RuntimeKind::Codex => {
                let mut files = rollout_files(&self.root);
                files.sort_by_key(|(_, mtime)| *mtime);
                files
                    .last()
                    .and_then(|(path, _)| rollout_session_id(path))
            }
        }
    }
}

fn newest_stem(dir: &Path, extension: &str) -> Option<String> {
    let entries = fs::read_dir(dir).ok()?;

    let mut newest: Option<(SystemTime, String)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let mtime = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if newest.as_ref().map(|(at, _)| mtime > *at).unwrap_or(true) {
            newest = Some((mtime, stem.to_string()));
        }
    }
    newest.map(|(_, stem)| stem)
}

/// Collects `rollout-*.jsonl` files from the date-nested codex layout
/// (`YYYY/MM/DD/rollout-<timestamp>-<session id>.jsonl`).
fn rollout_files(root: &Path) -> Vec<(PathBuf, SystemTime)> {
    let mut out = Vec::new();
    visit_rollouts(root, 0, &mut out);
    out
}

fn visit_rollouts(dir: &Path, depth: usize, out: &mut Vec<(PathBuf, SystemTime)>) {
    if depth > 3 {
        return;
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            visit_rollouts(&path, depth + 1, out);
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if name.starts_with("rollout-") && name.ends_with(".jsonl") {
            let mtime = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            out.push((path, mtime));
        }
    }
}

fn file_name_contains(path: &Path, needle: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.contains(needle))
        .unwrap_or(false)
}

/// Extracts the session id from a rollout filename of the form
/// `rollout-YYYY-MM-DDTHH-MM-SS-<session id>.jsonl`.
fn rollout_session_id(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_prefix("rollout-")?.strip_suffix(".jsonl")?;
    // The timestamp occupies a fixed 19 characters plus the separating dash.
    if stem.len() <= 20 {
        return None;
    }
    Some(stem[20..].to_string())
}
