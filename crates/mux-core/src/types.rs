//! Core types for the prompt-multiplexing shim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest prompt excerpt kept in a tracking record.
pub const PROMPT_EXCERPT_MAX: usize = 120;
/// Longest output tail kept in a tracking record (most-recent-wins).
pub const OUTPUT_TAIL_MAX: usize = 2000;

/// Caller-supplied conversation identifier. Stable key for all persisted
/// state; opaque to this system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalId(pub String);

impl ExternalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExternalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The external AI CLI back-ends this shim can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    Copilot,
    Opencode,
    Claude,
    Gemini,
    Codex,
}

/// Registry order. Also the lookup order for per-runtime session map files.
pub const ALL_RUNTIMES: [RuntimeKind; 5] = [
    RuntimeKind::Copilot,
    RuntimeKind::Opencode,
    RuntimeKind::Claude,
    RuntimeKind::Gemini,
    RuntimeKind::Codex,
];

impl RuntimeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeKind::Copilot => "copilot",
            RuntimeKind::Opencode => "opencode",
            RuntimeKind::Claude => "claude",
            RuntimeKind::Gemini => "gemini",
            RuntimeKind::Codex => "codex",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RuntimeKind::Copilot => "GitHub Copilot CLI",
            RuntimeKind::Opencode => "OpenCode CLI",
            RuntimeKind::Claude => "Claude Code CLI",
            RuntimeKind::Gemini => "Google Gemini CLI",
            RuntimeKind::Codex => "Codex CLI",
        }
    }
}

impl std::str::FromStr for RuntimeKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "copilot" => Ok(RuntimeKind::Copilot),
            "opencode" => Ok(RuntimeKind::Opencode),
            "claude" => Ok(RuntimeKind::Claude),
            "gemini" => Ok(RuntimeKind::Gemini),
            "codex" => Ok(RuntimeKind::Codex),
            other => Err(format!(
                "unknown runtime '{other}'. valid values: copilot, opencode, claude, gemini, codex"
            )),
        }
    }
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable per-conversation state. One record per external id, rewritten in
/// full on every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub external_id: ExternalId,
    /// Absent until the first successful runtime call; absence means
    /// "start fresh" on the next call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_session_id: Option<String>,
    pub runtime: RuntimeKind,
    pub model: String,
    pub agent: String,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Clears only the backend session id; runtime/model/agent survive.
    pub fn reset_backend_session(&mut self) {
        self.backend_session_id = None;
        self.touch();
    }
}

/// Tracking entry for a currently in-flight subprocess, kept in the shared
/// running-query file so a concurrent invocation can report status or cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningQuery {
    pub external_id: ExternalId,
    pub pid: u32,
    pub runtime: RuntimeKind,
    pub agent: String,
    pub prompt_excerpt: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub output_tail: String,
}

impl RunningQuery {
    pub fn new(
        external_id: ExternalId,
        pid: u32,
        runtime: RuntimeKind,
        agent: impl Into<String>,
        prompt: &str,
    ) -> Self {
        Self {
            external_id,
            pid,
            runtime,
            agent: agent.into(),
            prompt_excerpt: prompt_excerpt(prompt),
            started_at: Utc::now(),
            output_tail: String::new(),
        }
    }

    /// Appends streamed output, keeping only the most recent
    /// [`OUTPUT_TAIL_MAX`] characters.
    pub fn push_output(&mut self, chunk: &str) {
        self.output_tail.push_str(chunk);
        self.output_tail = truncate_tail(&self.output_tail, OUTPUT_TAIL_MAX);
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }
}

/// First [`PROMPT_EXCERPT_MAX`] characters of the prompt, on char boundaries.
pub fn prompt_excerpt(prompt: &str) -> String {
    let trimmed = prompt.trim();
    if trimmed.chars().count() <= PROMPT_EXCERPT_MAX {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(PROMPT_EXCERPT_MAX).collect();
    out.push_str("...");
    out
}

/// Keeps the last `max` characters of `text`, dropping the oldest.
pub fn truncate_tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    text.chars().skip(count - max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn runtime_kind_round_trips_through_str() {
        for kind in ALL_RUNTIMES {
            assert_eq!(RuntimeKind::from_str(kind.as_str()), Ok(kind));
        }
    }

    #[test]
    fn runtime_kind_parse_is_case_insensitive() {
        assert_eq!(RuntimeKind::from_str("  CLAUDE "), Ok(RuntimeKind::Claude));
        assert_eq!(RuntimeKind::from_str("Codex"), Ok(RuntimeKind::Codex));
    }

    #[test]
    fn runtime_kind_parse_rejects_unknown_and_lists_valid_values() {
        let err = RuntimeKind::from_str("cursor").expect_err("unknown runtime");
        assert!(err.contains("cursor"));
        assert!(err.contains("copilot"));
    }

    #[test]
    fn runtime_kind_serde_uses_snake_case() {
        let json = serde_json::to_string(&RuntimeKind::Opencode).expect("serialize kind");
        assert_eq!(json, "\"opencode\"");
        let kind: RuntimeKind = serde_json::from_str("\"gemini\"").expect("deserialize kind");
        assert_eq!(kind, RuntimeKind::Gemini);
    }

    #[test]
    fn reset_backend_session_keeps_preferences() {
        let mut record = SessionRecord {
            external_id: ExternalId::new("s1"),
            backend_session_id: Some("abc".to_string()),
            runtime: RuntimeKind::Claude,
            model: "haiku".to_string(),
            agent: "devops".to_string(),
            updated_at: Utc::now(),
        };

        record.reset_backend_session();
        assert_eq!(record.backend_session_id, None);
        assert_eq!(record.runtime, RuntimeKind::Claude);
        assert_eq!(record.model, "haiku");
        assert_eq!(record.agent, "devops");
    }

    #[test]
    fn session_record_serde_omits_absent_backend_id() {
        let record = SessionRecord {
            external_id: ExternalId::new("s1"),
            backend_session_id: None,
            runtime: RuntimeKind::Copilot,
            model: "gpt-5-mini".to_string(),
            agent: "orchestrator".to_string(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).expect("serialize record");
        assert!(!json.contains("backend_session_id"));

        let restored: SessionRecord = serde_json::from_str(&json).expect("deserialize record");
        assert_eq!(restored, record);
    }

    #[test]
    fn prompt_excerpt_bounds_long_prompts() {
        let long = "x".repeat(500);
        let excerpt = prompt_excerpt(&long);
        assert_eq!(excerpt.chars().count(), PROMPT_EXCERPT_MAX + 3);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn prompt_excerpt_keeps_short_prompts_intact() {
        assert_eq!(prompt_excerpt("  hello  "), "hello");
    }

    #[test]
    fn push_output_keeps_most_recent_tail() {
        let mut query = RunningQuery::new(
            ExternalId::new("s1"),
            4242,
            RuntimeKind::Codex,
            "devops",
            "do work",
        );
        query.push_output(&"a".repeat(OUTPUT_TAIL_MAX));
        query.push_output("zzz");

        assert_eq!(query.output_tail.chars().count(), OUTPUT_TAIL_MAX);
        assert!(query.output_tail.ends_with("zzz"));
    }

    #[test]
    fn truncate_tail_is_noop_under_limit() {
        assert_eq!(truncate_tail("short", 10), "short");
    }

    #[test]
    fn elapsed_secs_never_goes_negative() {
        let query = RunningQuery::new(
            ExternalId::new("s1"),
            1,
            RuntimeKind::Claude,
            "devops",
            "p",
        );
        let before = query.started_at - chrono::Duration::seconds(5);
        assert_eq!(query.elapsed_secs(before), 0);
    }
}
