//! Static model catalogs and the fuzzy name-to-canonical-id resolver.
//!
//! Catalogs are immutable data resolved at process start. The claude catalog
//! uses the CLI's own aliases (sonnet, haiku, opus) as canonical ids so the
//! CLI resolves them to the latest versions itself.

use std::cmp::Ordering;

use mux_core::RuntimeKind;

use crate::error::RuntimeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelEntry {
    pub id: &'static str,
    pub label: &'static str,
    pub aliases: &'static [&'static str],
}

const COPILOT_MODELS: &[ModelEntry] = &[
    ModelEntry {
        id: "gpt-5.2",
        label: "GPT-5.2",
        aliases: &["5.2"],
    },
    ModelEntry {
        id: "gpt-5.1",
        label: "GPT-5.1",
        aliases: &["5.1"],
    },
    ModelEntry {
        id: "gpt-5",
        label: "GPT-5",
        aliases: &[],
    },
    ModelEntry {
        id: "gpt-5-mini",
        label: "GPT-5 Mini",
        aliases: &["mini"],
    },
    ModelEntry {
        id: "claude-sonnet-4.5",
        label: "Claude Sonnet 4.5",
        aliases: &["sonnet-4.5"],
    },
    ModelEntry {
        id: "claude-haiku-4.5",
        label: "Claude Haiku 4.5",
        aliases: &["haiku-4.5"],
    },
];

const OPENCODE_MODELS: &[ModelEntry] = &[
    ModelEntry {
        id: "opencode/gpt-5-nano",
        label: "GPT-5 Nano",
        aliases: &["gpt-5-nano", "nano"],
    },
    ModelEntry {
        id: "opencode/gpt-5",
        label: "GPT-5",
        aliases: &[],
    },
    ModelEntry {
        id: "opencode/grok-code",
        label: "Grok Code",
        aliases: &["grok"],
    },
    ModelEntry {
        id: "anthropic/claude-sonnet-4.5",
        label: "Claude Sonnet 4.5",
        aliases: &["claude-sonnet"],
    },
    ModelEntry {
        id: "openai/gpt-5-codex",
        label: "GPT-5 Codex",
        aliases: &[],
    },
];

const CLAUDE_MODELS: &[ModelEntry] = &[
    ModelEntry {
        id: "sonnet",
        label: "Claude Sonnet (Latest)",
        aliases: &["claude-sonnet", "claude-sonnet-4.5", "sonnet-4.5"],
    },
    ModelEntry {
        id: "haiku",
        label: "Claude Haiku (Latest)",
        aliases: &["claude-haiku", "claude-haiku-4.5", "haiku-4.5"],
    },
    ModelEntry {
        id: "opus",
        label: "Claude Opus (Latest)",
        aliases: &["claude-opus", "claude-opus-4.5", "opus-4.5"],
    },
];

const GEMINI_MODELS: &[ModelEntry] = &[
    ModelEntry {
        id: "gemini-2.0-flash-exp",
        label: "Gemini 2.0 Flash (Experimental)",
        aliases: &["gemini-2.0-flash", "flash-2.0"],
    },
    ModelEntry {
        id: "gemini-1.5-pro",
        label: "Gemini 1.5 Pro",
        aliases: &["gemini-pro-1.5", "pro-1.5"],
    },
    ModelEntry {
        id: "gemini-1.5-flash",
        label: "Gemini 1.5 Flash",
        aliases: &["gemini-flash-1.5", "flash-1.5"],
    },
    ModelEntry {
        id: "gemini-pro",
        label: "Gemini Pro",
        aliases: &["gemini-1.0-pro"],
    },
];

const CODEX_MODELS: &[ModelEntry] = &[
    ModelEntry {
        id: "gpt-5.1-codex-max",
        label: "GPT-5.1 Codex Max",
        aliases: &["gpt-5.1", "codex-max"],
    },
    ModelEntry {
        id: "gpt-5-codex",
        label: "GPT-5 Codex",
        aliases: &["gpt-5", "codex"],
    },
    ModelEntry {
        id: "gpt-4-turbo",
        label: "GPT-4 Turbo",
        aliases: &["gpt-4-turbo-preview", "gpt-4"],
    },
];

pub fn model_catalog(runtime: RuntimeKind) -> &'static [ModelEntry] {
    match runtime {
        RuntimeKind::Copilot => COPILOT_MODELS,
        RuntimeKind::Opencode => OPENCODE_MODELS,
        RuntimeKind::Claude => CLAUDE_MODELS,
        RuntimeKind::Gemini => GEMINI_MODELS,
        RuntimeKind::Codex => CODEX_MODELS,
    }
}

pub fn default_model(runtime: RuntimeKind) -> &'static str {
    match runtime {
        RuntimeKind::Copilot => "gpt-5-mini",
        RuntimeKind::Opencode => "opencode/gpt-5-nano",
        RuntimeKind::Claude => "haiku",
        RuntimeKind::Gemini => "gemini-1.5-flash",
        RuntimeKind::Codex => "gpt-5.1-codex-max",
    }
}

/// Resolves a requested model name or alias to a canonical id.
///
/// Priority: exact case-insensitive match on a canonical id or alias, then a
/// case-insensitive substring match on canonical ids where the
/// version-greatest candidate wins (see [`version_cmp`]).
pub fn resolve_model(runtime: RuntimeKind, requested: &str) -> Result<&'static str, RuntimeError> {
    let wanted = requested.trim().trim_matches(['"', '\'']).to_lowercase();
    if wanted.is_empty() {
        return Err(RuntimeError::UnresolvedModel {
            runtime,
            requested: requested.to_string(),
        });
    }

    let catalog = model_catalog(runtime);

    for entry in catalog {
        if entry.id.to_lowercase() == wanted
            || entry.aliases.iter().any(|alias| alias.to_lowercase() == wanted)
        {
            return Ok(entry.id);
        }
    }

    catalog
        .iter()
        .filter(|entry| entry.id.to_lowercase().contains(&wanted))
        .max_by(|a, b| version_cmp(a.id, b.id))
        .map(|entry| entry.id)
        .ok_or_else(|| RuntimeError::UnresolvedModel {
            runtime,
            requested: requested.to_string(),
        })
}

/// Version-aware ordering over canonical ids: ids are split into alternating
/// digit / non-digit segments, digit segments compare numerically, and a
/// digit segment outranks a text segment at the same position. The greatest
/// id under this order is the "latest" candidate.
pub fn version_cmp(a: &str, b: &str) -> Ordering {
    let left = segments(a);
    let right = segments(b);

    for (l, r) in left.iter().zip(right.iter()) {
        let ord = match (l, r) {
            (Segment::Number(l), Segment::Number(r)) => l.cmp(r),
            (Segment::Text(l), Segment::Text(r)) => l.cmp(r),
            (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
            (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len())
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Number(u64),
    Text(&'a str),
}

fn segments(value: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = value;
    while !rest.is_empty() {
        let digits = rest.chars().take_while(|ch| ch.is_ascii_digit()).count();
        if digits > 0 {
            let (chunk, tail) = rest.split_at(digits);
            out.push(Segment::Number(chunk.parse().unwrap_or(u64::MAX)));
            rest = tail;
        } else {
            let text = rest.chars().take_while(|ch| !ch.is_ascii_digit()).count();
            let split = rest
                .char_indices()
                .nth(text)
                .map(|(idx, _)| idx)
                .unwrap_or(rest.len());
            let (chunk, tail) = rest.split_at(split);
            out.push(Segment::Text(chunk));
            rest = tail;
        }
    }
    out
}
