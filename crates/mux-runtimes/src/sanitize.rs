//! Output sanitizer: a deterministic, idempotent text transform that strips
//! reasoning tags, ANSI escapes, and per-runtime banner/statistics noise
//! from captured CLI output before it is returned to the caller.

use once_cell::sync::Lazy;
use regex::Regex;

use mux_core::RuntimeKind;

static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think(?:ing)?>.*?</think(?:ing)?>").expect("think block regex"));
static THINK_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think(?:ing)?>.*").expect("think open regex"));
static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("ansi regex"));

/// Cleans `raw` for the given runtime. Applying the transform twice yields
/// the same text as applying it once.
pub fn clean(raw: &str, runtime: RuntimeKind) -> String {
    let text = strip_thinking(raw);
    let text = ANSI_ESCAPE.replace_all(&text, "");

    let lines: Vec<&str> = text.lines().collect();
    let kept = match runtime {
        RuntimeKind::Copilot => filter_copilot(&lines),
        RuntimeKind::Opencode => filter_opencode(&lines),
        RuntimeKind::Claude => lines,
        RuntimeKind::Gemini => filter_gemini(&lines),
        RuntimeKind::Codex => filter_codex(&lines),
    };

    trim_blank_edges(&kept).join("\n")
}

/// Removes `<think>`/`<thinking>` blocks including their contents; an
/// unclosed tag swallows everything to the end of the text.
fn strip_thinking(text: &str) -> String {
    let closed = THINK_BLOCK.replace_all(text, "");
    THINK_OPEN.replace_all(&closed, "").into_owned()
}

/// Copilot prints its usage trailer after the response; everything from the
/// first trailer line onward is metadata.
fn filter_copilot<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let mut kept = Vec::new();
    for line in lines {
        if line.starts_with("Total usage est:") || line.starts_with("Total duration") {
            break;
        }
        kept.push(*line);
    }
    kept
}

const OPENCODE_STATS: &[&str] = &[
    "tokens used:",
    "total cost:",
    "session id:",
    "commands:",
    "positionals:",
    "options:",
];

fn filter_opencode<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let mut kept = Vec::new();
    let mut in_banner = true;
    for line in lines {
        if in_banner {
            let blank_leader = line.trim().is_empty() && kept.is_empty();
            if blank_leader || line.contains('█') || line.contains('▄') || line.contains('▀') {
                continue;
            }
            in_banner = false;
        }

        let lower = line.to_lowercase();
        if OPENCODE_STATS.iter().any(|stat| lower.contains(stat)) {
            continue;
        }
        kept.push(*line);
    }
    kept
}

const GEMINI_NOISE: &[&str] = &[
    "[startup]",
    "recording metric for phase:",
    "loaded cached credentials",
    "session:",
    "model:",
    "tokens:",
    "usage:",
];

fn filter_gemini<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    lines
        .iter()
        .filter(|line| {
            let lower = line.to_lowercase();
            !GEMINI_NOISE.iter().any(|noise| lower.contains(noise))
        })
        .copied()
        .collect()
}

const CODEX_HEADER_MARKERS: &[&str] = &[
    "openai codex",
    "--------",
    "workdir:",
    "model:",
    "provider:",
    "approval:",
    "sandbox:",
    "session id:",
    "mcp startup:",
];

fn filter_codex<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let mut kept: Vec<&str> = Vec::new();
    let mut found_response = false;

    for line in lines {
        let lower = line.to_lowercase();
        let trimmed = lower.trim();

        if CODEX_HEADER_MARKERS.iter().any(|marker| lower.contains(marker)) {
            continue;
        }
        // Section markers are printed on their own line.
        if trimmed == "user" || trimmed == "codex" || trimmed == "thinking" {
            continue;
        }
        if trimmed.starts_with("reasoning") {
            continue;
        }
        // The token accounting footer ends the response.
        if lower.contains("tokens used:") {
            break;
        }
        if line.trim().is_empty() && !found_response {
            continue;
        }
        if !line.trim().is_empty() {
            found_response = true;
        }
        kept.push(*line);
    }
    kept
}

fn trim_blank_edges<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map(|idx| idx + 1)
        .unwrap_or(start);
    lines[start..end].to_vec()
}
