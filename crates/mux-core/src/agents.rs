//! Agent roster: named working-directory contexts loaded from a JSON config
//! file on every invocation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound on directory entries listed in a context preamble.
pub const PREAMBLE_LISTING_MAX: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum AgentConfigError {
    #[error("failed to read agents config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse agents config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A named working-directory context that scopes where a prompt executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct AgentsFile {
    #[serde(default)]
    agents: Vec<RawAgent>,
}

#[derive(Debug, Deserialize)]
struct RawAgent {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    path: PathBuf,
}

/// Ordered roster of configured agents. Names are unique; later duplicates
/// are dropped with a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentRoster {
    agents: Vec<AgentDescriptor>,
}

impl AgentRoster {
    pub fn from_agents(agents: Vec<AgentDescriptor>) -> Self {
        let mut roster = Self::default();
        for agent in agents {
            roster.insert(agent);
        }
        roster
    }

    fn insert(&mut self, agent: AgentDescriptor) {
        if self.get(&agent.name).is_some() {
            log::warn!("duplicate agent '{}' ignored", agent.name);
            return;
        }
        self.agents.push(agent);
    }

    pub fn get(&self, name: &str) -> Option<&AgentDescriptor> {
        self.agents.iter().find(|agent| agent.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.agents.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.iter().map(|agent| agent.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }
}

/// Loads the roster from `path`. A missing file degrades to an empty roster
/// with a warning; malformed JSON is a hard error the caller reports.
pub fn load_agents(path: &Path) -> Result<AgentRoster, AgentConfigError> {
    let body = match fs::read_to_string(path) {
        Ok(body) => body,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            log::warn!(
                "agents config not found at {}; no agents configured",
                path.display()
            );
            return Ok(AgentRoster::default());
        }
        Err(source) => {
            return Err(AgentConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let file: AgentsFile =
        serde_json::from_str(&body).map_err(|source| AgentConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut roster = AgentRoster::default();
    for raw in file.agents {
        if raw.name.trim().is_empty() {
            log::warn!("agent entry without a name skipped");
            continue;
        }
        roster.insert(AgentDescriptor {
            name: raw.name,
            description: raw.description,
            path: raw.path,
        });
    }
    Ok(roster)
}

/// Builds the context block injected ahead of the user prompt so the invoked
/// model knows which agent workspace it is operating in. Directory listing
/// failures degrade to no listing.
pub fn build_context_preamble(
    agent: &AgentDescriptor,
    external_id: &str,
    prompt: &str,
) -> String {
    let mut preamble = format!(
        "[Session ID: {external_id}]\n[Agent Context: {}]\n{}",
        agent.name, agent.description
    );

    let listing = workspace_listing(&agent.path);
    if !listing.is_empty() {
        preamble.push_str("\n\nAvailable resources in this agent's workspace:");
        for entry in listing {
            preamble.push_str("\n  - ");
            preamble.push_str(&entry);
        }
    }

    preamble.push_str("\n\nUser Request:\n");
    preamble.push_str(prompt);
    preamble
}

fn workspace_listing(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names.truncate(PREAMBLE_LISTING_MAX);
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("agents.json");
        fs::write(&path, body).expect("write agents config");
        path
    }

    #[test]
    fn load_agents_reads_roster_in_file_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_config(
            dir.path(),
            r#"{
  "agents": [
    {"name": "orchestrator", "description": "Coordinates work", "path": "/srv/orchestrator"},
    {"name": "devops", "description": "Infra tasks", "path": "/srv/devops"}
  ]
}"#,
        );

        let roster = load_agents(&path).expect("load roster");
        assert_eq!(roster.names(), vec!["orchestrator", "devops"]);
        let devops = roster.get("devops").expect("devops exists");
        assert_eq!(devops.path, PathBuf::from("/srv/devops"));
    }

    #[test]
    fn load_agents_missing_file_degrades_to_empty_roster() {
        let dir = tempfile::tempdir().expect("temp dir");
        let roster = load_agents(&dir.path().join("missing.json")).expect("load missing");
        assert!(roster.is_empty());
    }

    #[test]
    fn load_agents_rejects_malformed_json() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_config(dir.path(), "{\"agents\": [");
        let err = load_agents(&path).expect_err("malformed config");
        assert!(matches!(err, AgentConfigError::Parse { .. }));
    }

    #[test]
    fn load_agents_skips_nameless_entries_and_duplicates() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_config(
            dir.path(),
            r#"{
  "agents": [
    {"description": "no name", "path": "/srv/nowhere"},
    {"name": "family", "description": "first", "path": "/srv/family"},
    {"name": "family", "description": "second", "path": "/srv/family2"}
  ]
}"#,
        );

        let roster = load_agents(&path).expect("load roster");
        assert_eq!(roster.len(), 1);
        assert_eq!(
            roster.get("family").expect("family exists").description,
            "first"
        );
    }

    #[test]
    fn preamble_includes_identity_and_bounded_listing() {
        let dir = tempfile::tempdir().expect("temp dir");
        for idx in 0..15 {
            fs::write(dir.path().join(format!("file-{idx:02}.txt")), "x").expect("write file");
        }
        let agent = AgentDescriptor {
            name: "devops".to_string(),
            description: "Infra tasks".to_string(),
            path: dir.path().to_path_buf(),
        };

        let preamble = build_context_preamble(&agent, "s1", "check the server");
        assert!(preamble.starts_with("[Session ID: s1]\n[Agent Context: devops]\nInfra tasks"));
        assert!(preamble.contains("file-00.txt"));
        assert!(!preamble.contains("file-10.txt"));
        assert!(preamble.ends_with("User Request:\ncheck the server"));
    }

    #[test]
    fn preamble_degrades_without_workspace_listing() {
        let agent = AgentDescriptor {
            name: "family".to_string(),
            description: "Household knowledge".to_string(),
            path: PathBuf::from("/definitely/not/a/real/dir"),
        };

        let preamble = build_context_preamble(&agent, "s9", "hello");
        assert!(!preamble.contains("Available resources"));
        assert!(preamble.contains("User Request:\nhello"));
    }
}
