//! Per-query orchestration: resume decisions, tracking record lifecycle
//! around the subprocess, incremental tail mirroring for concurrent
//! `/status` calls, output sanitizing, and backend session id bookkeeping.
//!
//! Every failure path renders as a string so the caller can always print the
//! result; a runtime failure never advances the recorded backend session id.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use uuid::Uuid;

use mux_core::{AgentDescriptor, AgentRoster, ExternalId, RunningQuery, RuntimeKind, SessionRecord};
use mux_runtimes::{
    adapter_for, clean, LaunchRequest, QueryRunner, RuntimeAdapter, SessionProbe, StopReason,
};

use crate::dispatcher::{contextual_prompt, QueryExecutor};
use crate::session_store::SessionStore;
use crate::tracking::RunningQueryStore;

/// How often the streamed output tail is mirrored into the tracking file.
const TAIL_FLUSH_INTERVAL: Duration = Duration::from_millis(500);

const OPENCODE_LOST_SESSION_MARKERS: [&str; 2] = ["NotFoundError", "Resource not found"];

pub struct Supervisor<'a> {
    roster: &'a AgentRoster,
    sessions: &'a SessionStore,
    tracker: &'a RunningQueryStore,
    runner: QueryRunner,
    adapters: fn(RuntimeKind) -> Box<dyn RuntimeAdapter>,
    /// When set, runtime session storage is probed under this base instead
    /// of the conventional home-relative roots.
    probe_base: Option<PathBuf>,
}

impl<'a> Supervisor<'a> {
    pub fn new(
        roster: &'a AgentRoster,
        sessions: &'a SessionStore,
        tracker: &'a RunningQueryStore,
    ) -> Self {
        Self {
            roster,
            sessions,
            tracker,
            runner: QueryRunner::default(),
            adapters: adapter_for,
            probe_base: None,
        }
    }

    pub fn with_adapters(mut self, adapters: fn(RuntimeKind) -> Box<dyn RuntimeAdapter>) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn with_probe_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.probe_base = Some(base.into());
        self
    }

    /// Runs a forwarded prompt for the session's current runtime/model/agent
    /// and persists the backend session id learned from a first run.
    pub fn run_prompt(&self, external_id: &ExternalId, prompt: &str) -> String {
        let mut record = self.sessions.load(external_id);
        let Some(agent) = self.roster.get(&record.agent).cloned() else {
            return self.missing_agent_text(&record.agent);
        };

        let adapter = (self.adapters)(record.runtime);
        let probe = self.probe(record.runtime);

        let mut backend = record.backend_session_id.clone();
        let mut resume = match &backend {
            Some(id) => probe.session_exists(id),
            None => false,
        };
        let first_run = record.backend_session_id.is_none();
        if first_run && adapter.accepts_assigned_session_id() {
            backend = Some(Uuid::new_v4().to_string());
        }

        let mut run = self.execute(
            external_id,
            &record,
            &agent,
            adapter.as_ref(),
            backend.clone(),
            resume,
            prompt,
        );

        // A resumed opencode session can be lost on the backend side; retry
        // once from scratch and adopt the replacement session.
        if record.runtime == RuntimeKind::Opencode
            && resume
            && OPENCODE_LOST_SESSION_MARKERS
                .iter()
                .any(|marker| run.raw_output.contains(marker))
        {
            log::warn!(
                "opencode session {:?} lost; starting a new backend session",
                backend
            );
            backend = None;
            resume = false;
            run = self.execute(
                external_id,
                &record,
                &agent,
                adapter.as_ref(),
                None,
                false,
                prompt,
            );
        }

        if run.completed && !resume {
            let discovered = if adapter.accepts_assigned_session_id() {
                backend.clone()
            } else {
                probe.latest_session_id()
            };
            // Synthesized when the runtime reported nothing we can find.
            let next = discovered.unwrap_or_else(|| Uuid::new_v4().to_string());
            record.backend_session_id = Some(next);
            record.touch();
            if let Err(err) = self.sessions.save(&record) {
                log::warn!("could not persist backend session id: {err}");
            }
        }

        run.text
    }

    fn probe(&self, runtime: RuntimeKind) -> SessionProbe {
        match &self.probe_base {
            Some(base) => SessionProbe::with_root(runtime, base.join(runtime.as_str())),
            None => SessionProbe::for_runtime(runtime),
        }
    }

    fn missing_agent_text(&self, name: &str) -> String {
        if self.roster.is_empty() {
            format!(
                "Error: agent '{name}' is not configured and no agents are available. \
                 Add agents to the agents config file."
            )
        } else {
            format!(
                "Error: agent '{name}' is not configured. Available agents: {}",
                self.roster.names().join(", ")
            )
        }
    }

    /// Launches one subprocess and sees it through: tracking record up
    /// before output, tail mirrored while streaming, record cleared after.
    fn execute(
        &self,
        external_id: &ExternalId,
        record: &SessionRecord,
        agent: &AgentDescriptor,
        adapter: &dyn RuntimeAdapter,
        backend_session_id: Option<String>,
        resume: bool,
        prompt: &str,
    ) -> ExecOutcome {
        let request = LaunchRequest {
            runtime: record.runtime,
            model: record.model.clone(),
            prompt: contextual_prompt(agent, external_id, prompt),
            backend_session_id,
            resume,
            working_dir: agent.path.clone(),
        };
        let command = adapter.build_command(&request);

        log::info!(
            "launching {} (model {}, agent {}, resume {resume})",
            record.runtime,
            record.model,
            agent.name
        );

        let active = match self.runner.spawn(&command, &request.working_dir) {
            Ok(active) => active,
            Err(err) => {
                return ExecOutcome::failed(format!(
                    "Error: failed to launch {} runtime: {err}",
                    record.runtime
                ))
            }
        };

        let mut query = RunningQuery::new(
            external_id.clone(),
            active.pid(),
            record.runtime,
            agent.name.clone(),
            prompt,
        );
        if let Err(err) = self.tracker.record(&query) {
            log::warn!("could not write tracking record: {err}");
        }

        let mut last_flush = Instant::now();
        let collected = active.collect(&mut |line| {
            query.push_output(line);
            if last_flush.elapsed() >= TAIL_FLUSH_INTERVAL {
                if let Err(err) = self.tracker.record(&query) {
                    log::warn!("could not update tracking record: {err}");
                }
                last_flush = Instant::now();
            }
        });

        if let Err(err) = self.tracker.clear(external_id) {
            log::warn!("could not clear tracking record: {err}");
        }

        let outcome = match collected {
            Ok(outcome) => outcome,
            Err(err) => {
                return ExecOutcome::failed(format!(
                    "Error: {} runtime did not complete: {err}",
                    record.runtime
                ))
            }
        };

        let cleaned = clean(&outcome.output, record.runtime);
        match outcome.stop_reason {
            StopReason::Completed => ExecOutcome {
                completed: true,
                raw_output: outcome.output,
                text: cleaned,
            },
            StopReason::Killed => ExecOutcome {
                completed: false,
                raw_output: outcome.output,
                text: if cleaned.is_empty() {
                    "Query was cancelled before any output was produced.".to_string()
                } else {
                    cleaned
                },
            },
            StopReason::Failed => ExecOutcome {
                completed: false,
                raw_output: outcome.output.clone(),
                text: format!(
                    "Error: {} command failed (exit {}){}",
                    record.runtime,
                    outcome
                        .exit_code
                        .map(|code| code.to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    if cleaned.is_empty() {
                        String::new()
                    } else {
                        format!(": {cleaned}")
                    }
                ),
            },
        }
    }
}

struct ExecOutcome {
    completed: bool,
    raw_output: String,
    text: String,
}

impl ExecOutcome {
    fn failed(text: String) -> Self {
        Self {
            completed: false,
            raw_output: String::new(),
            text,
        }
    }
}

impl QueryExecutor for Supervisor<'_> {
    /// One-off execution in another agent's context. Uses a fresh backend
    /// session and leaves the persisted record untouched.
    fn execute_detached(
        &self,
        record: &SessionRecord,
        agent: &AgentDescriptor,
        prompt: &str,
    ) -> String {
        let adapter = (self.adapters)(record.runtime);
        self.execute(
            &record.external_id,
            record,
            agent,
            adapter.as_ref(),
            None,
            false,
            prompt,
        )
        .text
    }
}
