//! Running-query tracker: one shared JSON map keyed by external id, so a
//! separate short-lived invocation can report status on or cancel a
//! subprocess launched by another invocation.
//!
//! At most one record exists per external id. Recording a new query
//! overwrites any prior record without checking whether the prior process is
//! still alive; an earlier subprocess keeps running untracked in that case.

use chrono::Utc;

use mux_core::{ExternalId, RunningQuery};

use crate::paths::StorageLayout;
use crate::state_file::{read_json_map, write_json_map, StoreError};

/// What the tracker knows about an external id right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    /// A tracked subprocess exists and its pid is alive.
    Running(RunningQuery),
    /// No tracked subprocess (never launched, finished, or lazily cleaned).
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// A termination signal was delivered (or the process was already gone)
    /// and the record was cleared.
    Cancelled(RunningQuery),
    NothingToCancel,
}

#[derive(Debug, Clone)]
pub struct RunningQueryStore {
    layout: StorageLayout,
}

impl RunningQueryStore {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Upserts the record for its external id.
    pub fn record(&self, query: &RunningQuery) -> Result<(), StoreError> {
        let path = self.layout.tracking_path();
        let mut map = read_json_map::<RunningQuery>(&path);
        map.insert(query.external_id.0.clone(), query.clone());
        write_json_map(&path, &map)
    }

    /// Removes the record for `external_id` if present.
    pub fn clear(&self, external_id: &ExternalId) -> Result<(), StoreError> {
        let path = self.layout.tracking_path();
        let mut map = read_json_map::<RunningQuery>(&path);
        if map.remove(&external_id.0).is_some() {
            write_json_map(&path, &map)?;
        }
        Ok(())
    }

    /// Raw lookup without a liveness check.
    pub fn get(&self, external_id: &ExternalId) -> Option<RunningQuery> {
        read_json_map::<RunningQuery>(&self.layout.tracking_path())
            .remove(&external_id.0)
    }

    /// Lookup with lazy cleanup: a record whose pid is gone is removed and
    /// reported as idle.
    pub fn status(&self, external_id: &ExternalId) -> QueryStatus {
        let Some(query) = self.get(external_id) else {
            return QueryStatus::Idle;
        };
        if pid_alive(query.pid) {
            return QueryStatus::Running(query);
        }
        if let Err(err) = self.clear(external_id) {
            log::warn!("could not clear stale tracking record: {err}");
        }
        QueryStatus::Idle
    }

    /// Sends SIGTERM to the tracked pid and clears the record. A pid that no
    /// longer exists counts as already finished, not an error.
    pub fn cancel(&self, external_id: &ExternalId) -> Result<CancelOutcome, StoreError> {
        let Some(query) = self.get(external_id) else {
            return Ok(CancelOutcome::NothingToCancel);
        };

        if !terminate(query.pid) {
            log::info!(
                "process {} for '{external_id}' already finished",
                query.pid
            );
        }
        self.clear(external_id)?;
        Ok(CancelOutcome::Cancelled(query))
    }

    /// Renders a human-readable status line for `external_id`.
    pub fn describe(&self, external_id: &ExternalId) -> String {
        match self.status(external_id) {
            QueryStatus::Running(query) => {
                let elapsed = query.elapsed_secs(Utc::now());
                let mut out = format!(
                    "Query running for {elapsed}s (runtime {}, agent {}, pid {}).\nPrompt: {}",
                    query.runtime, query.agent, query.pid, query.prompt_excerpt
                );
                if !query.output_tail.trim().is_empty() {
                    out.push_str("\n\nLatest output:\n");
                    out.push_str(query.output_tail.trim_end());
                }
                out
            }
            QueryStatus::Idle => "No running query for this session.".to_string(),
        }
    }
}

/// Whether `pid` refers to a live process. Signal 0 performs the existence
/// check without delivering anything; EPERM still means the process exists.
fn pid_alive(pid: u32) -> bool {
    let result = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if result == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Sends SIGTERM. Returns false when the process was already gone.
fn terminate(pid: u32) -> bool {
    let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    result == 0
}
