//! Durable external-id → session record maps, one JSON file per runtime
//! family. Every operation is load-mutate-save; there is no in-memory cache
//! across invocations.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use mux_core::{Defaults, ExternalId, RuntimeKind, SessionRecord, ALL_RUNTIMES};
use mux_runtimes::default_model;

use crate::paths::StorageLayout;
use crate::state_file::{read_json_map, write_json_map, StoreError};

/// A map value: either a full record or the legacy format that stored only
/// the backend session id as a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum MapEntry {
    Record(SessionRecord),
    Legacy(String),
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    layout: StorageLayout,
    defaults: Defaults,
}

impl SessionStore {
    pub fn new(layout: StorageLayout, defaults: Defaults) -> Self {
        Self { layout, defaults }
    }

    /// Loads the record for `external_id`, creating and persisting a default
    /// one when the id has never been seen. Maps are consulted in registry
    /// order; the first file containing the id wins.
    pub fn load(&self, external_id: &ExternalId) -> SessionRecord {
        for runtime in ALL_RUNTIMES {
            let path = self.layout.session_map_path(runtime);
            let map = read_json_map::<MapEntry>(&path);
            match map.get(&external_id.0) {
                Some(MapEntry::Record(record)) => return record.clone(),
                Some(MapEntry::Legacy(backend_id)) => {
                    let record = self.migrate_legacy(external_id, runtime, backend_id);
                    return record;
                }
                None => {}
            }
        }

        let record = self.default_record(external_id);
        if let Err(err) = self.save(&record) {
            log::warn!("could not persist new session record: {err}");
        } else {
            log::info!("created session record for '{external_id}'");
        }
        record
    }

    /// Full overwrite of the record's entry in its runtime's map. The id is
    /// removed from every other runtime's map so a runtime switch moves the
    /// record instead of forking it.
    pub fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let path = self.layout.session_map_path(record.runtime);
        let mut map = read_json_map::<MapEntry>(&path);
        map.insert(
            record.external_id.0.clone(),
            MapEntry::Record(record.clone()),
        );
        write_json_map(&path, &map)?;

        for runtime in ALL_RUNTIMES {
            if runtime == record.runtime {
                continue;
            }
            let other_path = self.layout.session_map_path(runtime);
            let mut other = read_json_map::<MapEntry>(&other_path);
            if other.remove(&record.external_id.0).is_some() {
                write_json_map(&other_path, &other)?;
            }
        }
        Ok(())
    }

    /// Clears only the backend session id; identity and preferences persist.
    pub fn reset_backend_id(&self, external_id: &ExternalId) -> Result<SessionRecord, StoreError> {
        let mut record = self.load(external_id);
        record.reset_backend_session();
        self.save(&record)?;
        Ok(record)
    }

    fn default_record(&self, external_id: &ExternalId) -> SessionRecord {
        SessionRecord {
            external_id: external_id.clone(),
            backend_session_id: None,
            runtime: self.defaults.runtime,
            model: self.defaults.model.clone(),
            agent: self.defaults.agent.clone(),
            updated_at: Utc::now(),
        }
    }

    fn migrate_legacy(
        &self,
        external_id: &ExternalId,
        runtime: RuntimeKind,
        backend_id: &str,
    ) -> SessionRecord {
        let record = SessionRecord {
            external_id: external_id.clone(),
            backend_session_id: Some(backend_id.to_string()),
            runtime,
            model: default_model(runtime).to_string(),
            agent: self.defaults.agent.clone(),
            updated_at: Utc::now(),
        };
        if let Err(err) = self.save(&record) {
            log::warn!("could not upgrade legacy session entry: {err}");
        } else {
            log::info!("upgraded legacy session entry for '{external_id}'");
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    fn mk_store(base: &Path) -> SessionStore {
        SessionStore::new(StorageLayout::under(base), Defaults::default())
    }

    #[test]
    fn load_creates_and_persists_defaults_for_unknown_ids() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = mk_store(dir.path());
        let id = ExternalId::new("s1");

        let record = store.load(&id);
        assert_eq!(record.runtime, RuntimeKind::Copilot);
        assert_eq!(record.model, "gpt-5-mini");
        assert_eq!(record.agent, "orchestrator");
        assert_eq!(record.backend_session_id, None);

        // Durably visible to a second load without further writes.
        let reloaded = store.load(&id);
        assert_eq!(reloaded, record);
    }

    #[test]
    fn save_is_a_full_overwrite_of_the_entry() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = mk_store(dir.path());
        let id = ExternalId::new("s1");

        let mut record = store.load(&id);
        record.model = "gpt-5.2".to_string();
        record.backend_session_id = Some("backend-1".to_string());
        store.save(&record).expect("save record");

        let reloaded = store.load(&id);
        assert_eq!(reloaded.model, "gpt-5.2");
        assert_eq!(reloaded.backend_session_id, Some("backend-1".to_string()));
    }

    #[test]
    fn switching_runtime_moves_the_record_between_maps() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = mk_store(dir.path());
        let layout = StorageLayout::under(dir.path());
        let id = ExternalId::new("s1");

        let mut record = store.load(&id);
        record.runtime = RuntimeKind::Claude;
        record.model = "haiku".to_string();
        store.save(&record).expect("save moved record");

        let copilot_map =
            fs::read_to_string(layout.session_map_path(RuntimeKind::Copilot)).expect("read map");
        assert!(!copilot_map.contains("\"s1\""));

        let reloaded = store.load(&id);
        assert_eq!(reloaded.runtime, RuntimeKind::Claude);
    }

    #[test]
    fn reset_backend_id_clears_only_the_backend_session() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = mk_store(dir.path());
        let id = ExternalId::new("s1");

        let mut record = store.load(&id);
        record.runtime = RuntimeKind::Gemini;
        record.model = "gemini-1.5-pro".to_string();
        record.agent = "family".to_string();
        record.backend_session_id = Some("backend-9".to_string());
        store.save(&record).expect("save record");

        let after = store.reset_backend_id(&id).expect("reset");
        assert_eq!(after.backend_session_id, None);
        assert_eq!(after.runtime, RuntimeKind::Gemini);
        assert_eq!(after.model, "gemini-1.5-pro");
        assert_eq!(after.agent, "family");

        let reloaded = store.load(&id);
        assert_eq!(reloaded.backend_session_id, None);
    }

    #[test]
    fn legacy_bare_string_entries_are_upgraded_in_place() {
        let dir = tempfile::tempdir().expect("temp dir");
        let layout = StorageLayout::under(dir.path());
        let path = layout.session_map_path(RuntimeKind::Claude);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, r#"{"s1": "old-backend-id"}"#).expect("write legacy map");

        let store = mk_store(dir.path());
        let record = store.load(&ExternalId::new("s1"));
        assert_eq!(record.runtime, RuntimeKind::Claude);
        assert_eq!(record.backend_session_id, Some("old-backend-id".to_string()));
        assert_eq!(record.model, "haiku");

        let body = fs::read_to_string(&path).expect("read upgraded map");
        assert!(body.contains("\"backend_session_id\": \"old-backend-id\""));
    }

    #[test]
    fn corrupt_map_file_degrades_to_empty_state() {
        let dir = tempfile::tempdir().expect("temp dir");
        let layout = StorageLayout::under(dir.path());
        let path = layout.session_map_path(RuntimeKind::Copilot);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "{ not json").expect("write corrupt map");

        let store = mk_store(dir.path());
        let record = store.load(&ExternalId::new("s1"));
        assert_eq!(record.runtime, RuntimeKind::Copilot);

        // The next write rebuilds the file.
        let body = fs::read_to_string(&path).expect("read rebuilt map");
        assert!(body.contains("\"s1\""));
    }

    #[test]
    fn records_for_different_ids_are_independent() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = mk_store(dir.path());

        let mut first = store.load(&ExternalId::new("a"));
        first.agent = "devops".to_string();
        store.save(&first).expect("save first");

        let second = store.load(&ExternalId::new("b"));
        assert_eq!(second.agent, "orchestrator");
    }
}
