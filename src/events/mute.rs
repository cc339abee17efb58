//! Persisted notification mute flags.
//!
//! Two keys in local storage:
//!
//! - `lantern.events.mute_state`: JSON object `{ "<event id>": bool }`
//! - `lantern.events.mute_all`: `"true"` / `"false"`
//!
//! Unknown events count as muted, and so does the master switch until the
//! user turns it off. Every mutation writes the full value back. Entries
//! for events that left the list are kept only while they hold an unmute,
//! so hosts that mint a fresh id per occurrence do not grow the map.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::db::Database;

pub const MUTE_STATE_KEY: &str = "lantern.events.mute_state";
pub const MUTE_ALL_KEY: &str = "lantern.events.mute_all";

pub struct MuteState {
    db: Arc<Database>,
    per_event: BTreeMap<String, bool>,
    all: bool,
}

impl MuteState {
    /// Load both flags. Unreadable or corrupt values fall back to defaults.
    pub fn load(db: Arc<Database>) -> Self {
        let per_event = match db.get(MUTE_STATE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Discarding corrupt mute state: {}", e);
                BTreeMap::new()
            }),
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Failed to read mute state: {}", e);
                BTreeMap::new()
            }
        };

        let all = match db.get(MUTE_ALL_KEY) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Discarding corrupt mute-all flag: {:?}", raw);
                true
            }),
            Ok(None) => true,
            Err(e) => {
                tracing::warn!("Failed to read mute-all flag: {}", e);
                true
            }
        };

        tracing::debug!("Loaded mute state for {} events (mute all: {})", per_event.len(), all);
        Self { db, per_event, all }
    }

    /// Per-event flag; unknown ids are muted
    pub fn is_muted(&self, id: &str) -> bool {
        self.per_event.get(id).copied().unwrap_or(true)
    }

    pub fn mute_all(&self) -> bool {
        self.all
    }

    pub fn entries(&self) -> &BTreeMap<String, bool> {
        &self.per_event
    }

    pub fn set_muted(&mut self, id: &str, muted: bool) {
        self.per_event.insert(id.to_string(), muted);
        self.persist_events();
    }

    pub fn set_mute_all(&mut self, muted: bool) {
        self.all = muted;
        if let Err(e) = self.db.set(MUTE_ALL_KEY, &muted.to_string()) {
            tracing::warn!("Failed to persist mute-all flag: {}", e);
        }
    }

    /// Bring the map in line with the current event list: new ids get a
    /// muted entry, and entries for ids no longer listed are dropped unless
    /// they hold an unmute. Persists only when something changed.
    pub fn sync_known(&mut self, ids: &HashSet<&str>) {
        let before = self.per_event.len();
        self.per_event
            .retain(|id, muted| !*muted || ids.contains(id.as_str()));
        let dropped = before - self.per_event.len();

        let mut added = 0;
        for id in ids {
            if !self.per_event.contains_key(*id) {
                self.per_event.insert(id.to_string(), true);
                added += 1;
            }
        }

        if added > 0 || dropped > 0 {
            tracing::debug!("Mute state: {} new events muted, {} stale entries dropped", added, dropped);
            self.persist_events();
        }
    }

    fn persist_events(&self) {
        let result = serde_json::to_string(&self.per_event)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.db.set(MUTE_STATE_KEY, &json));
        if let Err(e) = result {
            tracing::warn!("Failed to persist mute state: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Arc<Database> {
        Arc::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_defaults_are_muted() {
        let state = MuteState::load(db());
        assert!(state.mute_all());
        assert!(state.is_muted("anything"));
        assert!(state.entries().is_empty());
    }

    #[test]
    fn test_round_trip() {
        let db = db();
        let mut state = MuteState::load(db.clone());
        state.set_muted("E1", true);
        state.set_muted("E2", false);
        state.set_mute_all(false);

        let reloaded = MuteState::load(db);
        let expected: BTreeMap<String, bool> =
            [("E1".to_string(), true), ("E2".to_string(), false)].into();
        assert_eq!(reloaded.entries(), &expected);
        assert!(!reloaded.mute_all());
    }

    #[test]
    fn test_stored_json_format() {
        let db = db();
        let mut state = MuteState::load(db.clone());
        state.set_muted("bc", false);
        assert_eq!(db.get(MUTE_STATE_KEY).unwrap().as_deref(), Some(r#"{"bc":false}"#));
    }

    #[test]
    fn test_sync_known_keeps_existing_choices() {
        let db = db();
        let mut state = MuteState::load(db.clone());
        state.set_muted("bc", false);
        state.sync_known(&HashSet::from(["bc", "ds"]));

        let reloaded = MuteState::load(db);
        assert!(!reloaded.is_muted("bc"));
        assert!(reloaded.is_muted("ds"));
        assert_eq!(reloaded.entries().len(), 2);
    }

    #[test]
    fn test_corrupt_storage_falls_back() {
        let db = db();
        db.set(MUTE_STATE_KEY, "{not json").unwrap();
        db.set(MUTE_ALL_KEY, "maybe").unwrap();

        let state = MuteState::load(db);
        assert!(state.entries().is_empty());
        assert!(state.mute_all());
    }

    #[test]
    fn test_rotating_ids_keep_map_bounded() {
        let db = db();
        let mut state = MuteState::load(db.clone());

        for round in 0..20 {
            let a = format!("bc-{}", round);
            let b = format!("ds-{}", round);
            state.sync_known(&HashSet::from([a.as_str(), b.as_str()]));
        }

        let reloaded = MuteState::load(db);
        let ids: Vec<&str> = reloaded.entries().keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["bc-19", "ds-19"]);
    }

    #[test]
    fn test_unmuted_entries_survive_leaving_the_list() {
        let db = db();
        let mut state = MuteState::load(db.clone());
        state.sync_known(&HashSet::from(["rd", "cs"]));
        state.set_muted("rd", false);

        state.sync_known(&HashSet::from(["gi"]));

        let reloaded = MuteState::load(db);
        assert!(!reloaded.is_muted("rd"));
        assert!(!reloaded.entries().contains_key("cs"));
        assert!(reloaded.is_muted("gi"));
    }
}
