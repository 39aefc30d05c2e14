//! Typed access to the persisted keys.
//!
//! Every value is stored as a string under a fixed key. Loads never fail:
//! a missing, unreadable or malformed value is logged and replaced by the
//! default, so a damaged store degrades to a fresh start instead of an
//! error. Saves report [`StorageError`] and leave recovery to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::activity::{ActivityEntry, ActivityFeed};
use crate::daily::DailyChecklist;
use crate::photo::PhotoMap;
use crate::session::{LoopState, Session};
use crate::storage::{StorageError, Store};

/// Names of the persisted keys.
pub mod keys {
    /// Current loop number, stringified integer.
    pub const CURRENT_LOOP_NUMBER: &str = "currentLoopNumber";
    /// Timer, completions and notes of the current loop.
    pub const LOOP_STATE: &str = "loopState";
    /// Photos of the current loop.
    pub const LOOP_PHOTOS: &str = "loopPhotos";
    /// Notes of the daily checklist.
    pub const DAILY_TASK_NOTES: &str = "dailyTaskNotes";
    /// Completed daily task ids.
    pub const DAILY_TASK_COMPLETED: &str = "dailyTaskCompleted";
    /// Recent activity feed.
    pub const RECENT_ACTIVITY: &str = "recentActivity";
}

/// Typed wrapper over a [`Store`].
#[derive(Debug, Clone)]
pub struct StateStore {
    store: Arc<dyn Store>,
}

impl StateStore {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn load_raw(&self, key: &str) -> Option<String> {
        match self.store.load(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "falling back to default");
                None
            }
        }
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.load_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                let err = StorageError::Malformed {
                    key: key.to_string(),
                    message: e.to_string(),
                };
                warn!(error = %err, "falling back to default");
                None
            }
        }
    }

    fn save_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(|e| StorageError::WriteFailed {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.store.save(key, &json)
    }

    /// Stored loop number, 1 if absent or invalid.
    #[must_use]
    pub fn load_loop_number(&self) -> u32 {
        let Some(raw) = self.load_raw(keys::CURRENT_LOOP_NUMBER) else {
            return 1;
        };
        match raw.trim().parse::<u32>() {
            Ok(n) if n >= 1 => n,
            _ => {
                warn!(value = %raw, "invalid loop number, using 1");
                1
            }
        }
    }

    /// Persist the loop number.
    ///
    /// # Errors
    ///
    /// Returns the store's [`StorageError`].
    pub fn save_loop_number(&self, number: u32) -> Result<(), StorageError> {
        self.store
            .save(keys::CURRENT_LOOP_NUMBER, &number.to_string())
    }

    /// Stored loop state, default if absent or malformed.
    #[must_use]
    pub fn load_loop_state(&self) -> LoopState {
        self.load_json(keys::LOOP_STATE).unwrap_or_default()
    }

    /// Persist the loop state.
    ///
    /// # Errors
    ///
    /// Returns the store's [`StorageError`].
    pub fn save_loop_state(&self, state: &LoopState) -> Result<(), StorageError> {
        self.save_json(keys::LOOP_STATE, state)
    }

    /// Stored photos. Malformed entries are dropped one by one.
    #[must_use]
    pub fn load_photos(&self) -> PhotoMap {
        let raw: BTreeMap<String, String> =
            self.load_json(keys::LOOP_PHOTOS).unwrap_or_default();
        let (photos, skipped) = PhotoMap::from_string_map(raw);
        if !skipped.is_empty() {
            warn!(?skipped, "dropped malformed photos");
        }
        photos
    }

    /// Persist the photos.
    ///
    /// # Errors
    ///
    /// Returns the store's [`StorageError`].
    pub fn save_photos(&self, photos: &PhotoMap) -> Result<(), StorageError> {
        self.save_json(keys::LOOP_PHOTOS, &photos.to_string_map())
    }

    /// Rebuild the session from the loop number, loop state and photos.
    #[must_use]
    pub fn load_session(&self, task_count: usize) -> Session {
        let session = Session::restore(
            task_count,
            self.load_loop_number(),
            self.load_loop_state(),
            self.load_photos(),
        );
        debug!(
            loop_number = session.session_number(),
            status = %session.status(),
            "restored session"
        );
        session
    }

    /// Persist every part of a session.
    ///
    /// All three keys are attempted; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the store's [`StorageError`].
    pub fn save_session(&self, session: &Session) -> Result<(), StorageError> {
        let results = [
            self.save_loop_number(session.session_number()),
            self.save_loop_state(&session.to_loop_state()),
            self.save_photos(session.photos()),
        ];
        results.into_iter().collect()
    }

    /// Stored daily checklist.
    #[must_use]
    pub fn load_daily(&self) -> DailyChecklist {
        let completed = self
            .load_json(keys::DAILY_TASK_COMPLETED)
            .unwrap_or_default();
        let notes = self.load_json(keys::DAILY_TASK_NOTES).unwrap_or_default();
        DailyChecklist::restore(completed, notes)
    }

    /// Persist the daily checklist.
    ///
    /// # Errors
    ///
    /// Returns the store's [`StorageError`].
    pub fn save_daily(&self, checklist: &DailyChecklist) -> Result<(), StorageError> {
        let completed = self.save_json(keys::DAILY_TASK_COMPLETED, &checklist.completed_ids());
        let notes = self.save_json(keys::DAILY_TASK_NOTES, checklist.notes());
        completed.and(notes)
    }

    /// Stored activity feed.
    #[must_use]
    pub fn load_feed(&self, capacity: usize) -> ActivityFeed {
        let entries: Vec<ActivityEntry> = self
            .load_json(keys::RECENT_ACTIVITY)
            .unwrap_or_default();
        ActivityFeed::from_entries(entries, capacity)
    }

    /// Persist the activity feed.
    ///
    /// # Errors
    ///
    /// Returns the store's [`StorageError`].
    pub fn save_feed(&self, feed: &ActivityFeed) -> Result<(), StorageError> {
        self.save_json(keys::RECENT_ACTIVITY, &feed.to_vec())
    }

    /// Add one entry to the stored feed.
    ///
    /// # Errors
    ///
    /// Returns the store's [`StorageError`].
    pub fn append_activity(
        &self,
        entry: ActivityEntry,
        capacity: usize,
    ) -> Result<(), StorageError> {
        let mut feed = self.load_feed(capacity);
        feed.push(entry);
        self.save_feed(&feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityKind;
    use crate::photo::{Phase, PhotoKey, PhotoPayload};
    use crate::storage::MemoryStore;

    fn state_store() -> (Arc<MemoryStore>, StateStore) {
        let memory = Arc::new(MemoryStore::new());
        let state = StateStore::new(memory.clone());
        (memory, state)
    }

    #[derive(Debug)]
    struct BrokenStore;

    impl Store for BrokenStore {
        fn save(&self, key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::WriteFailed {
                key: key.to_string(),
                message: "quota exceeded".to_string(),
            })
        }

        fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::ReadFailed {
                key: key.to_string(),
                message: "unavailable".to_string(),
            })
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn test_defaults_when_empty() {
        let (_, state) = state_store();
        assert_eq!(state.load_loop_number(), 1);
        assert_eq!(state.load_loop_state(), LoopState::default());
        assert!(state.load_photos().is_empty());
        assert_eq!(state.load_daily(), DailyChecklist::new());
        assert!(state.load_feed(5).is_empty());
    }

    #[test]
    fn test_loop_number_formats() {
        let (memory, state) = state_store();
        state.save_loop_number(7).unwrap();
        assert_eq!(memory.load(keys::CURRENT_LOOP_NUMBER).unwrap().as_deref(), Some("7"));
        assert_eq!(state.load_loop_number(), 7);

        for bad in ["0", "-3", "seven", ""] {
            memory.save(keys::CURRENT_LOOP_NUMBER, bad).unwrap();
            assert_eq!(state.load_loop_number(), 1, "accepted {bad:?}");
        }
    }

    #[test]
    fn test_corrupt_json_falls_back() {
        let (memory, state) = state_store();
        memory.save(keys::LOOP_STATE, "{not json").unwrap();
        memory.save(keys::DAILY_TASK_NOTES, "[1,2").unwrap();
        memory.save(keys::RECENT_ACTIVITY, "42").unwrap();

        assert_eq!(state.load_loop_state(), LoopState::default());
        assert!(state.load_daily().notes().is_empty());
        assert!(state.load_feed(5).is_empty());
    }

    #[test]
    fn test_loop_state_wire_format() {
        let (memory, state) = state_store();
        memory
            .save(
                keys::LOOP_STATE,
                r#"{"isRunning":true,"elapsedTime":42,"completedTasks":[0,3],"notes":{"3":"spill by cooler"}}"#,
            )
            .unwrap();

        let loaded = state.load_loop_state();
        assert!(loaded.is_running);
        assert_eq!(loaded.elapsed_time, 42);
        assert_eq!(loaded.completed_tasks, vec![0, 3]);
        assert_eq!(loaded.notes.get(&3).map(String::as_str), Some("spill by cooler"));
    }

    #[test]
    fn test_partial_loop_state_uses_field_defaults() {
        let (memory, state) = state_store();
        memory.save(keys::LOOP_STATE, r#"{"elapsedTime":9}"#).unwrap();
        let loaded = state.load_loop_state();
        assert_eq!(loaded.elapsed_time, 9);
        assert!(!loaded.is_running);
        assert!(loaded.completed_tasks.is_empty());
    }

    #[test]
    fn test_session_round_trip() {
        let (_, state) = state_store();
        let mut session = Session::new(8);
        session.start();
        session.tick();
        session.complete_task(2).unwrap();
        session.set_note(2, "trash can full").unwrap();
        session
            .attach_photo(
                PhotoKey::new(2, Phase::Before),
                PhotoPayload::parse("data:image/jpeg;base64,AAAA").unwrap(),
            )
            .unwrap();

        state.save_session(&session).unwrap();
        let restored = state.load_session(8);

        assert_eq!(restored, session);
    }

    #[test]
    fn test_malformed_photo_entries_are_dropped() {
        let (memory, state) = state_store();
        memory
            .save(
                keys::LOOP_PHOTOS,
                r#"{"1-before":"data:image/png;base64,AAAA","1-after":"garbage"}"#,
            )
            .unwrap();
        let photos = state.load_photos();
        assert_eq!(photos.len(), 1);
        assert!(photos.get(PhotoKey::new(1, Phase::Before)).is_some());
    }

    #[test]
    fn test_daily_round_trip() {
        let (memory, state) = state_store();
        let mut daily = DailyChecklist::new();
        daily.toggle(4).unwrap();
        daily.set_note(4, "wiped handles").unwrap();
        state.save_daily(&daily).unwrap();

        assert_eq!(
            memory.load(keys::DAILY_TASK_NOTES).unwrap().as_deref(),
            Some(r#"{"4":"wiped handles"}"#)
        );
        assert_eq!(state.load_daily(), daily);
    }

    #[test]
    fn test_feed_round_trip_respects_capacity() {
        let (_, state) = state_store();
        let mut feed = ActivityFeed::with_capacity(5);
        for i in 0..5 {
            feed.push(ActivityEntry::new(ActivityKind::Task, format!("t{i}"), ""));
        }
        state.save_feed(&feed).unwrap();

        let smaller = state.load_feed(3);
        assert_eq!(smaller.len(), 3);
        assert_eq!(smaller.iter().next().map(|e| e.title.as_str()), Some("t4"));
    }

    #[test]
    fn test_append_activity() {
        let (_, state) = state_store();
        state
            .append_activity(ActivityEntry::new(ActivityKind::Task, "a", ""), 2)
            .unwrap();
        state
            .append_activity(ActivityEntry::new(ActivityKind::Task, "b", ""), 2)
            .unwrap();
        state
            .append_activity(ActivityEntry::new(ActivityKind::Task, "c", ""), 2)
            .unwrap();

        let titles: Vec<_> = state.load_feed(5).iter().map(|e| e.title.clone()).collect();
        assert_eq!(titles, vec!["c".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_broken_store_degrades_to_defaults() {
        let state = StateStore::new(Arc::new(BrokenStore));
        assert_eq!(state.load_loop_number(), 1);
        assert_eq!(state.load_session(8), Session::new(8));
        assert!(matches!(
            state.save_loop_number(2),
            Err(StorageError::WriteFailed { .. })
        ));
        assert!(state.save_session(&Session::new(8)).is_err());
    }
}
