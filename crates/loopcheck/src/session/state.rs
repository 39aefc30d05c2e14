//! The inspection session state machine.
//!
//! [`Session`] is plain data plus transitions. It has no clock of its own:
//! whoever owns it calls [`Session::tick`] once per second while it is
//! running. See [`super::SessionController`] for the owner that does that.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::photo::{PhotoKey, PhotoMap, PhotoPayload};

/// Observable phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Stopped with no elapsed time.
    Idle,
    /// The tick is running.
    Running,
    /// Stopped with elapsed time on the clock.
    Paused,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// Persisted shape of a session (`loopState`).
///
/// The completed set travels as an array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoopState {
    /// Whether the tick was running.
    pub is_running: bool,
    /// Elapsed seconds.
    pub elapsed_time: u64,
    /// Completed task indices.
    pub completed_tasks: Vec<usize>,
    /// Notes by task index.
    pub notes: BTreeMap<usize, String>,
}

/// Emitted when the last task of a session is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoopCompletion {
    /// The session number that just finished.
    pub finished: u32,
    /// The session number now active.
    pub next: u32,
    /// Elapsed seconds of the finished session.
    pub elapsed_seconds: u64,
    /// Photos that were attached when it finished.
    pub photo_count: usize,
}

/// Result of [`Session::complete_task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskCompletion {
    /// `false` if the task was already complete.
    pub newly_completed: bool,
    /// Set when this completion finished the session.
    pub loop_completed: Option<LoopCompletion>,
}

/// One repeating round of inspection tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    task_count: usize,
    running: bool,
    elapsed_seconds: u64,
    completed: BTreeSet<usize>,
    notes: BTreeMap<usize, String>,
    photos: PhotoMap,
    session_number: u32,
    completion_notified: bool,
}

impl Session {
    /// A fresh idle session numbered 1.
    #[must_use]
    pub fn new(task_count: usize) -> Self {
        Self {
            task_count,
            running: false,
            elapsed_seconds: 0,
            completed: BTreeSet::new(),
            notes: BTreeMap::new(),
            photos: PhotoMap::new(),
            session_number: 1,
            completion_notified: false,
        }
    }

    /// Rebuild a session from persisted parts.
    ///
    /// Indices outside `0..task_count` and empty notes are dropped, and a
    /// session number of 0 becomes 1. A restored state that is already complete is rolled
    /// over on the next [`Session::observe_completion`].
    #[must_use]
    pub fn restore(
        task_count: usize,
        session_number: u32,
        state: LoopState,
        mut photos: PhotoMap,
    ) -> Self {
        photos.retain_tasks(task_count);
        Self {
            task_count,
            running: state.is_running,
            elapsed_seconds: state.elapsed_time,
            completed: state
                .completed_tasks
                .into_iter()
                .filter(|i| *i < task_count)
                .collect(),
            notes: state
                .notes
                .into_iter()
                .filter(|(i, text)| *i < task_count && !text.is_empty())
                .collect(),
            photos,
            session_number: session_number.max(1),
            completion_notified: false,
        }
    }

    /// Persisted form of the session's timer, completions and notes.
    #[must_use]
    pub fn to_loop_state(&self) -> LoopState {
        LoopState {
            is_running: self.running,
            elapsed_time: self.elapsed_seconds,
            completed_tasks: self.completed.iter().copied().collect(),
            notes: self.notes.clone(),
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.task_count {
            Ok(())
        } else {
            Err(Error::invalid_task_index(index, self.task_count))
        }
    }

    /// Start the clock. Returns `false` if it was already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    /// Stop the clock. Returns `false` if it was already stopped.
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    /// Back to idle: clock, completions, notes and photos cleared.
    ///
    /// The session number is kept.
    pub fn reset(&mut self) {
        self.running = false;
        self.elapsed_seconds = 0;
        self.completed.clear();
        self.notes.clear();
        self.photos.clear();
    }

    /// Reset and restart numbering at 1.
    pub fn reset_counter(&mut self) {
        self.reset();
        self.session_number = 1;
    }

    /// Advance the clock by one second if running.
    ///
    /// Also re-checks the completion condition, so a session restored in a
    /// completed state still rolls over.
    pub fn tick(&mut self) -> Option<LoopCompletion> {
        if !self.running {
            return None;
        }
        self.elapsed_seconds += 1;
        self.observe_completion()
    }

    /// Mark a task complete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTaskIndex`] if `index` is out of range.
    pub fn complete_task(&mut self, index: usize) -> Result<TaskCompletion> {
        self.check_index(index)?;
        let newly_completed = self.completed.insert(index);
        Ok(TaskCompletion {
            newly_completed,
            loop_completed: self.observe_completion(),
        })
    }

    /// Replace the note for a task. Empty text removes the note.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTaskIndex`] if `index` is out of range.
    pub fn set_note(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        self.check_index(index)?;
        let text = text.into();
        if text.is_empty() {
            self.notes.remove(&index);
        } else {
            self.notes.insert(index, text);
        }
        Ok(())
    }

    /// Store a photo, overwriting any existing one at the key.
    ///
    /// Returns `true` if the key was newly added.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTaskIndex`] if the key's task is out of range.
    pub fn attach_photo(&mut self, key: PhotoKey, payload: PhotoPayload) -> Result<bool> {
        self.check_index(key.task_index)?;
        Ok(self.photos.insert(key, payload))
    }

    /// Remove one photo.
    pub fn remove_photo(&mut self, key: PhotoKey) -> Option<PhotoPayload> {
        self.photos.remove(key)
    }

    /// Remove every photo.
    pub fn clear_photos(&mut self) {
        self.photos.clear();
    }

    /// Fire the completion transition if every task is done.
    ///
    /// Fires once each time the completed set becomes full; the notified
    /// flag is only cleared after the set has been observed not full.
    pub fn observe_completion(&mut self) -> Option<LoopCompletion> {
        if self.task_count == 0 || self.completed.len() != self.task_count {
            self.completion_notified = false;
            return None;
        }
        if self.completion_notified {
            return None;
        }
        self.completion_notified = true;

        let completion = LoopCompletion {
            finished: self.session_number,
            next: self.session_number.saturating_add(1),
            elapsed_seconds: self.elapsed_seconds,
            photo_count: self.photos.len(),
        };
        self.session_number = completion.next;
        self.reset();
        Some(completion)
    }

    /// Current phase.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match (self.running, self.elapsed_seconds) {
            (true, _) => SessionStatus::Running,
            (false, 0) => SessionStatus::Idle,
            (false, _) => SessionStatus::Paused,
        }
    }

    /// Whether the clock is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Elapsed seconds in this session.
    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// The current session number (1-based).
    #[must_use]
    pub fn session_number(&self) -> u32 {
        self.session_number
    }

    /// Number of tasks per session.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.task_count
    }

    /// Completed task indices.
    #[must_use]
    pub fn completed(&self) -> &BTreeSet<usize> {
        &self.completed
    }

    /// Whether a task is complete.
    #[must_use]
    pub fn is_completed(&self, index: usize) -> bool {
        self.completed.contains(&index)
    }

    /// Notes by task index.
    #[must_use]
    pub fn notes(&self) -> &BTreeMap<usize, String> {
        &self.notes
    }

    /// Photos of this session.
    #[must_use]
    pub fn photos(&self) -> &PhotoMap {
        &self.photos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::Phase;

    fn payload(data: &str) -> PhotoPayload {
        PhotoPayload::parse(format!("data:image/jpeg;base64,{data}")).unwrap()
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new(8);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.session_number(), 1);
        assert_eq!(session.elapsed_seconds(), 0);
    }

    #[test]
    fn test_state_transitions() {
        let mut session = Session::new(8);
        assert!(session.start());
        assert!(!session.start());
        assert_eq!(session.status(), SessionStatus::Running);

        session.tick();
        assert!(session.stop());
        assert!(!session.stop());
        assert_eq!(session.status(), SessionStatus::Paused);

        session.start();
        assert_eq!(session.status(), SessionStatus::Running);

        session.reset();
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_tick_only_counts_while_running() {
        let mut session = Session::new(8);
        session.tick();
        assert_eq!(session.elapsed_seconds(), 0);

        session.start();
        for _ in 0..3 {
            session.tick();
        }
        session.stop();
        session.tick();
        assert_eq!(session.elapsed_seconds(), 3);
    }

    #[test]
    fn test_complete_task_is_idempotent() {
        let mut session = Session::new(8);
        assert!(session.complete_task(2).unwrap().newly_completed);
        assert!(!session.complete_task(2).unwrap().newly_completed);
        assert_eq!(session.completed().len(), 1);
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mut session = Session::new(8);
        assert!(matches!(
            session.complete_task(8),
            Err(Error::InvalidTaskIndex {
                index: 8,
                task_count: 8
            })
        ));
        assert!(session.set_note(100, "x").is_err());
        assert!(session
            .attach_photo(PhotoKey::new(8, Phase::After), payload("AAAA"))
            .is_err());
        assert!(session.completed().is_empty());
    }

    #[test]
    fn test_empty_note_clears_entry() {
        let mut session = Session::new(8);
        session.set_note(2, "paper towels low").unwrap();
        session.set_note(2, "").unwrap();
        assert!(session.notes().is_empty());
        assert!(!session.to_loop_state().notes.contains_key(&2));

        let mut state = LoopState::default();
        state.notes.insert(3, String::new());
        state.notes.insert(4, "sales floor clear".to_string());
        let restored = Session::restore(8, 1, state, PhotoMap::new());
        assert_eq!(restored.notes().len(), 1);
        assert_eq!(restored.notes().get(&4).map(String::as_str), Some("sales floor clear"));
    }

    #[test]
    fn test_reset_clears_everything_but_number() {
        let mut session = Session::restore(8, 4, LoopState::default(), PhotoMap::new());
        session.start();
        session.tick();
        session.complete_task(0).unwrap();
        session.set_note(1, "wet floor sign out").unwrap();
        session
            .attach_photo(PhotoKey::new(0, Phase::Before), payload("AAAA"))
            .unwrap();

        session.reset();

        assert!(!session.is_running());
        assert_eq!(session.elapsed_seconds(), 0);
        assert!(session.completed().is_empty());
        assert!(session.notes().is_empty());
        assert!(session.photos().is_empty());
        assert_eq!(session.session_number(), 4);
    }

    #[test]
    fn test_full_completion_rolls_over() {
        let mut session = Session::new(8);
        session.start();
        session.tick();

        let mut completions = Vec::new();
        for i in 0..8 {
            if let Some(done) = session.complete_task(i).unwrap().loop_completed {
                completions.push(done);
            }
        }

        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].finished, 1);
        assert_eq!(completions[0].next, 2);
        assert_eq!(completions[0].elapsed_seconds, 1);
        assert_eq!(session.session_number(), 2);
        assert_eq!(session.elapsed_seconds(), 0);
        assert!(session.completed().is_empty());
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_completion_fires_once_across_ticks() {
        let mut session = Session::new(1);
        session.start();
        let fired = session.complete_task(0).unwrap().loop_completed;
        assert!(fired.is_some());

        session.start();
        let later: Vec<_> = (0..5).filter_map(|_| session.tick()).collect();
        assert!(later.is_empty());
        assert_eq!(session.session_number(), 2);
    }

    #[test]
    fn test_restored_complete_state_rolls_over_on_tick() {
        let state = LoopState {
            is_running: true,
            elapsed_time: 10,
            completed_tasks: vec![0, 1],
            notes: BTreeMap::new(),
        };
        let mut session = Session::restore(2, 3, state, PhotoMap::new());
        let done = session.tick().expect("should roll over");
        assert_eq!(done.finished, 3);
        assert_eq!(done.elapsed_seconds, 11);
        assert_eq!(session.session_number(), 4);
    }

    #[test]
    fn test_zero_tasks_never_completes() {
        let mut session = Session::new(0);
        session.start();
        assert!(session.tick().is_none());
        assert!(session.observe_completion().is_none());
        assert_eq!(session.session_number(), 1);
    }

    #[test]
    fn test_attach_photo_overwrites() {
        let mut session = Session::new(8);
        let key = PhotoKey::new(3, Phase::Before);
        assert!(session.attach_photo(key, payload("AAAA")).unwrap());
        assert!(!session.attach_photo(key, payload("BBBB")).unwrap());
        assert_eq!(
            session.photos().get(key).map(PhotoPayload::as_str),
            Some("data:image/jpeg;base64,BBBB")
        );
    }

    #[test]
    fn test_completion_does_not_require_photos() {
        let mut session = Session::new(2);
        session.complete_task(0).unwrap();
        let done = session.complete_task(1).unwrap().loop_completed.unwrap();
        assert_eq!(done.photo_count, 0);
    }

    #[test]
    fn test_loop_state_round_trip() {
        let mut session = Session::new(8);
        session.start();
        session.tick();
        session.tick();
        session.complete_task(5).unwrap();
        session.complete_task(1).unwrap();
        session.set_note(5, "mop bucket left out").unwrap();

        let json = serde_json::to_string(&session.to_loop_state()).unwrap();
        assert!(json.contains("\"isRunning\":true"));
        assert!(json.contains("\"elapsedTime\":2"));
        assert!(json.contains("\"completedTasks\":[1,5]"));

        let state: LoopState = serde_json::from_str(&json).unwrap();
        let restored = Session::restore(8, 1, state, PhotoMap::new());
        assert_eq!(restored.completed(), session.completed());
        assert_eq!(restored.notes(), session.notes());
        assert_eq!(restored.elapsed_seconds(), 2);
        assert!(restored.is_running());
    }

    #[test]
    fn test_restore_filters_out_of_range() {
        let state = LoopState {
            is_running: false,
            elapsed_time: 0,
            completed_tasks: vec![1, 9, 1],
            notes: [(2, "ok".to_string()), (40, "stale".to_string())]
                .into_iter()
                .collect(),
        };
        let session = Session::restore(8, 0, state, PhotoMap::new());
        assert_eq!(session.completed().iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(session.notes().len(), 1);
        assert_eq!(session.session_number(), 1);
    }

    #[test]
    fn test_reset_counter() {
        let mut session = Session::restore(8, 6, LoopState::default(), PhotoMap::new());
        session.reset_counter();
        assert_eq!(session.session_number(), 1);
    }
}
