//! Daily role-guide checklist.
//!
//! Unlike the loop, daily tasks toggle: completing a finished task re-opens
//! it. Notes are kept per task id and persist independently of the loop.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::activity::{ActivityEntry, ActivityKind};
use crate::catalog::{self, DailyTask, DAILY_TASKS};
use crate::error::{Error, Result};

/// Result of [`DailyChecklist::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// The task is now complete.
    Completed,
    /// The task was complete and is open again.
    Reopened,
}

/// Completion counts and rounded percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Tasks done.
    pub completed: usize,
    /// Tasks in scope.
    pub total: usize,
    /// `completed / total` as a percentage, rounded half up.
    pub percent: u32,
}

impl Progress {
    /// Compute progress; an empty scope is 0%.
    #[must_use]
    pub fn new(completed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            let pct = (200 * completed + total) / (2 * total);
            u32::try_from(pct).unwrap_or(u32::MAX)
        };
        Self {
            completed,
            total,
            percent,
        }
    }
}

/// Completion state and notes for the daily catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyChecklist {
    completed: BTreeSet<u32>,
    notes: BTreeMap<u32, String>,
}

impl DailyChecklist {
    /// Create an empty checklist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from persisted parts, dropping ids not in the catalog.
    #[must_use]
    pub fn restore(completed: Vec<u32>, notes: BTreeMap<u32, String>) -> Self {
        Self {
            completed: completed
                .into_iter()
                .filter(|id| catalog::daily_task(*id).is_some())
                .collect(),
            notes: notes
                .into_iter()
                .filter(|(id, _)| catalog::daily_task(*id).is_some())
                .collect(),
        }
    }

    fn task(id: u32) -> Result<&'static DailyTask> {
        catalog::daily_task(id).ok_or(Error::UnknownDailyTask { id })
    }

    /// Flip a task between done and open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDailyTask`] for ids outside the catalog.
    pub fn toggle(&mut self, id: u32) -> Result<(Toggle, &'static DailyTask)> {
        let task = Self::task(id)?;
        if self.completed.remove(&id) {
            Ok((Toggle::Reopened, task))
        } else {
            self.completed.insert(id);
            Ok((Toggle::Completed, task))
        }
    }

    /// Replace the note for a task. An empty string clears it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDailyTask`] for ids outside the catalog.
    pub fn set_note(&mut self, id: u32, text: impl Into<String>) -> Result<()> {
        Self::task(id)?;
        let text = text.into();
        if text.is_empty() {
            self.notes.remove(&id);
        } else {
            self.notes.insert(id, text);
        }
        Ok(())
    }

    /// Whether a task is done.
    #[must_use]
    pub fn is_completed(&self, id: u32) -> bool {
        self.completed.contains(&id)
    }

    /// The note for a task, if any.
    #[must_use]
    pub fn note(&self, id: u32) -> Option<&str> {
        self.notes.get(&id).map(String::as_str)
    }

    /// Completed ids, ascending.
    #[must_use]
    pub fn completed_ids(&self) -> Vec<u32> {
        self.completed.iter().copied().collect()
    }

    /// All notes by task id.
    #[must_use]
    pub fn notes(&self) -> &BTreeMap<u32, String> {
        &self.notes
    }

    /// Progress over the whole catalog.
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress::new(self.completed.len(), DAILY_TASKS.len())
    }

    /// Progress over one category (`None` or `"All"` for everything).
    #[must_use]
    pub fn progress_in(&self, category: Option<&str>) -> Progress {
        let (done, total) = catalog::daily_tasks_in(category)
            .fold((0, 0), |(done, total), task| {
                (done + usize::from(self.is_completed(task.id)), total + 1)
            });
        Progress::new(done, total)
    }

    /// Forget all completions, keeping notes.
    pub fn clear_completed(&mut self) {
        self.completed.clear();
    }
}

/// Activity entry for a newly completed daily task.
#[must_use]
pub fn completion_entry(task: &DailyTask) -> ActivityEntry {
    ActivityEntry::new(
        ActivityKind::Task,
        "Daily Task Completed",
        format!("{} ({})", task.title, task.location),
    )
}
