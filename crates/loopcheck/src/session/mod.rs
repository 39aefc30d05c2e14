//! Customer loop sessions.
//!
//! [`Session`] is the pure state machine; [`SessionController`] wraps it
//! with the one-second ticker, persistence and the activity feed.

mod controller;
mod state;

pub use controller::{CaptureOutcome, ControllerOptions, SessionController, SessionSnapshot};
pub use state::{LoopCompletion, LoopState, Session, SessionStatus, TaskCompletion};

use serde::Serialize;

use crate::photo::PhotoKey;

/// Change notifications broadcast by a [`SessionController`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The clock started.
    Started,
    /// The clock stopped.
    Stopped,
    /// The session was reset to idle.
    Reset,
    /// One second passed.
    Tick {
        /// Elapsed seconds after the tick.
        elapsed: u64,
    },
    /// A task was newly completed.
    TaskCompleted {
        /// Loop task index.
        index: usize,
    },
    /// A task note changed.
    NoteUpdated {
        /// Loop task index.
        index: usize,
    },
    /// A photo was stored.
    PhotoAttached {
        /// The slot that was filled.
        #[serde(serialize_with = "serialize_key")]
        key: PhotoKey,
        /// `false` when it replaced an existing photo.
        added: bool,
    },
    /// A photo was removed.
    PhotoRemoved {
        /// The slot that was emptied.
        #[serde(serialize_with = "serialize_key")]
        key: PhotoKey,
    },
    /// A capture failed; the photo map is unchanged.
    CaptureFailed {
        /// Human-readable reason.
        reason: String,
    },
    /// Every task was completed and the next loop began.
    LoopCompleted(LoopCompletion),
    /// A save failed; in-memory state is still correct.
    StorageFailed {
        /// Human-readable reason.
        message: String,
    },
}

fn serialize_key<S: serde::Serializer>(key: &PhotoKey, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(key)
}
