//! Recent activity feed.
//!
//! A short, newest-first list of events shown on the dashboard. Entries are
//! only ever evicted by capacity.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Most entries a feed ever holds.
pub const MAX_FEED_CAPACITY: usize = 5;

/// Default number of entries kept.
pub const DEFAULT_FEED_CAPACITY: usize = MAX_FEED_CAPACITY;

/// What kind of event an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// A loop or daily task was completed.
    Task,
    /// A photo was captured.
    Photo,
    /// A full customer loop was completed.
    Loop,
    /// A problem was reported.
    Issue,
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::Photo => write!(f, "photo"),
            Self::Loop => write!(f, "loop"),
            Self::Issue => write!(f, "issue"),
        }
    }
}

/// One human-readable event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Unique id.
    pub id: String,
    /// Event kind.
    pub kind: ActivityKind,
    /// Short headline.
    pub title: String,
    /// Detail line.
    pub description: String,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl ActivityEntry {
    /// Create an entry stamped with the current time.
    #[must_use]
    pub fn new(kind: ActivityKind, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            description: description.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Bounded most-recent-first list of [`ActivityEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityFeed {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }
}

impl ActivityFeed {
    /// Create an empty feed holding at most `capacity` entries, clamped to
    /// `1..=MAX_FEED_CAPACITY`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_FEED_CAPACITY);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild a feed from stored entries, assumed newest first.
    #[must_use]
    pub fn from_entries(entries: Vec<ActivityEntry>, capacity: usize) -> Self {
        let mut feed = Self::with_capacity(capacity);
        feed.entries = entries.into_iter().take(feed.capacity).collect();
        feed
    }

    /// Add an entry at the front, evicting the oldest if full.
    pub fn push(&mut self, entry: ActivityEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    /// Owned copy of the entries, newest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the feed is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
