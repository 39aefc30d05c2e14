//! `loopcheck` - Customer loop and daily task tracking for facility inspections
//!
//! This library provides the timed customer loop session, the daily role
//! checklist, before/after photo evidence, the recent activity feed and the
//! key/value persistence that keeps all of it across restarts.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod activity;
pub mod capture;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod daily;
pub mod dashboard;
pub mod error;
pub mod gallery;
pub mod logging;
pub mod persist;
pub mod photo;
pub mod report;
pub mod session;
pub mod storage;

pub use activity::{ActivityEntry, ActivityFeed, ActivityKind};
pub use capture::{CaptureError, FileCapture, PhotoCapture};
pub use config::Config;
pub use daily::DailyChecklist;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use persist::StateStore;
pub use photo::{Phase, PhotoKey, PhotoMap, PhotoPayload};
pub use session::{Session, SessionController, SessionEvent};
pub use storage::{MemoryStore, SqliteStore, StorageError, Store};
