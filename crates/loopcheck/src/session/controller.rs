//! Live owner of the current session.
//!
//! The controller holds the [`Session`] behind one async mutex, runs a
//! single ticker task while the clock is running, persists after every
//! change and broadcasts [`SessionEvent`]s to subscribers.
//!
//! Lock order is ticker slot first, then session. Every tick re-checks
//! under the session lock that the clock is running and that its epoch is
//! current; `stop` bumps the epoch under the same lock, so no tick lands
//! after `stop` returns.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::activity::{ActivityEntry, ActivityFeed, ActivityKind, DEFAULT_FEED_CAPACITY};
use crate::capture::{capture_with_timeout, CaptureError, CaptureRequest, PhotoCapture};
use crate::catalog;
use crate::error::{Error, Result};
use crate::persist::StateStore;
use crate::photo::{Phase, PhotoKey, PhotoPayload};
use crate::report::format_elapsed;
use crate::storage::StorageError;

use super::state::{LoopCompletion, Session, SessionStatus, TaskCompletion};
use super::SessionEvent;

/// Tunables for a [`SessionController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Time between ticks. Each tick adds one second of elapsed time, so
    /// anything but one second only makes sense in tests.
    pub tick_interval: Duration,
    /// Capacity of the event channel.
    pub event_buffer: usize,
    /// Entries kept in the activity feed.
    pub feed_capacity: usize,
    /// Upper bound on a single photo capture.
    pub capture_timeout: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            event_buffer: 64,
            feed_capacity: DEFAULT_FEED_CAPACITY,
            capture_timeout: Duration::from_secs(30),
        }
    }
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Current loop number.
    pub loop_number: u32,
    /// Idle, running or paused.
    pub status: SessionStatus,
    /// Elapsed seconds.
    pub elapsed_seconds: u64,
    /// Tasks per loop.
    pub task_count: usize,
    /// Completed task indices, ascending.
    pub completed: Vec<usize>,
    /// Notes by task index.
    pub notes: BTreeMap<usize, String>,
    /// Keys of the stored photos.
    pub photos: Vec<String>,
    /// Recent activity, newest first.
    pub activity: Vec<ActivityEntry>,
    /// Last non-fatal failure (capture or storage), cleared by reset.
    pub last_error: Option<String>,
}

/// Result of [`SessionController::capture_photo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The photo was stored.
    Attached {
        /// The slot that was filled.
        key: PhotoKey,
        /// `false` when it replaced an existing photo.
        added: bool,
    },
    /// The source failed; nothing changed.
    Failed(CaptureError),
}

#[derive(Debug)]
struct Inner {
    session: Session,
    feed: ActivityFeed,
    epoch: u64,
    last_error: Option<String>,
}

/// Single owner of the live session.
#[derive(Debug, Clone)]
pub struct SessionController {
    inner: Arc<Mutex<Inner>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    state: StateStore,
    events: broadcast::Sender<SessionEvent>,
    options: ControllerOptions,
}

impl SessionController {
    /// Restore the session and feed from `state`.
    #[must_use]
    pub fn open(state: StateStore, options: ControllerOptions) -> Self {
        let session = state.load_session(catalog::loop_task_count());
        let feed = state.load_feed(options.feed_capacity);
        Self::with_session(state, session, feed, options)
    }

    /// Build a controller around an existing session.
    #[must_use]
    pub fn with_session(
        state: StateStore,
        session: Session,
        feed: ActivityFeed,
        options: ControllerOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(options.event_buffer.max(1));
        Self {
            inner: Arc::new(Mutex::new(Inner {
                session,
                feed,
                epoch: 0,
                last_error: None,
            })),
            ticker: Arc::new(Mutex::new(None)),
            state,
            events,
            options,
        }
    }

    /// Receive future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Current state.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        let session = &inner.session;
        SessionSnapshot {
            loop_number: session.session_number(),
            status: session.status(),
            elapsed_seconds: session.elapsed_seconds(),
            task_count: session.task_count(),
            completed: session.completed().iter().copied().collect(),
            notes: session.notes().clone(),
            photos: session.photos().iter().map(|(k, _)| k.to_string()).collect(),
            activity: inner.feed.to_vec(),
            last_error: inner.last_error.clone(),
        }
    }

    /// Copy of the current session.
    pub async fn session(&self) -> Session {
        self.inner.lock().await.session.clone()
    }

    /// Start the clock. Returns `false` if it was already running.
    pub async fn start(&self) -> bool {
        let mut ticker = self.ticker.lock().await;
        let epoch = {
            let mut inner = self.inner.lock().await;
            if !inner.session.start() {
                return false;
            }
            inner.epoch += 1;
            self.save_loop_state(&mut inner);
            inner.epoch
        };

        if let Some(old) = ticker.take() {
            old.abort();
        }
        *ticker = Some(self.spawn_ticker(epoch));

        info!("Loop clock started");
        self.emit(SessionEvent::Started);
        true
    }

    /// Restart the ticker for a session restored in the running state.
    ///
    /// Returns `true` if a ticker was started.
    pub async fn resume_if_running(&self) -> bool {
        let mut ticker = self.ticker.lock().await;
        if ticker.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }
        let epoch = {
            let mut inner = self.inner.lock().await;
            if !inner.session.is_running() {
                return false;
            }
            inner.epoch += 1;
            inner.epoch
        };
        *ticker = Some(self.spawn_ticker(epoch));
        debug!(epoch, "resumed ticker");
        true
    }

    /// Stop the clock. Returns `false` if it was already stopped.
    pub async fn stop(&self) -> bool {
        let mut ticker = self.ticker.lock().await;
        let stopped = {
            let mut inner = self.inner.lock().await;
            inner.epoch += 1;
            let stopped = inner.session.stop();
            if stopped {
                self.save_loop_state(&mut inner);
            }
            stopped
        };
        if let Some(handle) = ticker.take() {
            handle.abort();
        }

        if stopped {
            info!("Loop clock stopped");
            self.emit(SessionEvent::Stopped);
        }
        stopped
    }

    /// Back to idle, keeping the loop number.
    pub async fn reset(&self) {
        self.reset_with(Session::reset).await;
        info!("Loop reset");
    }

    /// Back to idle with the loop number set to 1.
    pub async fn reset_counter(&self) {
        self.reset_with(Session::reset_counter).await;
        info!("Loop counter reset");
    }

    async fn reset_with(&self, reset: impl FnOnce(&mut Session)) {
        let mut ticker = self.ticker.lock().await;
        {
            let mut inner = self.inner.lock().await;
            inner.epoch += 1;
            reset(&mut inner.session);
            inner.last_error = None;
            self.save_session(&mut inner);
        }
        if let Some(handle) = ticker.take() {
            handle.abort();
        }
        self.emit(SessionEvent::Reset);
    }

    /// Mark a loop task complete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTaskIndex`] if `index` is out of range.
    pub async fn complete_task(&self, index: usize) -> Result<TaskCompletion> {
        let mut ticker = self.ticker.lock().await;
        let mut inner = self.inner.lock().await;
        let result = inner.session.complete_task(index)?;

        if result.newly_completed {
            let area = catalog::loop_task(index).map_or("Task", |t| t.area);
            inner.feed.push(ActivityEntry::new(
                ActivityKind::Task,
                "Loop Task Completed",
                format!("{area} inspected"),
            ));
            debug!(index, area, "task completed");
            self.emit(SessionEvent::TaskCompleted { index });
        }

        if let Some(done) = result.loop_completed {
            self.finish_loop(&mut inner, done);
            if let Some(handle) = ticker.take() {
                handle.abort();
            }
            self.save_session(&mut inner);
        } else {
            self.save_loop_state(&mut inner);
        }
        if result.newly_completed || result.loop_completed.is_some() {
            self.save_feed(&mut inner);
        }
        Ok(result)
    }

    /// Replace a task's note.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTaskIndex`] if `index` is out of range.
    pub async fn set_note(&self, index: usize, text: impl Into<String>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.session.set_note(index, text)?;
        self.save_loop_state(&mut inner);
        self.emit(SessionEvent::NoteUpdated { index });
        Ok(())
    }

    /// Store a photo, overwriting any existing one at the key.
    ///
    /// Returns `true` if the key was newly added.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTaskIndex`] if the key's task is out of range.
    pub async fn attach_photo(&self, key: PhotoKey, payload: PhotoPayload) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let added = inner.session.attach_photo(key, payload)?;

        let count = usize::from(added);
        let plural = if count == 1 { "" } else { "s" };
        inner.feed.push(ActivityEntry::new(
            ActivityKind::Photo,
            "Photos Uploaded",
            format!("{count} inspection photo{plural} added to system"),
        ));
        inner.last_error = None;
        debug!(%key, added, "photo attached");

        self.save_photos(&mut inner);
        self.save_feed(&mut inner);
        self.emit(SessionEvent::PhotoAttached { key, added });
        Ok(added)
    }

    /// Capture a photo from `source` and attach it.
    ///
    /// A failed capture is not an error: it is returned as
    /// [`CaptureOutcome::Failed`], broadcast, and kept as the snapshot's
    /// `last_error`. The existing photo at the key is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTaskIndex`] if `index` is out of range.
    pub async fn capture_photo(
        &self,
        index: usize,
        phase: Phase,
        source: &dyn PhotoCapture,
    ) -> Result<CaptureOutcome> {
        let task_count = self.inner.lock().await.session.task_count();
        if index >= task_count {
            return Err(Error::invalid_task_index(index, task_count));
        }

        let key = PhotoKey::new(index, phase);
        let request = CaptureRequest { key };
        match capture_with_timeout(source, request, self.options.capture_timeout).await {
            Ok(payload) => {
                let added = self.attach_photo(key, payload).await?;
                Ok(CaptureOutcome::Attached { key, added })
            }
            Err(err) => {
                warn!(%key, source = source.name(), error = %err, "Photo capture failed");
                self.inner.lock().await.last_error = Some(err.user_message());
                self.emit(SessionEvent::CaptureFailed {
                    reason: err.to_string(),
                });
                Ok(CaptureOutcome::Failed(err))
            }
        }
    }

    /// Remove one photo. Returns `false` if there was none.
    pub async fn remove_photo(&self, key: PhotoKey) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.session.remove_photo(key).is_none() {
            return false;
        }
        self.save_photos(&mut inner);
        self.emit(SessionEvent::PhotoRemoved { key });
        true
    }

    /// Remove every photo. Returns how many were removed.
    pub async fn clear_photos(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let keys: Vec<PhotoKey> = inner.session.photos().iter().map(|(k, _)| k).collect();
        inner.session.clear_photos();
        self.save_photos(&mut inner);
        for key in &keys {
            self.emit(SessionEvent::PhotoRemoved { key: *key });
        }
        keys.len()
    }

    /// Stop the ticker without changing the session and flush it to storage.
    ///
    /// The running flag stays set, so the next [`SessionController::open`]
    /// followed by [`SessionController::resume_if_running`] picks up where
    /// this one left off.
    pub async fn shutdown(&self) {
        let mut ticker = self.ticker.lock().await;
        {
            let mut inner = self.inner.lock().await;
            inner.epoch += 1;
            self.save_session(&mut inner);
            self.save_feed(&mut inner);
        }
        if let Some(handle) = ticker.take() {
            handle.abort();
        }
        debug!("session controller shut down");
    }

    fn spawn_ticker(&self, epoch: u64) -> JoinHandle<()> {
        let controller = self.clone();
        let period = self.options.tick_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if !controller.tick_once(epoch).await {
                    break;
                }
            }
            debug!(epoch, "ticker finished");
        })
    }

    /// Apply one tick. Returns `false` when the ticker should exit.
    async fn tick_once(&self, epoch: u64) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch || !inner.session.is_running() {
            return false;
        }

        let completion = inner.session.tick();
        let elapsed = completion.map_or(inner.session.elapsed_seconds(), |done| {
            done.elapsed_seconds
        });
        self.emit(SessionEvent::Tick { elapsed });

        if let Some(done) = completion {
            self.finish_loop(&mut inner, done);
            self.save_session(&mut inner);
            self.save_feed(&mut inner);
            return false;
        }
        self.save_loop_state(&mut inner);
        true
    }

    fn finish_loop(&self, inner: &mut Inner, done: LoopCompletion) {
        inner.epoch += 1;
        let task_count = inner.session.task_count();
        inner.feed.push(ActivityEntry::new(
            ActivityKind::Loop,
            format!("Customer Loop #{} Completed", done.finished),
            format!(
                "All {task_count} areas inspected in {}",
                format_elapsed(done.elapsed_seconds)
            ),
        ));
        info!(
            finished = done.finished,
            next = done.next,
            elapsed = done.elapsed_seconds,
            photos = done.photo_count,
            "Customer loop completed"
        );
        self.emit(SessionEvent::LoopCompleted(done));
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn record(&self, inner: &mut Inner, result: std::result::Result<(), StorageError>) {
        if let Err(err) = result {
            warn!(error = %err, "Failed to persist session");
            let message = err.to_string();
            inner.last_error = Some(message.clone());
            self.emit(SessionEvent::StorageFailed { message });
        }
    }

    fn save_loop_state(&self, inner: &mut Inner) {
        let result = self.state.save_loop_state(&inner.session.to_loop_state());
        self.record(inner, result);
    }

    fn save_photos(&self, inner: &mut Inner) {
        let result = self.state.save_photos(inner.session.photos());
        self.record(inner, result);
    }

    fn save_session(&self, inner: &mut Inner) {
        let result = self.state.save_session(&inner.session);
        self.record(inner, result);
    }

    fn save_feed(&self, inner: &mut Inner) {
        let result = self.state.save_feed(&inner.feed);
        self.record(inner, result);
    }
}
