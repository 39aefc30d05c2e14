//! Dashboard summary.

use serde::Serialize;

use crate::activity::{ActivityEntry, ActivityFeed};
use crate::daily::{DailyChecklist, Progress};
use crate::gallery::{self, GallerySummary};
use crate::report::format_elapsed;
use crate::session::{Session, SessionStatus};

/// Everything the dashboard shows, in one serializable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    /// Current loop number.
    pub loop_number: u32,
    /// Loop clock state.
    pub loop_status: SessionStatus,
    /// Elapsed seconds in the current loop.
    pub elapsed_seconds: u64,
    /// Elapsed time as `MM:SS`.
    pub elapsed: String,
    /// Loop tasks done.
    pub loop_progress: Progress,
    /// Daily tasks done.
    pub daily_progress: Progress,
    /// Photo totals.
    pub photos: GallerySummary,
    /// Recent activity, newest first.
    pub recent_activity: Vec<ActivityEntry>,
}

impl DashboardSummary {
    /// Build the summary from the current state.
    #[must_use]
    pub fn collect(session: &Session, daily: &DailyChecklist, feed: &ActivityFeed) -> Self {
        Self {
            loop_number: session.session_number(),
            loop_status: session.status(),
            elapsed_seconds: session.elapsed_seconds(),
            elapsed: format_elapsed(session.elapsed_seconds()),
            loop_progress: Progress::new(session.completed().len(), session.task_count()),
            daily_progress: daily.progress(),
            photos: gallery::summarize(session.photos()),
            recent_activity: feed.to_vec(),
        }
    }

    /// Multi-line text rendering.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = vec![
            "Facilities Dashboard".to_string(),
            String::new(),
            format!(
                "Customer Loop #{} ({}, {})",
                self.loop_number, self.loop_status, self.elapsed
            ),
            format!(
                "  Loop tasks:  {}/{} ({}%)",
                self.loop_progress.completed, self.loop_progress.total, self.loop_progress.percent
            ),
            format!(
                "  Daily tasks: {}/{} ({}%)",
                self.daily_progress.completed, self.daily_progress.total, self.daily_progress.percent
            ),
            format!(
                "  Photos:      {} ({} KB, {} complete pairs)",
                self.photos.total_photos, self.photos.total_size_kb, self.photos.complete_pairs
            ),
            String::new(),
            "Recent Activity".to_string(),
        ];
        if self.recent_activity.is_empty() {
            lines.push("  No recent activity".to_string());
        }
        for entry in &self.recent_activity {
            lines.push(format!(
                "  [{}] {} - {} ({})",
                entry.kind,
                entry.title,
                entry.description,
                entry.timestamp.format("%Y-%m-%d %H:%M")
            ));
        }
        lines.join("\n") + "\n"
    }
}
