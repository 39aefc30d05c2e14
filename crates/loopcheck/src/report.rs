//! Plain-text reports.

use chrono::NaiveDateTime;

use crate::catalog::{self, ALL_CATEGORIES};
use crate::daily::DailyChecklist;
use crate::session::Session;

/// Format seconds as `MM:SS`, or `H:MM:SS` from one hour up.
#[must_use]
pub fn format_elapsed(seconds: u64) -> String {
    let (hours, minutes, secs) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

fn bullet_list(lines: Vec<String>, empty: &str) -> Vec<String> {
    if lines.is_empty() {
        vec![empty.to_string()]
    } else {
        lines.into_iter().map(|line| format!("• {line}")).collect()
    }
}

/// Report for the current customer loop.
#[must_use]
pub fn loop_report(session: &Session, now: NaiveDateTime) -> String {
    let task_count = session.task_count();
    let (done, open): (Vec<_>, Vec<_>) = catalog::LOOP_TASKS
        .iter()
        .enumerate()
        .take(task_count)
        .partition(|(index, _)| session.is_completed(*index));
    let describe = |(_, task): (usize, &catalog::LoopTask)| format!("{} ({})", task.area, task.location);

    let notes: Vec<String> = session
        .notes()
        .iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| {
            let area = catalog::loop_task(*index).map_or("Unknown Task", |t| t.area);
            format!("{area}: {text}")
        })
        .collect();

    let mut out = vec![
        format!("Customer Loop #{} Report", session.session_number()),
        String::new(),
        format!("Date: {}", now.format("%Y-%m-%d")),
        format!("Time: {}", now.format("%H:%M:%S")),
        format!("Status: {}", session.status()),
        format!("Elapsed: {}", format_elapsed(session.elapsed_seconds())),
        format!("Tasks Completed: {}/{task_count}", done.len()),
        format!("Photos: {}", session.photos().len()),
        String::new(),
        "Completed Tasks:".to_string(),
    ];
    out.extend(bullet_list(
        done.into_iter().map(describe).collect(),
        "No tasks completed",
    ));
    out.push(String::new());
    out.push("Remaining Tasks:".to_string());
    out.extend(bullet_list(
        open.into_iter().map(describe).collect(),
        "All tasks completed",
    ));
    out.push(String::new());
    out.push("Notes:".to_string());
    if notes.is_empty() {
        out.push("No notes recorded".to_string());
    } else {
        out.extend(notes);
    }
    out.join("\n") + "\n"
}

/// Daily role guide report.
///
/// Totals cover the whole catalog; `category` is shown as the active
/// filter.
#[must_use]
pub fn daily_report(checklist: &DailyChecklist, category: Option<&str>, now: NaiveDateTime) -> String {
    let progress = checklist.progress();
    let completed: Vec<String> = catalog::DAILY_TASKS
        .iter()
        .filter(|task| checklist.is_completed(task.id))
        .map(|task| format!("{} ({})", task.title, task.location))
        .collect();
    let notes: Vec<String> = checklist
        .notes()
        .iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(id, text)| {
            let title = catalog::daily_task(*id).map_or("Unknown Task", |t| t.title);
            format!("{title}: {text}")
        })
        .collect();

    let mut out = vec![
        "Facilities Daily Role Guide Report".to_string(),
        String::new(),
        format!("Date: {}", now.format("%Y-%m-%d")),
        format!("Time: {}", now.format("%H:%M:%S")),
        format!("Tasks Completed: {}/{}", progress.completed, progress.total),
        format!("Progress: {}%", progress.percent),
        format!("Active Category: {}", category.unwrap_or(ALL_CATEGORIES)),
        String::new(),
        "Completed Tasks:".to_string(),
    ];
    out.extend(bullet_list(completed, "No tasks completed"));
    out.push(String::new());
    out.push("Notes:".to_string());
    if notes.is_empty() {
        out.push("No notes recorded".to_string());
    } else {
        out.extend(notes);
    }
    out.join("\n") + "\n"
}
