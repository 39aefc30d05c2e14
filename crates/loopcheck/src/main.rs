//! `loopchk` - CLI for loopcheck
//!
//! This binary provides the command-line interface for timing customer loops,
//! keeping the daily role checklist and managing inspection photos.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{Local, Utc};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use loopcheck::catalog::{self, ALL_CATEGORIES, DAILY_CATEGORIES};
use loopcheck::cli::{
    parse_interactive, Cli, Command, ConfigCommand, DailyCommand, DashboardCommand,
    InteractiveCommand, LoopCommand, PhotosCommand, HELP,
};
use loopcheck::daily::{self, Toggle};
use loopcheck::dashboard::DashboardSummary;
use loopcheck::photo::Phase;
use loopcheck::report::{self, format_elapsed};
use loopcheck::session::{CaptureOutcome, SessionEvent, SessionSnapshot};
use loopcheck::{
    gallery, init_logging, Config, FileCapture, SessionController, SqliteStore, StateStore,
};

/// Opened database plus the configuration it was opened with.
#[derive(Debug)]
struct App {
    config: Config,
    state: StateStore,
}

impl App {
    fn open(config: Config) -> anyhow::Result<Self> {
        let path = config.database_path();
        let store = SqliteStore::open(&path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        Ok(Self {
            config,
            state: StateStore::new(Arc::new(store)),
        })
    }

    fn controller(&self) -> SessionController {
        SessionController::open(self.state.clone(), self.config.controller_options())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Validation reports its own load errors
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        let path = file.clone().or_else(|| cli.config.clone());
        validate_config(path.as_deref());
        return Ok(());
    }

    let config =
        Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        Command::Loop(cmd) => handle_loop(&App::open(config)?, cmd).await,
        Command::Daily(cmd) => handle_daily(&App::open(config)?, cmd),
        Command::Photos(cmd) => handle_photos(&App::open(config)?, cmd).await,
        Command::Dashboard(cmd) => handle_dashboard(&App::open(config)?, &cmd),
    }
}

// === Customer loop ===

async fn handle_loop(app: &App, cmd: LoopCommand) -> anyhow::Result<()> {
    let controller = app.controller();
    match cmd {
        LoopCommand::Run => return run_interactive(app, &controller).await,
        LoopCommand::Status { json } => {
            let snapshot = controller.snapshot().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_loop_status(&snapshot);
            }
        }
        LoopCommand::Complete { index } => complete_task(&controller, index).await?,
        LoopCommand::Note { index, text } => set_note(&controller, index, text).await?,
        LoopCommand::Photo { index, phase, file } => {
            attach_photo(app, &controller, index, phase.into(), &file).await?;
        }
        LoopCommand::Reset => {
            controller.reset().await;
            println!("Loop reset. Tasks, notes and photos cleared.");
        }
        LoopCommand::ResetCounter => {
            controller.reset_counter().await;
            println!("Loop reset. Numbering restarts at #1.");
        }
        LoopCommand::Report => {
            let session = controller.session().await;
            println!("{}", report::loop_report(&session, Local::now().naive_local()));
        }
    }

    warn_last_error(&controller).await;
    Ok(())
}

fn print_loop_status(snapshot: &SessionSnapshot) {
    println!(
        "Customer Loop #{}  {}  {}",
        snapshot.loop_number,
        snapshot.status,
        format_elapsed(snapshot.elapsed_seconds)
    );
    println!(
        "Tasks: {}/{}",
        snapshot.completed.len(),
        snapshot.task_count
    );
    println!();

    for (index, task) in catalog::LOOP_TASKS.iter().enumerate() {
        let mark = if snapshot.completed.contains(&index) {
            "x"
        } else {
            " "
        };
        println!("  [{mark}] {index}  {} ({})", task.area, task.location);
        if let Some(note) = snapshot.notes.get(&index) {
            println!("        note: {note}");
        }
        let phases: Vec<&str> = [Phase::Before, Phase::After]
            .into_iter()
            .filter(|phase| snapshot.photos.contains(&format!("{index}-{phase}")))
            .map(Phase::label)
            .collect();
        if !phases.is_empty() {
            println!("        photos: {}", phases.join(", "));
        }
    }
}

async fn complete_task(controller: &SessionController, index: usize) -> anyhow::Result<()> {
    let completion = controller.complete_task(index).await?;
    let area = catalog::loop_task(index).map_or("task", |task| task.area);

    if let Some(done) = completion.loop_completed {
        println!(
            "Customer Loop #{} completed in {}. Starting loop #{}.",
            done.finished,
            format_elapsed(done.elapsed_seconds),
            done.next
        );
    } else if completion.newly_completed {
        let snapshot = controller.snapshot().await;
        println!(
            "{area} inspected ({}/{})",
            snapshot.completed.len(),
            snapshot.task_count
        );
    } else {
        println!("{area} was already inspected.");
    }
    Ok(())
}

async fn set_note(
    controller: &SessionController,
    index: usize,
    text: String,
) -> anyhow::Result<()> {
    let cleared = text.is_empty();
    controller.set_note(index, text).await?;
    if cleared {
        println!("Note cleared for task {index}.");
    } else {
        println!("Note saved for task {index}.");
    }
    Ok(())
}

async fn attach_photo(
    app: &App,
    controller: &SessionController,
    index: usize,
    phase: Phase,
    file: &Path,
) -> anyhow::Result<()> {
    let source = FileCapture::new(
        file,
        app.config.capture.accepted_types.clone(),
        app.config.capture.max_photo_bytes,
    );

    match controller.capture_photo(index, phase, &source).await? {
        CaptureOutcome::Attached { key, added } => {
            let verb = if added { "Attached" } else { "Replaced" };
            println!("{verb} {phase} photo {key}.");
            Ok(())
        }
        CaptureOutcome::Failed(err) => bail!("{}", err.user_message()),
    }
}

async fn warn_last_error(controller: &SessionController) {
    if let Some(message) = controller.snapshot().await.last_error {
        eprintln!("warning: {message}");
    }
}

// === Interactive mode ===

async fn run_interactive(app: &App, controller: &SessionController) -> anyhow::Result<()> {
    let mut events = controller.subscribe();

    if controller.resume_if_running().await {
        println!("Resumed running loop.");
    }
    println!("{HELP}");
    println!();
    print_loop_status(&controller.snapshot().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    break;
                };
                match parse_interactive(&line) {
                    Ok(InteractiveCommand::Quit) => break,
                    Ok(command) => {
                        if let Err(err) = execute(app, controller, command).await {
                            eprintln!("error: {err:#}");
                        }
                    }
                    Err(message) => eprintln!("{message}"),
                }
            }
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "event receiver lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c => {
                println!();
                break;
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}

async fn execute(
    app: &App,
    controller: &SessionController,
    command: InteractiveCommand,
) -> anyhow::Result<()> {
    match command {
        InteractiveCommand::Start => {
            if !controller.start().await {
                println!("The clock is already running.");
            }
        }
        InteractiveCommand::Stop => {
            if !controller.stop().await {
                println!("The clock is not running.");
            }
        }
        InteractiveCommand::Reset => controller.reset().await,
        InteractiveCommand::Done(index) => complete_task(controller, index).await?,
        InteractiveCommand::Note(index, text) => set_note(controller, index, text).await?,
        InteractiveCommand::Photo(index, phase, file) => {
            attach_photo(app, controller, index, phase, &file).await?;
        }
        InteractiveCommand::Status => print_loop_status(&controller.snapshot().await),
        InteractiveCommand::Help => println!("{HELP}"),
        InteractiveCommand::Empty | InteractiveCommand::Quit => {}
    }
    Ok(())
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Started => println!("Clock started."),
        SessionEvent::Stopped => println!("Clock stopped."),
        SessionEvent::Reset => println!("Loop reset."),
        SessionEvent::Tick { elapsed } if elapsed % 60 == 0 => {
            println!("{} elapsed", format_elapsed(*elapsed));
        }
        SessionEvent::StorageFailed { message } => eprintln!("warning: {message}"),
        SessionEvent::CaptureFailed { reason } => debug!(%reason, "capture failed"),
        // Command output already covers the rest
        _ => {}
    }
}

// === Daily role guide ===

fn check_category(category: Option<&str>) -> anyhow::Result<()> {
    if let Some(name) = category {
        let known = name.eq_ignore_ascii_case(ALL_CATEGORIES)
            || DAILY_CATEGORIES.iter().any(|c| c.eq_ignore_ascii_case(name));
        if !known {
            bail!(
                "unknown category '{name}' (expected one of: {})",
                DAILY_CATEGORIES.join(", ")
            );
        }
    }
    Ok(())
}

fn handle_daily(app: &App, cmd: DailyCommand) -> anyhow::Result<()> {
    let mut checklist = app.state.load_daily();

    match cmd {
        DailyCommand::List { category, json } => {
            check_category(category.as_deref())?;
            let tasks: Vec<_> = catalog::daily_tasks_in(category.as_deref()).collect();
            let progress = checklist.progress_in(category.as_deref());

            if json {
                let items: Vec<_> = tasks
                    .iter()
                    .map(|task| {
                        serde_json::json!({
                            "task": task,
                            "completed": checklist.is_completed(task.id),
                            "note": checklist.note(task.id),
                        })
                    })
                    .collect();
                let output = serde_json::json!({ "progress": progress, "tasks": items });
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            let mut current = "";
            for task in tasks {
                if task.category != current {
                    current = task.category;
                    println!();
                    println!("{current}");
                }
                let mark = if checklist.is_completed(task.id) {
                    "x"
                } else {
                    " "
                };
                println!(
                    "  [{mark}] {:>2}  {} ({}; {}; {})",
                    task.id, task.title, task.location, task.frequency, task.priority
                );
                if let Some(note) = checklist.note(task.id) {
                    println!("          note: {note}");
                }
            }
            println!();
            println!(
                "Progress: {}/{} ({}%)",
                progress.completed, progress.total, progress.percent
            );
        }
        DailyCommand::Toggle { id } => {
            let (toggle, task) = checklist.toggle(id)?;
            app.state
                .save_daily(&checklist)
                .context("failed to save daily checklist")?;
            match toggle {
                Toggle::Completed => {
                    let entry = daily::completion_entry(task);
                    let capacity = app.config.activity.feed_capacity;
                    if let Err(err) = app.state.append_activity(entry, capacity) {
                        warn!(error = %err, "failed to record activity");
                    }
                    println!("Completed: {}", task.title);
                }
                Toggle::Reopened => println!("Reopened: {}", task.title),
            }
        }
        DailyCommand::Note { id, text } => {
            let cleared = text.is_empty();
            checklist.set_note(id, text)?;
            app.state
                .save_daily(&checklist)
                .context("failed to save daily checklist")?;
            if cleared {
                println!("Note cleared for daily task {id}.");
            } else {
                println!("Note saved for daily task {id}.");
            }
        }
        DailyCommand::Report { category } => {
            check_category(category.as_deref())?;
            println!(
                "{}",
                report::daily_report(&checklist, category.as_deref(), Local::now().naive_local())
            );
        }
    }
    Ok(())
}

// === Photos ===

async fn handle_photos(app: &App, cmd: PhotosCommand) -> anyhow::Result<()> {
    match cmd {
        PhotosCommand::List { json } => {
            let photos = app.state.load_photos();
            let listing = gallery::list(&photos, Utc::now());
            let summary = gallery::summarize(&photos);

            if json {
                let output = serde_json::json!({ "summary": summary, "photos": listing });
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            if listing.is_empty() {
                println!("No photos yet. Attach one with `loopchk loop photo`.");
                return Ok(());
            }
            for photo in &listing {
                println!(
                    "  {:<10} {:<7} {:>6} KB  {}",
                    photo.id, photo.label, photo.size_kb, photo.location
                );
            }
            println!();
            println!(
                "{} photos, {} KB ({} before, {} after, {} complete pairs)",
                summary.total_photos,
                summary.total_size_kb,
                summary.before,
                summary.after,
                summary.complete_pairs
            );
        }
        PhotosCommand::Export { dir, keys } => {
            let keys = gallery::parse_keys(keys.as_slice())?;
            let photos = app.state.load_photos();
            let written = gallery::export(&photos, &keys, &dir, Utc::now())
                .await
                .with_context(|| format!("failed to export photos to {}", dir.display()))?;
            for path in &written {
                println!("{}", path.display());
            }
            println!("Exported {} photo(s).", written.len());
        }
        PhotosCommand::Delete { keys } => {
            let keys = gallery::parse_keys(keys.as_slice())?;
            let controller = app.controller();
            let mut removed = 0;
            for key in keys {
                if controller.remove_photo(key).await {
                    removed += 1;
                } else {
                    println!("No photo {key}.");
                }
            }
            println!("Deleted {removed} photo(s).");
            warn_last_error(&controller).await;
        }
        PhotosCommand::Clear { yes } => {
            if !yes {
                println!("This will delete every inspection photo.");
                println!("Use --yes to confirm.");
                return Ok(());
            }
            let controller = app.controller();
            let removed = controller.clear_photos().await;
            println!("Deleted {removed} photo(s).");
            warn_last_error(&controller).await;
        }
    }
    Ok(())
}

// === Dashboard ===

fn handle_dashboard(app: &App, cmd: &DashboardCommand) -> anyhow::Result<()> {
    let session = app.state.load_session(catalog::loop_task_count());
    let checklist = app.state.load_daily();
    let feed = app.state.load_feed(app.config.activity.feed_capacity);
    let summary = DashboardSummary::collect(&session, &checklist, &feed);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.render());
    }
    Ok(())
}

// === Configuration ===

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Session]");
                println!("  Event buffer:       {}", config.session.event_buffer);
                println!();
                println!("[Activity]");
                println!("  Feed capacity:      {}", config.activity.feed_capacity);
                println!();
                println!("[Capture]");
                println!("  Timeout (s):        {}", config.capture.timeout_secs);
                println!("  Max photo bytes:    {}", config.capture.max_photo_bytes);
                println!(
                    "  Accepted types:     {}",
                    config.capture.accepted_types.join(", ")
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => validate_config(file.as_deref()),
    }
    Ok(())
}

fn validate_config(file: Option<&Path>) {
    let path = file.map_or_else(Config::default_config_path, Path::to_path_buf);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
}
