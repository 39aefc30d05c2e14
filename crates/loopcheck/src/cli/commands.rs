//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::photo::Phase;

/// Customer loop commands.
#[derive(Debug, Subcommand)]
pub enum LoopCommand {
    /// Run the loop interactively with a live clock
    Run,

    /// Show the current loop
    Status {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Mark a task complete
    Complete {
        /// Task index (0-based, see `loop status`)
        index: usize,
    },

    /// Set the note for a task
    Note {
        /// Task index (0-based)
        index: usize,
        /// Note text; an empty string clears the note
        text: String,
    },

    /// Attach a photo from an image file
    Photo {
        /// Task index (0-based)
        index: usize,
        /// Before or after servicing the area
        #[arg(value_enum)]
        phase: PhaseArg,
        /// Image file (JPEG, PNG or WebP)
        file: PathBuf,
    },

    /// Stop the clock and clear tasks, notes and photos
    Reset,

    /// Reset and restart loop numbering at 1
    ResetCounter,

    /// Print a plain-text loop report
    Report,
}

/// Daily role guide commands.
#[derive(Debug, Subcommand)]
pub enum DailyCommand {
    /// List daily tasks
    List {
        /// Only show one category
        #[arg(long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Complete a task, or re-open it if already complete
    Toggle {
        /// Daily task id
        id: u32,
    },

    /// Set the note for a task
    Note {
        /// Daily task id
        id: u32,
        /// Note text; an empty string clears the note
        text: String,
    },

    /// Print a plain-text daily report
    Report {
        /// Category shown as the active filter
        #[arg(long)]
        category: Option<String>,
    },
}

/// Photo gallery commands.
#[derive(Debug, Subcommand)]
pub enum PhotosCommand {
    /// List stored photos
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Write photos to image files
    Export {
        /// Destination directory
        dir: PathBuf,
        /// Photo ids such as `3-before`; all photos when omitted
        keys: Vec<String>,
    },

    /// Delete selected photos
    Delete {
        /// Photo ids such as `3-before`
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Delete every photo
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Dashboard command arguments.
#[derive(Debug, Args)]
pub struct DashboardCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Photo phase argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhaseArg {
    /// Before servicing the area
    Before,
    /// After servicing the area
    After,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Before => Self::Before,
            PhaseArg::After => Self::After,
        }
    }
}
