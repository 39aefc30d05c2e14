//! Command-line interface for loopcheck.
//!
//! This module provides the CLI structure for the `loopchk` binary and the
//! line parser used by interactive loop mode.

mod commands;
mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DailyCommand, DashboardCommand, LoopCommand, PhaseArg, PhotosCommand,
};
pub use interactive::{parse_interactive, InteractiveCommand, HELP};

use crate::logging::Verbosity;

/// loopchk - Customer loop and daily task tracker for facility inspections
///
/// Time a walk through the building's customer areas, mark areas inspected,
/// attach before and after photos, and keep the daily role checklist.
#[derive(Debug, Parser)]
#[command(name = "loopchk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Time and track the customer loop
    #[command(subcommand)]
    Loop(LoopCommand),

    /// Daily role guide checklist
    #[command(subcommand)]
    Daily(DailyCommand),

    /// Browse, export or delete inspection photos
    #[command(subcommand)]
    Photos(PhotosCommand),

    /// Show loop, daily and photo totals with recent activity
    Dashboard(DashboardCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli_with(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Dashboard(DashboardCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "loopchk");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(cli_with(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli_with(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli_with(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli_with(3, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_loop_complete() {
        let cli = Cli::try_parse_from(["loopchk", "loop", "complete", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Loop(LoopCommand::Complete { index: 5 })
        ));
    }

    #[test]
    fn test_parse_loop_photo() {
        let cli =
            Cli::try_parse_from(["loopchk", "loop", "photo", "2", "after", "sink.jpg"]).unwrap();
        match cli.command {
            Command::Loop(LoopCommand::Photo { index, phase, file }) => {
                assert_eq!(index, 2);
                assert_eq!(phase, PhaseArg::After);
                assert_eq!(file, PathBuf::from("sink.jpg"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_loop_reset_counter() {
        let cli = Cli::try_parse_from(["loopchk", "loop", "reset-counter"]).unwrap();
        assert!(matches!(cli.command, Command::Loop(LoopCommand::ResetCounter)));
    }

    #[test]
    fn test_parse_daily_list_category() {
        let cli =
            Cli::try_parse_from(["loopchk", "daily", "list", "--category", "Restrooms"]).unwrap();
        match cli.command {
            Command::Daily(DailyCommand::List { category, json }) => {
                assert_eq!(category.as_deref(), Some("Restrooms"));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_photos_delete_requires_keys() {
        assert!(Cli::try_parse_from(["loopchk", "photos", "delete"]).is_err());
        let cli = Cli::try_parse_from(["loopchk", "photos", "delete", "0-before"]).unwrap();
        assert!(matches!(cli.command, Command::Photos(PhotosCommand::Delete { .. })));
    }

    #[test]
    fn test_parse_dashboard_json() {
        let cli = Cli::try_parse_from(["loopchk", "dashboard", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Dashboard(DashboardCommand { json: true })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["loopchk", "-c", "/custom/config.toml", "dashboard"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["loopchk", "loop", "status", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let cli = Cli::try_parse_from(["loopchk", "daily", "report", "-q"]).unwrap();
        assert!(cli.quiet);
    }
}
