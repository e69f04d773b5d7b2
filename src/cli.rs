// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::FailurePolicy;

/// Command-line arguments for `scrapedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scrapedag",
    version,
    about = "Run scrape tasks concurrently in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SCRAPEDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run every configured task, respecting `after` dependencies.
    Run {
        /// Path to the config file (TOML).
        ///
        /// Default: `Scrapedag.toml` in the current working directory.
        #[arg(long, value_name = "PATH", default_value = "Scrapedag.toml")]
        config: PathBuf,

        /// Parse + validate, print the task graph, but don't run anything.
        #[arg(long)]
        dry_run: bool,

        /// What to do with dependents of a failed task (unblock, skip).
        ///
        /// Overrides `[runner].on_failure`.
        #[arg(long, value_name = "POLICY")]
        on_failure: Option<FailurePolicy>,
    },

    /// Create a new project skeleton in DIR.
    New {
        /// Directory to create. Must not exist yet.
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
