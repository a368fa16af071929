//! Command-line definitions for the `npm-exports` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::LogLevel;

/// Top-level CLI entry point for the npm exports engine.
#[derive(Parser, Debug)]
#[command(
    name = "npm-exports",
    about = "Curate files from node_modules packages into a publishing tree",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    #[allow(missing_docs)]
    pub command: Command,

    /// Enable verbose output (same as --log-level debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub global: GlobalOpts,
}

impl Cli {
    /// Effective minimum log level.
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else {
            self.global.log_level
        }
    }
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Minimum log level, by name (debug, information, warning, success, error) or 0-4
    #[arg(long, global = true, default_value = "warning")]
    pub log_level: LogLevel,

    /// Path of the package.json declaring the dependencies
    #[arg(short, long, global = true, default_value = "package.json")]
    pub manifest: PathBuf,

    /// Read the exports document from this file instead of the manifest's npmExports section
    #[arg(short, long, global = true)]
    pub exports_file: Option<PathBuf>,

    /// Resolve exports sequentially (parallel is enabled by default)
    #[arg(long = "no-parallel", global = true, action = clap::ArgAction::SetFalse)]
    pub parallel: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every export and write the resulting files
    Run(RunOpts),
    /// Resolve every export and print the plan without touching files
    Check,
    /// Print version information
    Version,
}

/// Options for the `run` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RunOpts {
    /// Destination directory for exported files
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// List destinations without writing anything
    #[arg(short = 'd', long)]
    pub dry_run: bool,
}
