//! `npm-exports` entry point.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use npm_exports_cli::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    let command = match &args.command {
        cli::Command::Run(_) => "run",
        cli::Command::Check => "check",
        cli::Command::Version => return commands::version::run(),
    };
    let level = args.log_level();
    logging::init_subscriber(level, command);
    let log = Arc::new(logging::Logger::new(command, level));

    match &args.command {
        cli::Command::Run(opts) => commands::run::run(&args.global, opts, &log),
        cli::Command::Check => commands::check::run(&args.global, &log),
        cli::Command::Version => commands::version::run(),
    }
}
