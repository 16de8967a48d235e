//! remake CLI entry point
//!
//! Usage:
//!   remake                  Run the default target from remake.toml
//!   remake build test       Run build and test in parallel
//!   remake clean,build      Run clean, then build
//!   remake -f other.toml    Read definitions from another file

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use remake::cli::{run_cli, Cli};
use remake::config::load_settings;
use remake::definitions::Definitions;

#[tokio::main]
async fn main() -> ExitCode {
    match run(std::env::args().collect()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Vec<String>) -> Result<bool> {
    // Only the file location is needed before the definitions exist; full
    // parsing (and help output) happens in run_cli.
    let early = Cli::try_parse_from(&args).unwrap_or_default();
    let file = match early.file {
        Some(file) => PathBuf::from(file),
        None => PathBuf::from(load_settings(early.config.as_deref())?.file),
    };

    let mut make = if file.exists() {
        Definitions::from_file(&file)?.into_make()?
    } else {
        tracing::debug!("No definitions at {}", file.display());
        Definitions::default().into_make()?
    };

    run_cli(&mut make, args).await
}
