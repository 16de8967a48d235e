//! CLI module for remake
//!
//! [`run_cli`] parses flags and targets, layers them over the persistent
//! settings, sets up logging and executes the requested targets on a
//! populated [`Make`].

pub mod commands;

use std::ffi::OsString;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, FromArgMatches};

use crate::config::load_settings;
use crate::logging::init_logging;
use crate::make::Make;

pub use commands::{targets_help, Cli};

/// Parse `args` (including the program name) and run the requested targets.
///
/// Returns `Ok(true)` on success, `Ok(false)` after a reported failure, and
/// `Err` for invalid arguments or unexpected errors. `--help` and
/// `--version` print and return `Ok(true)`.
pub async fn run_cli<I, T>(make: &mut Make, args: I) -> Result<bool>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = Cli::command();
    if let Some(help) = targets_help(make.descriptions()) {
        command = command.after_help(help);
    }

    let matches = match command.try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(true);
        }
        Err(e) => return Err(e.into()),
    };
    let cli = Cli::from_arg_matches(&matches)?;

    let settings = load_settings(cli.config.as_deref())?.merge_flags(
        cli.serial,
        cli.instant,
        cli.verbose,
        cli.silent,
    );

    if !settings.silent {
        init_logging(settings.verbose, settings.log_format);
    }

    Ok(make.execute(cli.groups(), settings.to_config()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_help_returns_success() {
        let mut make = Make::new();
        make.describe("build", "Build everything");
        assert!(run_cli(&mut make, ["remake", "--help"]).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_flag_is_error() {
        let mut make = Make::new();
        assert!(run_cli(&mut make, ["remake", "--bogus"]).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_target_reports_failure() {
        let mut make = Make::new();
        let ok = run_cli(&mut make, ["remake", "-s", "nothing-here"]).await.unwrap();
        assert!(!ok);
    }
}
