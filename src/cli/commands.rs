//! CLI argument definitions using clap

use clap::Parser;

/// Incremental task and file-rule runner.
///
/// Targets given as separate arguments run in parallel; a comma-separated
/// argument (`clean,build`) runs its targets one after another.
#[derive(Parser, Debug, Default)]
#[command(name = "remake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run dependencies and commands serially
    #[arg(short = 'c', long, visible_alias = "cereal")]
    pub serial: bool,

    /// Stream command output instead of buffering it
    #[arg(short, long)]
    pub instant: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all log output
    #[arg(short, long, conflicts_with = "verbose")]
    pub silent: bool,

    /// Config file path (overrides default XDG paths)
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    /// Definitions file (default: remake.toml)
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<String>,

    /// Targets to build
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
}

impl Cli {
    /// Requested targets as parallel groups of serial names.
    pub fn groups(&self) -> Vec<Vec<String>> {
        self.targets
            .iter()
            .map(|arg| {
                arg.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect()
    }
}

/// Aligned `name  description` lines for the help footer.
pub fn targets_help(descriptions: &[(String, String)]) -> Option<String> {
    if descriptions.is_empty() {
        return None;
    }

    let width = descriptions
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0);

    let mut help = String::from("Targets:\n");
    for (name, description) in descriptions {
        help.push_str(&format!("  {:<width$}  {}\n", name, description, width = width));
    }
    Some(help)
}
