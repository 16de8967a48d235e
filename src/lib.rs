//! remake - incremental task and file-rule runner
//!
//! Declare named **tasks** (always run) and file **rules** (skipped while their
//! output is up to date), then ask for a target by name:
//!
//! - **Registries** - tasks by name, rules by literal path or glob pattern
//! - **Expansion** - glob, `{N}` placeholder and `!exclusion` dependency tokens,
//!   resolved against the file system at run time
//! - **Targets** - one runtime node per concrete name per run, with shared
//!   at-most-once execution and multi-parent cancellation
//! - **Pipeline** - ordered resolution stages turning a request into a
//!   skip/execute decision
//! - **Change cache** - persisted path → mtime map driving skip decisions
//! - **Shell executor** - buffered or streamed subprocesses that die with
//!   their target
//!
//! ```no_run
//! use remake::{Action, Config, Make};
//!
//! # async fn demo() -> remake::Result<()> {
//! let mut make = Make::new();
//! make.rule("out/*.txt", &["src/{1}"], Action::new(|t| async move {
//!     let name = t.name();
//!     let source = t.deps()[0].clone();
//!     t.sh([vec!["cp".to_string(), source, name]]).await
//! }))?;
//! make.task("build", &["out/a.txt", "out/b.txt"], Action::noop())?;
//! make.run(vec![vec!["build".to_string()]], Config::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod definitions;
pub mod error;
pub mod executor;
pub mod expand;
pub mod logging;
pub mod make;
pub mod pipeline;
pub mod registry;
pub mod session;
pub mod target;

use std::sync::{Mutex, MutexGuard};

pub use cache::ChangeCache;
pub use cli::{run_cli, Cli};
pub use config::{load_settings, Config, Settings};
pub use error::{MakeError, Result};
pub use executor::{spawn, ShellOptions, ShellResult};
pub use expand::Expander;
pub use make::Make;
pub use pipeline::{Next, Pipeline, Stage};
pub use registry::{Definition, Kind, Registry};
pub use session::Session;
pub use target::{AbortSignal, Action, JobBoard, Outcome, Target};

/// Lock a mutex, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
