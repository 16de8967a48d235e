//! Error types for remake
//!
//! Every failure that can travel through a run is a [`MakeError`]. The enum is
//! `Clone` because an in-flight target result (and an abort reason) is handed
//! to every caller that awaits it, so foreign error values are kept behind an
//! `Arc`.

use std::sync::Arc;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, MakeError>;

/// Main error type for registration, resolution and execution
#[derive(Error, Debug, Clone)]
pub enum MakeError {
    /// Name resolves to neither a task, a rule, nor an existing file
    #[error("cannot resolve target '{0}'")]
    TargetNotFound(String),

    /// Spawned process exited nonzero or without an exit code
    #[error("command '{command}' returned {}", describe_code(*.code))]
    ShellCommand {
        command: String,
        code: Option<i32>,
        output: Option<String>,
    },

    /// Failed to spawn the command
    #[error("Failed to spawn command: {command}")]
    SpawnFailed { command: String, error: String },

    /// User-facing abort message (see `Target::abort`)
    #[error("{0}")]
    Report(String),

    /// Error tagged with the target it originated from
    #[error("{target}: {source}")]
    Target {
        target: String,
        #[source]
        source: Box<MakeError>,
    },

    /// Task name registered twice (or clashes with a rule)
    #[error("'{0}' conflicts with existing task")]
    DuplicateTask(String),

    /// Task name contains a path separator, a dot or glob syntax
    #[error("invalid task name '{0}'")]
    InvalidTaskName(String),

    /// Rule pattern registered twice (or clashes with a task)
    #[error("'{0}' conflicts with existing rule")]
    DuplicateRule(String),

    /// Glob pattern failed to compile
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A second action was bound to the same target
    #[error("target '{0}' already has a bound action")]
    AlreadyBound(String),

    /// Registration or a second run attempted after the first run started
    #[error("cannot {0} after running")]
    AlreadyStarted(&'static str),

    /// `default_task` called twice
    #[error("cannot define default target twice")]
    DuplicateDefault,

    /// IO error
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    /// Anything else raised by a user action
    #[error(transparent)]
    Other(Arc<anyhow::Error>),
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("error code {}", code),
        None => "undefined error code".to_string(),
    }
}

impl From<std::io::Error> for MakeError {
    fn from(err: std::io::Error) -> Self {
        MakeError::Io(Arc::new(err))
    }
}

impl From<anyhow::Error> for MakeError {
    fn from(err: anyhow::Error) -> Self {
        MakeError::Other(Arc::new(err))
    }
}

impl MakeError {
    /// Wrap `self` with the originating target, unless it is already tagged.
    pub fn within(self, target: &str) -> Self {
        match self {
            MakeError::Target { .. } => self,
            other => MakeError::Target {
                target: target.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The error underneath any target tag.
    pub fn root_cause(&self) -> &MakeError {
        match self {
            MakeError::Target { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Name of the target this error was tagged with, if any.
    pub fn target_name(&self) -> Option<&str> {
        match self {
            MakeError::Target { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Whether the top-level entry point should log this error and report
    /// failure instead of propagating it.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self.root_cause(),
            MakeError::TargetNotFound(_)
                | MakeError::ShellCommand { .. }
                | MakeError::SpawnFailed { .. }
                | MakeError::Report(_)
        )
    }

    /// The message shown to the user when the error is reported.
    pub fn report(&self) -> String {
        self.root_cause().to_string()
    }
}
