//! Async subprocess execution bound to an abort signal
//!
//! Commands run either buffered (stdout and stderr merged line by line
//! into one string, reported after exit) or instant (inheriting the
//! terminal). Aborting the signal kills the child and resolves with the
//! abort reason.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;

use crate::error::{MakeError, Result};
use crate::target::AbortSignal;

/// Options for spawning a command
#[derive(Debug, Clone)]
pub struct ShellOptions {
    /// Working directory for the command
    pub working_dir: Option<PathBuf>,
    /// Buffer merged output (vs inheriting the terminal)
    pub capture_output: bool,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            working_dir: None,
            capture_output: true,
        }
    }
}

impl ShellOptions {
    /// Create options with a working directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
            ..Default::default()
        }
    }

    /// Stream output straight to the terminal instead of buffering it
    pub fn streaming(mut self) -> Self {
        self.capture_output = false;
        self
    }
}

/// Result of a finished command
#[derive(Debug, Clone)]
pub struct ShellResult {
    /// Merged stdout/stderr; `None` when streamed
    pub output: Option<String>,
    /// Exit code; `None` if killed by a signal
    pub code: Option<i32>,
}

impl ShellResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Display form of an argument vector, e.g. `$ cc -c a.c`.
pub fn format_command(argv: &[String]) -> String {
    format!("$ {}", argv.join(" "))
}

enum Exit {
    Finished(Option<String>, std::io::Result<ExitStatus>),
    Aborted(MakeError),
}

/// Spawn `argv` and wait for it, or kill it when `signal` aborts.
///
/// # Arguments
/// * `argv` - Program followed by its arguments
/// * `options` - Working directory and output mode
/// * `signal` - Abort signal of the owning target
///
/// # Errors
/// * `MakeError::SpawnFailed` - empty argv or the program couldn't be spawned
/// * the abort reason, if `signal` aborted before the command exited
pub async fn spawn(argv: &[String], options: &ShellOptions, signal: &AbortSignal) -> Result<ShellResult> {
    let command_str = format_command(argv);
    let Some((program, args)) = argv.split_first() else {
        return Err(MakeError::SpawnFailed {
            command: command_str,
            error: "empty command".to_string(),
        });
    };

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.kill_on_drop(true);

    if let Some(ref dir) = options.working_dir {
        cmd.current_dir(dir);
    }

    if options.capture_output {
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
    } else {
        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
    }

    tracing::debug!("Executing async: {}", command_str);

    let mut child = cmd.spawn().map_err(|e| MakeError::SpawnFailed {
        command: command_str.clone(),
        error: e.to_string(),
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let capture = options.capture_output;

    let exit = {
        let finished = async { tokio::join!(collect_output(stdout, stderr, capture), child.wait()) };
        tokio::select! {
            (output, status) = finished => Exit::Finished(output, status),
            reason = signal.aborted() => Exit::Aborted(reason),
        }
    };

    match exit {
        Exit::Finished(output, status) => {
            let status = status?;
            Ok(ShellResult {
                output,
                code: status.code(),
            })
        }
        Exit::Aborted(reason) => {
            tracing::info!("sh: abort {}", command_str);
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill '{}': {}", command_str, e);
            }
            Err(reason)
        }
    }
}

/// Merge both streams line by line in arrival order.
async fn collect_output(
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    capture: bool,
) -> Option<String> {
    if !capture {
        return None;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Some(stdout) = stdout {
        tokio::spawn(forward_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = stderr {
        tokio::spawn(forward_lines(stderr, tx.clone()));
    }
    drop(tx);

    let mut output = String::new();
    while let Some(line) = rx.recv().await {
        output.push_str(&line);
    }
    Some(output)
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::UnboundedSender<String>) {
    let mut buf_reader = BufReader::new(reader);
    loop {
        let mut line = String::new();
        match buf_reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("Error reading output: {}", e);
                break;
            }
        }
    }
}
