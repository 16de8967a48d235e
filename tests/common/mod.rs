//! Common test utilities for remake tests
#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use remake::{Action, Config, MakeError, Target};
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

/// Creates a temporary project containing `files` (path, content)
pub fn create_project(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for (name, content) in files {
        write_file(dir.path(), name, content);
    }
    let path = dir.path().to_path_buf();
    (dir, path)
}

/// Writes a file, creating parent directories
pub fn write_file(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    std::fs::write(&path, content).expect("Failed to write file");
}

/// Moves a file's modification time `secs` seconds into the future
pub fn touch_ahead(root: &Path, name: &str, secs: u64) {
    let file = std::fs::File::options()
        .write(true)
        .open(root.join(name))
        .expect("Failed to open file");
    file.set_modified(SystemTime::now() + Duration::from_secs(secs))
        .expect("Failed to set mtime");
}

/// Config rooted at `root`
pub fn config(root: &Path) -> Config {
    Config::default().with_root(root)
}

/// Config rooted at `root`, serial mode
pub fn serial_config(root: &Path) -> Config {
    config(root).with_serial(true)
}

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Action that records the target name
pub fn record(log: &Log) -> Action {
    let log = Arc::clone(log);
    Action::new(move |t: Target| {
        log.lock().unwrap().push(t.name());
        async { Ok(()) }
    })
}

/// Action that records the target name, then copies its first dependency
/// onto it
pub fn copy_first_dep(log: &Log) -> Action {
    let log = Arc::clone(log);
    Action::new(move |t: Target| {
        log.lock().unwrap().push(t.name());
        copy(t)
    })
}

async fn copy(t: Target) -> Result<(), MakeError> {
    let session = Arc::clone(t.session());
    let source = t
        .deps()
        .into_iter()
        .next()
        .ok_or_else(|| t.abort("nothing to copy"))?;
    let destination = session.path(&t.name());
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(session.path(&source), destination).await?;
    Ok(())
}

/// Action that records the target name and writes the target file
pub fn stamp(log: &Log) -> Action {
    let log = Arc::clone(log);
    Action::new(move |t: Target| {
        log.lock().unwrap().push(t.name());
        let path = t.session().path(&t.name());
        async move { tokio::fs::write(path, "stamped").await.map_err(MakeError::from) }
    })
}

/// Action recording `name:start`, sleeping, then `name:end`
pub fn timed(log: &Log, millis: u64) -> Action {
    let log = Arc::clone(log);
    Action::new(move |t: Target| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(format!("{}:start", t.name()));
            tokio::time::sleep(Duration::from_millis(millis)).await;
            log.lock().unwrap().push(format!("{}:end", t.name()));
            Ok(())
        }
    })
}

pub fn groups(names: &[&str]) -> Vec<Vec<String>> {
    names.iter().map(|name| vec![name.to_string()]).collect()
}

/// In-memory log sink for `tracing_subscriber`
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    pub fn lines(&self) -> Vec<String> {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .map(String::from)
            .collect()
    }
}

pub struct CapturedWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CapturedWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

/// Capture logs on the current thread until the guard drops
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

/// Sample definitions file for CLI tests
pub const SAMPLE_DEFINITIONS: &str = r#"
default = "build"

[[task]]
name = "build"
deps = ["out/a.txt", "out/b.txt"]
description = "Copy every source into out/"

[[task]]
name = "broken"
run = [["sh", "-c", "echo going down; exit 3"]]
description = "Always fails"

[[rule]]
target = "out/*.txt"
deps = ["src/{1}"]
run = [["mkdir", "-p", "out"], ["cp", "{dep}", "{name}"]]
"#;
