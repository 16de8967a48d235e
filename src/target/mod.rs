//! Runtime target nodes
//!
//! A [`Target`] is created the first time a concrete name is requested in a
//! run and is shared (by cheap clone) with every later requester. It carries
//! the name, the dependency list, the bound definition, an abort signal and
//! a count of in-flight jobs, and exposes the two operations actions use:
//! [`Target::run`] for dependencies and [`Target::sh`] for commands.

mod action;
mod jobs;
mod signal;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use futures::stream::{FuturesUnordered, StreamExt};

use crate::error::{MakeError, Result};
use crate::executor::{self, format_command, ShellOptions};
use crate::expand::format_token;
use crate::lock;
use crate::registry::Definition;
use crate::session::Session;

pub use action::{Action, ActionFuture, Outcome};
pub use jobs::JobBoard;
pub use signal::AbortSignal;

#[derive(Clone)]
pub struct Target {
    inner: Arc<TargetInner>,
}

struct TargetInner {
    name: Mutex<String>,
    deps: Mutex<Vec<String>>,
    binding: OnceLock<Arc<Definition>>,
    signal: AbortSignal,
    jobs: AtomicUsize,
    session: Arc<Session>,
}

/// Decrements the job counter when dropped.
struct JobGuard<'a> {
    target: &'a Target,
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        if self.target.inner.jobs.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.target.session().jobs().set_running(&self.target.name());
        }
    }
}

impl Target {
    pub(crate) fn new(name: impl Into<String>, session: Arc<Session>) -> Self {
        Self {
            inner: Arc::new(TargetInner {
                name: Mutex::new(name.into()),
                deps: Mutex::new(Vec::new()),
                binding: OnceLock::new(),
                signal: AbortSignal::new(),
                jobs: AtomicUsize::new(0),
                session,
            }),
        }
    }

    pub fn name(&self) -> String {
        lock(&self.inner.name).clone()
    }

    /// Replace the name of a target produced by a single-match fan-out.
    pub(crate) fn rename(&self, name: &str) {
        let previous = std::mem::replace(&mut *lock(&self.inner.name), name.to_string());
        self.session().jobs().rename(&previous, name);
    }

    /// Dependencies in first-seen order.
    pub fn deps(&self) -> Vec<String> {
        lock(&self.inner.deps).clone()
    }

    pub fn set_deps(&self, deps: Vec<String>) {
        *lock(&self.inner.deps) = deps;
    }

    pub fn push_deps(&self, deps: impl IntoIterator<Item = String>) {
        lock(&self.inner.deps).extend(deps);
    }

    pub fn binding(&self) -> Option<Arc<Definition>> {
        self.inner.binding.get().cloned()
    }

    pub fn is_task(&self) -> bool {
        self.inner
            .binding
            .get()
            .is_some_and(|definition| definition.is_task())
    }

    /// Bind the task or rule this target executes. A target binds once.
    pub fn bind(&self, definition: Arc<Definition>) -> Result<()> {
        self.inner
            .binding
            .set(definition)
            .map_err(|_| MakeError::AlreadyBound(self.name()))
    }

    pub fn signal(&self) -> &AbortSignal {
        &self.inner.signal
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.inner.session
    }

    /// Dependencies and commands currently in flight.
    pub fn jobs(&self) -> usize {
        self.inner.jobs.load(Ordering::SeqCst)
    }

    fn start_job(&self) -> JobGuard<'_> {
        if self.inner.jobs.fetch_add(1, Ordering::SeqCst) == 0 {
            self.session().jobs().set_waiting(&self.name());
        }
        JobGuard { target: self }
    }

    /// Resolve `names` as dependencies of this target.
    ///
    /// Returns `Continued` if any of them changed. In parallel mode the
    /// first failure aborts this target (and with it every sibling still
    /// running); all in-flight work is awaited before the error returns.
    pub async fn run<I, S>(&self, names: I) -> Result<Outcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Ok(Outcome::Skipped);
        }

        if self.session().config().serial {
            let mut changed = Outcome::Skipped;
            for name in names {
                changed = changed.or(self.run_one(name).await?);
            }
            return Ok(changed);
        }

        let outcomes = settle(names.into_iter().map(|name| self.run_one(name)), self.signal()).await?;
        Ok(outcomes.into_iter().fold(Outcome::Skipped, Outcome::or))
    }

    async fn run_one(&self, name: String) -> Result<Outcome> {
        self.signal().check()?;
        let _job = self.start_job();

        let child = self.session().intern(self, &format_token(&name));
        let outcome = self.session().config().resolve.call(child.clone()).await;
        if child.jobs() == 0 {
            self.session().jobs().set_stopped(&child.name());
        }
        outcome
    }

    /// Run commands, each given as an argument vector.
    ///
    /// ```no_run
    /// # async fn demo(t: remake::Target) -> remake::Result<()> {
    /// t.sh([["cc", "-c", "a.c"], ["cc", "-c", "b.c"]]).await
    /// # }
    /// ```
    pub async fn sh<I, C, S>(&self, commands: I) -> Result<()>
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let commands: Vec<Vec<String>> = commands
            .into_iter()
            .map(|argv| argv.into_iter().map(Into::into).collect())
            .collect();

        if self.session().config().serial {
            for argv in commands {
                self.sh_one(argv).await?;
            }
            return Ok(());
        }

        settle(commands.into_iter().map(|argv| self.sh_one(argv)), self.signal()).await?;
        Ok(())
    }

    async fn sh_one(&self, argv: Vec<String>) -> Result<()> {
        self.signal().check()?;

        let session = self.session();
        let mut options = ShellOptions::in_dir(&session.config().root);
        if session.config().instant {
            options = options.streaming();
        }
        let command = format_command(&argv);

        let result = {
            let _job = self.start_job();
            executor::spawn(&argv, &options, self.signal()).await?
        };

        let logs = result
            .output
            .as_ref()
            .filter(|output| !output.is_empty())
            .map(|output| format!("output from {}\n{}", command, output.trim_end()));

        if !result.success() {
            if let Some(logs) = &logs {
                self.error(logs);
            }
            self.error(format!("sh: error {}", command));
            return Err(MakeError::ShellCommand {
                command,
                code: result.code,
                output: result.output,
            });
        }

        if let Some(logs) = &logs {
            self.info(logs);
        }
        self.info(format!("sh: success {}", command));
        Ok(())
    }

    /// Abort this target with a user-facing message.
    ///
    /// Returns the error to propagate; if the target was already aborted
    /// the original reason is returned instead.
    pub fn abort(&self, reason: impl Into<String>) -> MakeError {
        let error = MakeError::Report(reason.into()).within(&self.name());
        if self.signal().abort(error.clone()) {
            error
        } else {
            self.signal().reason().unwrap_or(error)
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        tracing::debug!(name = %self.name(), "{}", message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        tracing::info!(name = %self.name(), "{}", message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        tracing::warn!(name = %self.name(), "{}", message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        tracing::error!(name = %self.name(), "{}", message.as_ref());
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name())
            .field("deps", &self.deps())
            .field("jobs", &self.jobs())
            .finish()
    }
}

/// Drive every future to completion. The first error aborts `signal` and is
/// returned once the rest have settled.
pub(crate) async fn settle<T, F>(futures: impl IntoIterator<Item = F>, signal: &AbortSignal) -> Result<Vec<T>>
where
    F: Future<Output = Result<T>>,
{
    let mut pending: FuturesUnordered<F> = futures.into_iter().collect();
    let mut values = Vec::new();
    let mut failure = None;

    while let Some(result) = pending.next().await {
        match result {
            Ok(value) => values.push(value),
            Err(e) => {
                if failure.is_none() {
                    signal.abort(e.clone());
                    failure = Some(e);
                }
            }
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::Pipeline;
    use crate::registry::Registry;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    fn session_in(dir: &TempDir, registry: Registry, serial: bool) -> Arc<Session> {
        Session::new(
            Arc::new(registry),
            Config::default().with_root(dir.path()).with_serial(serial),
        )
    }

    fn counting(counter: &Arc<AtomicUsize>) -> Action {
        let counter = Arc::clone(counter);
        Action::new(move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_run_empty_is_skipped() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir, Registry::default(), false);
        let outcome = session.root().run(Vec::<String>::new()).await.unwrap();
        assert_eq!(outcome, Outcome::Skipped);
    }

    #[tokio::test]
    async fn test_bind_twice_fails() {
        let dir = TempDir::new().unwrap();
        let mut registry = Registry::default();
        registry.register_task("t", &[], Action::noop()).unwrap();
        let session = session_in(&dir, registry, false);

        let target = Target::new("t", Arc::clone(&session));
        let definition = Arc::clone(session.registry().lookup("t").unwrap());
        target.bind(Arc::clone(&definition)).unwrap();
        assert!(matches!(target.bind(definition), Err(MakeError::AlreadyBound(_))));
    }

    #[tokio::test]
    async fn test_task_runs_once_across_requests() {
        let dir = TempDir::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::default();
        registry.register_task("shared", &[], counting(&counter)).unwrap();
        registry.register_task("left", &["shared"], Action::noop()).unwrap();
        registry.register_task("right", &["shared"], Action::noop()).unwrap();
        let session = session_in(&dir, registry, false);

        let outcome = session.root().run(["left", "right", "shared"]).await.unwrap();

        assert_eq!(outcome, Outcome::Continued);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abort_returns_report_and_blocks_later_work() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir, Registry::default(), false);
        let target = Target::new("deploy", Arc::clone(&session));

        let err = target.abort("missing credentials");
        assert!(err.is_reportable());
        assert_eq!(err.report(), "missing credentials");
        assert_eq!(err.target_name(), Some("deploy"));

        let again = target.abort("second reason");
        assert_eq!(again.report(), "missing credentials");

        let run = target.run(["anything"]).await.unwrap_err();
        assert_eq!(run.report(), "missing credentials");
        let sh = target.sh([["echo", "hi"]]).await.unwrap_err();
        assert_eq!(sh.report(), "missing credentials");
    }

    #[tokio::test]
    async fn test_sh_failure_is_shell_command_error() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir, Registry::default(), true);
        let target = Target::new("t", Arc::clone(&session));

        match target.sh([["sh", "-c", "echo oops; exit 4"]]).await {
            Err(MakeError::ShellCommand { command, code, output }) => {
                assert_eq!(command, "$ sh -c echo oops; exit 4");
                assert_eq!(code, Some(4));
                assert_eq!(output.as_deref(), Some("oops\n"));
            }
            Err(MakeError::SpawnFailed { .. }) => {
                eprintln!("Skipping test: sh not available");
            }
            other => panic!("Unexpected result: {:?}", other),
        }
        assert_eq!(target.jobs(), 0);
    }

    #[tokio::test]
    async fn test_instant_sh_streams_and_reports_failure() {
        let dir = TempDir::new().unwrap();
        let session = Session::new(
            Arc::new(Registry::default()),
            Config::default().with_root(dir.path()).with_instant(true),
        );
        let target = Target::new("t", Arc::clone(&session));

        target.sh([["sh", "-c", "echo hi > made.txt"]]).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("made.txt")).unwrap(), "hi\n");

        match target.sh([["sh", "-c", "exit 5"]]).await {
            Err(MakeError::ShellCommand { code, output, .. }) => {
                assert_eq!(code, Some(5));
                assert_eq!(output, None);
            }
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_jobs_counted_while_command_runs() {
        let dir = TempDir::new().unwrap();
        let session = session_in(&dir, Registry::default(), false);
        let target = Target::new("waiter", Arc::clone(&session));

        let running = target.clone();
        let handle = tokio::spawn(async move { running.sh([["sleep", "0.5"]]).await });

        let mut seen = false;
        for _ in 0..40 {
            if target.jobs() > 0 {
                seen = session.job_board().waiting().any(|name| name == "waiter");
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(seen);

        handle.await.unwrap().unwrap();
        assert_eq!(target.jobs(), 0);
        assert!(session.job_board().running().any(|name| name == "waiter"));
    }

    #[tokio::test]
    async fn test_serial_run_stops_at_first_failure() {
        let dir = TempDir::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::default();
        registry
            .register_task(
                "fail",
                &[],
                Action::new(|t: Target| async move { Err::<(), _>(t.abort("nope")) }),
            )
            .unwrap();
        registry.register_task("after", &[], counting(&counter)).unwrap();
        let session = session_in(&dir, registry, true);

        let err = session.root().run(["fail", "after"]).await.unwrap_err();
        assert_eq!(err.report(), "nope");
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_custom_pipeline_sees_interned_targets() {
        let dir = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let pipeline = Pipeline::new().then(move |target: Target, _next| {
            let sink = Arc::clone(&sink);
            async move {
                lock(&sink).push(target.name());
                Ok(Outcome::Skipped)
            }
        });
        let session = Session::new(
            Arc::new(Registry::default()),
            Config::default().with_root(dir.path()).with_resolve(pipeline),
        );

        let root = session.root();
        root.run(["./a//b"]).await.unwrap();
        root.run(["a/b"]).await.unwrap();

        assert_eq!(*lock(&seen), vec!["a/b", "a/b"]);
        assert!(session.target("a/b").is_some());
    }
}
