//! State for one run
//!
//! A [`Session`] owns everything whose lifetime is a single run: the frozen
//! registry, the config, the glob expander, the change cache, the interned
//! targets, the in-flight results and the job board.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::cache::{file_mtime_ms, ChangeCache};
use crate::config::Config;
use crate::error::Result;
use crate::expand::{format_token, is_glob, Expander};
use crate::lock;
use crate::registry::Registry;
use crate::target::{settle, JobBoard, Outcome, Target};

/// In-flight target result awaited by every requester
pub type SharedOutcome = Shared<BoxFuture<'static, Result<Outcome>>>;

pub struct Session {
    registry: Arc<Registry>,
    config: Config,
    expander: Expander,
    cache: ChangeCache,
    targets: Mutex<HashMap<String, Target>>,
    running: Mutex<HashMap<String, SharedOutcome>>,
    jobs: Mutex<JobBoard>,
}

impl Session {
    /// A session with an empty change cache.
    pub fn new(registry: Arc<Registry>, config: Config) -> Arc<Self> {
        let cache = ChangeCache::new(config.root.clone(), config.cache_path());
        Self::with_cache(registry, config, cache)
    }

    pub fn with_cache(registry: Arc<Registry>, config: Config, cache: ChangeCache) -> Arc<Self> {
        Arc::new(Self {
            expander: Expander::new(config.root.clone()),
            registry,
            config,
            cache,
            targets: Mutex::new(HashMap::new()),
            running: Mutex::new(HashMap::new()),
            jobs: Mutex::new(JobBoard::default()),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn expander(&self) -> &Expander {
        &self.expander
    }

    pub fn cache(&self) -> &ChangeCache {
        &self.cache
    }

    pub(crate) fn jobs(&self) -> MutexGuard<'_, JobBoard> {
        lock(&self.jobs)
    }

    /// Snapshot of running and waiting targets.
    pub fn job_board(&self) -> JobBoard {
        self.jobs().clone()
    }

    /// A fresh root target with no name.
    pub fn root(self: &Arc<Self>) -> Target {
        Target::new("", Arc::clone(self))
    }

    /// The interned target for `name`, if it has been requested this run.
    pub fn target(&self, name: &str) -> Option<Target> {
        lock(&self.targets).get(name).cloned()
    }

    /// Get or create the target for `name` and link it under `parent`.
    pub(crate) fn intern(self: &Arc<Self>, parent: &Target, name: &str) -> Target {
        let child = {
            let mut targets = lock(&self.targets);
            match targets.get(name) {
                Some(existing) => existing.clone(),
                None => {
                    let created = Target::new(name, Arc::clone(self));
                    targets.insert(name.to_string(), created.clone());
                    self.jobs().create(name);
                    created
                }
            }
        };
        parent.signal().link(child.signal());
        child
    }

    /// Start the work for `name` once; later callers share its result.
    ///
    /// `start` runs without the lock held. If two callers race, the
    /// future inserted first wins and the other is dropped unpolled.
    pub fn memoize<F>(&self, name: &str, start: F) -> SharedOutcome
    where
        F: FnOnce() -> BoxFuture<'static, Result<Outcome>>,
    {
        if let Some(existing) = lock(&self.running).get(name) {
            return existing.clone();
        }
        let started = start().shared();
        lock(&self.running)
            .entry(name.to_string())
            .or_insert(started)
            .clone()
    }

    /// Absolute-or-root-relative location of `name`.
    pub fn path(&self, name: &str) -> PathBuf {
        self.config.root.join(name)
    }

    /// Modification time of `name` in epoch milliseconds, `None` if missing.
    pub async fn mtime(&self, name: &str) -> Result<Option<u64>> {
        file_mtime_ms(&self.path(name)).await
    }

    /// Run parallel groups of serially requested names.
    ///
    /// Each requested file that resolves successfully gets its cache entry
    /// refreshed. Any failure aborts the whole run.
    pub async fn run(self: &Arc<Self>, groups: Vec<Vec<String>>) -> Result<Outcome> {
        let root = self.root();

        let pending = groups
            .into_iter()
            .map(|group| run_group(Arc::clone(self), root.clone(), group));

        let result = settle(pending, root.signal())
            .await
            .map(|outcomes| outcomes.into_iter().fold(Outcome::Skipped, Outcome::or));

        self.close();
        result
    }

    /// Drop interned targets and in-flight results, breaking the
    /// target ↔ session reference cycle.
    pub fn close(&self) {
        lock(&self.targets).clear();
        lock(&self.running).clear();
    }
}

async fn run_group(session: Arc<Session>, root: Target, group: Vec<String>) -> Result<Outcome> {
    let mut changed = Outcome::Skipped;
    for name in group {
        changed = changed.or(root.run([name.as_str()]).await?);
        if !is_glob(&name) {
            session.cache().update(&format_token(&name)).await?;
        }
    }
    Ok(changed)
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("root", &self.config.root)
            .field("targets", &lock(&self.targets).len())
            .finish()
    }
}
