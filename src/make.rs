//! Registration DSL and run entry points
//!
//! [`Make`] collects tasks, rules, descriptions and a default target, then
//! runs requested targets exactly once. Registration is closed as soon as
//! a run starts.

use std::sync::Arc;

use crate::cache::ChangeCache;
use crate::config::Config;
use crate::error::{MakeError, Result};
use crate::expand::{format_token, is_glob};
use crate::registry::Registry;
use crate::session::Session;
use crate::target::{Action, Outcome};

#[derive(Debug, Default)]
pub struct Make {
    registry: Registry,
    descriptions: Vec<(String, String)>,
    default_task: Option<String>,
    started: bool,
}

impl Make {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task that runs every time it is reached.
    pub fn task(&mut self, name: &str, deps: &[&str], action: Action) -> Result<&mut Self> {
        if self.started {
            return Err(MakeError::AlreadyStarted("define task"));
        }
        self.registry.register_task(name, deps, action)?;
        Ok(self)
    }

    /// Register a rule producing the file(s) matched by `pattern`.
    pub fn rule(&mut self, pattern: &str, deps: &[&str], action: Action) -> Result<&mut Self> {
        if self.started {
            return Err(MakeError::AlreadyStarted("define rule"));
        }
        self.registry.register_rule(pattern, deps, action)?;
        Ok(self)
    }

    /// Attach a help description to a target name.
    pub fn describe(&mut self, name: &str, description: &str) -> &mut Self {
        self.descriptions
            .push((name.to_string(), description.to_string()));
        self
    }

    /// Target run when nothing is requested.
    pub fn default_task(&mut self, name: &str) -> Result<&mut Self> {
        if self.default_task.is_some() {
            return Err(MakeError::DuplicateDefault);
        }
        self.default_task = Some(name.to_string());
        Ok(self)
    }

    pub fn descriptions(&self) -> &[(String, String)] {
        &self.descriptions
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// `groups`, or the default task as a single group when empty.
    pub fn requested(&self, groups: Vec<Vec<String>>) -> Vec<Vec<String>> {
        if groups.iter().any(|group| !group.is_empty()) {
            return groups;
        }
        match &self.default_task {
            Some(name) => vec![vec![name.clone()]],
            None => Vec::new(),
        }
    }

    /// Every requested name must be a glob or resolve to a task or rule.
    pub fn validate(&self, groups: &[Vec<String>]) -> Result<()> {
        for name in groups.iter().flatten() {
            if is_glob(name) {
                continue;
            }
            if self.registry.lookup(&format_token(name)).is_none() {
                return Err(MakeError::TargetNotFound(name.clone()));
            }
        }
        Ok(())
    }

    /// Run parallel groups of serial targets.
    ///
    /// Loads the change cache first and saves it afterwards whether or not
    /// the run succeeded. A `Make` runs once.
    pub async fn run(&mut self, groups: Vec<Vec<String>>, config: Config) -> Result<Outcome> {
        if self.started {
            return Err(MakeError::AlreadyStarted("run again"));
        }
        self.started = true;

        let registry = Arc::new(std::mem::take(&mut self.registry));
        let cache = ChangeCache::load(config.root.clone(), config.cache_path()).await;
        let session = Session::with_cache(registry, config, cache);

        let result = session.run(self.requested(groups)).await;

        if let Err(e) = session.cache().save().await {
            tracing::warn!("Failed to save cache: {}", e);
            if result.is_ok() {
                return Err(e);
            }
        }
        result
    }

    /// Run and report.
    ///
    /// Returns `Ok(true)` on success. Reportable failures (unknown target,
    /// failed command, [`Target::abort`](crate::Target::abort)) are logged
    /// and yield `Ok(false)`; anything else is returned as `Err`.
    pub async fn execute(&mut self, groups: Vec<Vec<String>>, config: Config) -> Result<bool> {
        let groups = self.requested(groups);

        let result = match self.validate(&groups) {
            Ok(()) => self.run(groups, config).await.map(|_| ()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_reportable() => {
                match e.target_name() {
                    Some(name) => tracing::error!(name = %name, "error: {}", e.report()),
                    None => tracing::error!("error: {}", e.report()),
                }
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
