//! Task and rule registries
//!
//! Tasks are looked up by exact name. Rules are looked up by literal path
//! first, then by the first glob pattern (in registration order) that
//! matches. Task names and rule names share one namespace.

mod rules;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{MakeError, Result};
use crate::expand::{format_token, is_glob};
use crate::target::Action;

pub use rules::RuleTable;

/// Whether a definition always runs or is skipped while up to date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Task,
    Rule,
}

/// A registered task or rule
#[derive(Debug)]
pub struct Definition {
    pub kind: Kind,
    /// Task name or (formatted) rule pattern
    pub name: String,
    /// Raw dependency tokens, before placeholder substitution and expansion
    pub deps: Vec<String>,
    pub action: Action,
}

impl Definition {
    pub fn is_task(&self) -> bool {
        self.kind == Kind::Task
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    tasks: HashMap<String, Arc<Definition>>,
    task_order: Vec<String>,
    rules: RuleTable,
}

fn is_valid_task_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['.', '/', '\\']) && !is_glob(name)
}

fn owned(deps: &[&str]) -> Vec<String> {
    deps.iter().map(|dep| dep.to_string()).collect()
}

impl Registry {
    /// Register an always-run task.
    ///
    /// # Errors
    ///
    /// `DuplicateTask` if the name is taken by a task or rule,
    /// `InvalidTaskName` if it contains `.`, a path separator or glob syntax.
    pub fn register_task(&mut self, name: &str, deps: &[&str], action: Action) -> Result<()> {
        if self.tasks.contains_key(name) || self.rules.contains(name) {
            return Err(MakeError::DuplicateTask(name.to_string()));
        }
        if !is_valid_task_name(name) {
            return Err(MakeError::InvalidTaskName(name.to_string()));
        }

        tracing::debug!("Registered task '{}'", name);
        self.tasks.insert(
            name.to_string(),
            Arc::new(Definition {
                kind: Kind::Task,
                name: name.to_string(),
                deps: owned(deps),
                action,
            }),
        );
        self.task_order.push(name.to_string());
        Ok(())
    }

    /// Register a file rule for a literal path or a glob pattern.
    pub fn register_rule(&mut self, pattern: &str, deps: &[&str], action: Action) -> Result<()> {
        let name = format_token(pattern);
        if self.rules.contains(&name) || self.tasks.contains_key(&name) {
            return Err(MakeError::DuplicateRule(name));
        }

        tracing::debug!("Registered rule '{}'", name);
        self.rules.insert(Arc::new(Definition {
            kind: Kind::Rule,
            name,
            deps: owned(deps),
            action,
        }))
    }

    /// Task by exact name, else the rule covering `name`.
    pub fn lookup(&self, name: &str) -> Option<&Arc<Definition>> {
        self.tasks.get(name).or_else(|| self.rules.find(name))
    }

    pub fn is_task(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names in registration order
    pub fn task_names(&self) -> &[String] {
        &self.task_order
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}
