//! Declarative `remake.toml` definitions for the `remake` binary
//!
//! ```toml
//! default = "build"
//!
//! [[task]]
//! name = "build"
//! deps = ["out/*.txt"]
//! description = "Copy every source"
//!
//! [[rule]]
//! target = "out/*.txt"
//! deps = ["src/{1}"]
//! run = [["cp", "{dep}", "{name}"]]
//! ```
//!
//! Commands of one entry run in order. Inside an argument `{name}` is the
//! target name and `{dep}` its first dependency; an argument that is
//! exactly `{deps}` expands to every dependency.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::Result as MakeResult;
use crate::make::Make;
use crate::target::{Action, Target};

/// Default definitions file name
pub const DEFINITIONS_FILE: &str = "remake.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Definitions {
    /// Target run when none is requested
    #[serde(default)]
    pub default: Option<String>,

    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskEntry>,

    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEntry {
    pub name: String,
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(default)]
    pub run: Vec<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleEntry {
    pub target: String,
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(default)]
    pub run: Vec<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Definitions {
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse definitions")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid definitions in {}", path.display()))
    }

    /// Register every entry on a fresh [`Make`].
    pub fn into_make(self) -> Result<Make> {
        let mut make = Make::new();

        for task in self.tasks {
            let deps: Vec<&str> = task.deps.iter().map(String::as_str).collect();
            make.task(&task.name, &deps, commands(task.run))?;
            if let Some(description) = &task.description {
                make.describe(&task.name, description);
            }
        }

        for rule in self.rules {
            let deps: Vec<&str> = rule.deps.iter().map(String::as_str).collect();
            make.rule(&rule.target, &deps, commands(rule.run))?;
            if let Some(description) = &rule.description {
                make.describe(&rule.target, description);
            }
        }

        if let Some(default) = &self.default {
            make.default_task(default)?;
        }

        Ok(make)
    }
}

/// Action running `run` one command at a time.
fn commands(run: Vec<Vec<String>>) -> Action {
    let run = Arc::new(run);
    Action::new(move |target| run_commands(target, Arc::clone(&run)))
}

async fn run_commands(target: Target, run: Arc<Vec<Vec<String>>>) -> MakeResult<()> {
    let name = target.name();
    let deps = target.deps();

    for template in run.iter() {
        target.sh([render(template, &name, &deps)]).await?;
    }
    Ok(())
}

fn render(template: &[String], name: &str, deps: &[String]) -> Vec<String> {
    let first = deps.first().map(String::as_str).unwrap_or("");
    let mut argv = Vec::with_capacity(template.len());

    for arg in template {
        if arg == "{deps}" {
            argv.extend(deps.iter().cloned());
        } else {
            argv.push(arg.replace("{name}", name).replace("{dep}", first));
        }
    }
    argv
}
