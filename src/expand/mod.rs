//! Dependency token expansion
//!
//! A dependency token is one of:
//! - a task name, kept as-is
//! - a literal path, normalized
//! - a glob pattern, expanded against the file system (memoized per run)
//! - any of the above prefixed with `!`, removing matching entries
//!
//! `{N}` placeholders are substituted before a token reaches this module.

pub mod glob;
pub mod placeholder;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::{MakeError, Result};
use crate::lock;
use crate::registry::Registry;

pub use glob::{compile, format_token, is_glob, normalize};

/// Expands path tokens against the run root, caching each token's result
/// for the lifetime of the run.
#[derive(Debug)]
pub struct Expander {
    root: PathBuf,
    expanded: Mutex<HashMap<String, Arc<Vec<String>>>>,
}

impl Expander {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            expanded: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Paths matching `token`.
    ///
    /// Literals yield themselves (normalized) whether or not they exist.
    /// Globs yield every matching file or directory under the root; the
    /// walk happens once per distinct pattern per run.
    pub async fn expand(&self, token: &str) -> Result<Arc<Vec<String>>> {
        let pattern = format_token(token);

        if let Some(hit) = lock(&self.expanded).get(&pattern) {
            return Ok(Arc::clone(hit));
        }

        let listed = if is_glob(&pattern) {
            let matcher = compile(&pattern)?;
            let root = self.root.clone();
            tokio::task::spawn_blocking(move || glob::walk(&root, &matcher))
                .await
                .map_err(|e| MakeError::Io(Arc::new(std::io::Error::other(e))))?
        } else {
            vec![pattern.clone()]
        };

        tracing::debug!("Expanded '{}' to {} path(s)", pattern, listed.len());

        let mut expanded = lock(&self.expanded);
        Ok(Arc::clone(
            expanded.entry(pattern).or_insert_with(|| Arc::new(listed)),
        ))
    }
}

/// Expand a dependency list into concrete names.
///
/// Tasks and paths share one list in first-seen order with duplicates
/// dropped. Exclusions (`!token`) are applied after every inclusion, so
/// their position in the list does not matter.
pub async fn expand_dependencies(
    tokens: &[String],
    registry: &Registry,
    expander: &Expander,
) -> Result<Vec<String>> {
    let mut deps: Vec<String> = Vec::new();
    let mut tasks: HashSet<String> = HashSet::new();
    let mut paths: HashSet<String> = HashSet::new();
    let mut exclusions: Vec<&str> = Vec::new();

    for token in tokens {
        if let Some(excluded) = token.strip_prefix('!') {
            exclusions.push(excluded);
            continue;
        }

        if registry.is_task(token) {
            if tasks.insert(token.clone()) {
                deps.push(token.clone());
            }
            continue;
        }

        for path in expander.expand(token).await?.iter() {
            if !tasks.contains(path) && paths.insert(path.clone()) {
                deps.push(path.clone());
            }
        }
    }

    for excluded in exclusions {
        if registry.is_task(excluded) {
            tasks.remove(excluded);
            continue;
        }

        let pattern = format_token(excluded);
        if is_glob(&pattern) {
            let matcher = compile(&pattern)?;
            paths.retain(|path| !matcher.is_match(path));
        } else {
            paths.remove(&pattern);
        }
    }

    deps.retain(|dep| tasks.contains(dep) || paths.contains(dep));
    Ok(deps)
}
