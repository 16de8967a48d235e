//! Rule table: literal paths plus glob patterns matched in registration order

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use globset::GlobMatcher;

use super::Definition;
use crate::error::Result;
use crate::expand::{compile, is_glob};

#[derive(Debug, Default)]
pub struct RuleTable {
    names: HashSet<String>,
    literal: HashMap<String, Arc<Definition>>,
    patterns: Vec<(GlobMatcher, Arc<Definition>)>,
}

impl RuleTable {
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Add a rule keyed by its (already formatted) name.
    pub fn insert(&mut self, definition: Arc<Definition>) -> Result<()> {
        let name = definition.name.clone();
        if is_glob(&name) {
            let matcher = compile(&name)?;
            self.patterns.push((matcher, definition));
        } else {
            self.literal.insert(name.clone(), definition);
        }
        self.names.insert(name);
        Ok(())
    }

    /// Literal entries first, then the earliest registered matching pattern.
    pub fn find(&self, name: &str) -> Option<&Arc<Definition>> {
        self.literal.get(name).or_else(|| {
            self.patterns
                .iter()
                .find(|(matcher, _)| matcher.is_match(name))
                .map(|(_, definition)| definition)
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
