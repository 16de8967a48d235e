//! Snapshot of which targets are running and which are waiting on work

use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobBoard {
    running: BTreeSet<String>,
    waiting: BTreeSet<String>,
}

impl JobBoard {
    pub fn create(&mut self, name: &str) {
        self.waiting.remove(name);
        self.running.insert(name.to_string());
    }

    /// Target has at least one dependency or command in flight.
    pub fn set_waiting(&mut self, name: &str) {
        self.running.remove(name);
        self.waiting.insert(name.to_string());
    }

    /// Target's in-flight work finished.
    pub fn set_running(&mut self, name: &str) {
        self.waiting.remove(name);
        self.running.insert(name.to_string());
    }

    pub fn set_stopped(&mut self, name: &str) {
        self.running.remove(name);
        self.waiting.remove(name);
    }

    /// Move `from`'s entry, if any, to `to`.
    pub fn rename(&mut self, from: &str, to: &str) {
        if self.running.remove(from) {
            self.running.insert(to.to_string());
        }
        if self.waiting.remove(from) {
            self.waiting.insert(to.to_string());
        }
    }

    pub fn running(&self) -> impl Iterator<Item = &str> {
        self.running.iter().map(String::as_str)
    }

    pub fn waiting(&self) -> impl Iterator<Item = &str> {
        self.waiting.iter().map(String::as_str)
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.waiting.is_empty()
    }
}
