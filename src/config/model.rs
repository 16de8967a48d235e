//! Configuration model for remake
//!
//! [`Settings`] is what users persist in TOML files and `REMAKE_*`
//! variables. [`Config`] is the runtime value handed to a run, carrying
//! the resolution pipeline alongside the flags.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache::CACHE_FILE;
use crate::logging::LogFormat;
use crate::pipeline::Pipeline;

/// Runtime configuration for one run
#[derive(Debug, Clone)]
pub struct Config {
    /// Run dependencies and commands one at a time
    pub serial: bool,
    /// Stream command output instead of buffering it
    pub instant: bool,
    /// Directory target names and globs are resolved against
    pub root: PathBuf,
    /// Cache file, relative to `root` unless absolute
    pub cache_file: PathBuf,
    /// Pipeline every target is fed through
    pub resolve: Pipeline,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: false,
            instant: false,
            root: PathBuf::from("."),
            cache_file: PathBuf::from(CACHE_FILE),
            resolve: Pipeline::standard(),
        }
    }
}

impl Config {
    pub fn with_serial(mut self, serial: bool) -> Self {
        self.serial = serial;
        self
    }

    pub fn with_instant(mut self, instant: bool) -> Self {
        self.instant = instant;
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_cache_file(mut self, cache_file: impl Into<PathBuf>) -> Self {
        self.cache_file = cache_file.into();
        self
    }

    pub fn with_resolve(mut self, resolve: Pipeline) -> Self {
        self.resolve = resolve;
        self
    }

    /// Absolute-or-root-relative location of the cache file
    pub fn cache_path(&self) -> PathBuf {
        self.root.join(&self.cache_file)
    }
}

/// Persistent settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Settings {
    /// Run everything serially
    #[serde(default)]
    pub serial: bool,

    /// Stream command output as it happens
    #[serde(default)]
    pub instant: bool,

    /// Log debug events
    #[serde(default)]
    pub verbose: bool,

    /// Install no log output at all
    #[serde(default)]
    pub silent: bool,

    /// Log line format (`text` or `json`)
    #[serde(default)]
    pub log_format: LogFormat,

    /// Cache file name
    #[serde(default = "default_cache_file")]
    pub cache_file: String,

    /// Definitions file read by the `remake` binary
    #[serde(default = "default_file")]
    pub file: String,
}

fn default_cache_file() -> String {
    CACHE_FILE.to_string()
}

fn default_file() -> String {
    crate::definitions::DEFINITIONS_FILE.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            serial: false,
            instant: false,
            verbose: false,
            silent: false,
            log_format: LogFormat::default(),
            cache_file: default_cache_file(),
            file: default_file(),
        }
    }
}

impl Settings {
    /// Turn on any flag given on the command line. Flags never turn a
    /// setting off.
    pub fn merge_flags(mut self, serial: bool, instant: bool, verbose: bool, silent: bool) -> Self {
        self.serial |= serial;
        self.instant |= instant;
        self.verbose |= verbose;
        self.silent |= silent;
        self
    }

    /// Runtime config rooted at the current directory
    pub fn to_config(&self) -> Config {
        Config::default()
            .with_serial(self.serial)
            .with_instant(self.instant)
            .with_cache_file(&self.cache_file)
    }
}
