//! Persisted path → modification-time cache
//!
//! The cache file is a JSON array of `[path, mtime_ms]` pairs. A missing or
//! unreadable file loads as an empty cache. Saving writes a sibling temp
//! file and renames it over the original.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::UNIX_EPOCH;

use crate::error::Result;
use crate::lock;

/// Default cache file name, relative to the run root
pub const CACHE_FILE: &str = ".make";

#[derive(Debug)]
pub struct ChangeCache {
    /// Cache file location
    path: PathBuf,
    /// Directory target names are resolved against
    root: PathBuf,
    entries: Mutex<BTreeMap<String, u64>>,
}

/// Modification time of `path` in epoch milliseconds, `None` if it does not
/// exist. Symlinks are not followed.
pub async fn file_mtime_ms(path: &Path) -> Result<Option<u64>> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let modified = metadata.modified()?;
    let millis = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    Ok(Some(millis))
}

impl ChangeCache {
    /// An empty cache persisted at `path`.
    pub fn new(root: impl Into<PathBuf>, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            root: root.into(),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Load the cache at `path`, starting empty if it is missing or corrupt.
    pub async fn load(root: impl Into<PathBuf>, path: impl Into<PathBuf>) -> Self {
        let cache = Self::new(root, path);

        let contents = match tokio::fs::read_to_string(&cache.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No cache at {}", cache.path.display());
                return cache;
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache {}: {}", cache.path.display(), e);
                return cache;
            }
        };

        match serde_json::from_str::<Vec<(String, u64)>>(&contents) {
            Ok(pairs) => {
                tracing::debug!("Loaded {} cache entries", pairs.len());
                *lock(&cache.entries) = pairs.into_iter().collect();
            }
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache {}: {}", cache.path.display(), e);
            }
        }
        cache
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        lock(&self.entries).get(name).copied()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    /// True iff a recorded time exists and is not older than `mtime`.
    pub fn unchanged(&self, name: &str, mtime: u64) -> bool {
        self.get(name).is_some_and(|cached| cached >= mtime)
    }

    /// Record the current mtime of `name`, or forget it if it no longer
    /// exists.
    pub async fn update(&self, name: &str) -> Result<()> {
        let mtime = file_mtime_ms(&self.root.join(name)).await?;
        let mut entries = lock(&self.entries);
        match mtime {
            Some(mtime) => {
                entries.insert(name.to_string(), mtime);
            }
            None => {
                entries.remove(name);
            }
        }
        Ok(())
    }

    /// Atomically write the cache to disk.
    pub async fn save(&self) -> Result<()> {
        let contents = {
            let entries = lock(&self.entries);
            let pairs: Vec<(&String, &u64)> = entries.iter().collect();
            serde_json::to_string_pretty(&pairs)
                .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!("Saved cache to {}", self.path.display());
        Ok(())
    }
}
