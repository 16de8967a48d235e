//! Glob detection, path normalization and file-system matching

use std::path::Path;
use std::sync::LazyLock;

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use walkdir::WalkDir;

use crate::error::{MakeError, Result};

static GLOB_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[*?]|\[[^\]]+\]|\{[^}]*\}|[@!+]\(").expect("Invalid regex")
});

/// Whether `s` contains glob syntax (`*`, `?`, `[..]`, `{..}`, extglob).
pub fn is_glob(s: &str) -> bool {
    GLOB_SYNTAX.is_match(s)
}

/// Lexically normalize a relative or absolute `/`-separated path.
///
/// Drops empty and `.` segments and folds `..` into its parent. An empty
/// result becomes `"."`.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Normalize literals; leave glob patterns untouched.
pub fn format_token(name: &str) -> String {
    if is_glob(name) {
        name.to_string()
    } else {
        normalize(name)
    }
}

/// Compile a glob where `*` and `?` never cross a `/`.
pub fn compile(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| MakeError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
    Ok(glob.compile_matcher())
}

/// Every path under `root` (files and directories, relative, `/`-separated)
/// that matches `matcher`, in file-name order.
pub fn walk(root: &Path, matcher: &GlobMatcher) -> Vec<String> {
    let mut matches = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel = rel.to_string_lossy().replace('\\', "/");
        if matcher.is_match(&rel) {
            matches.push(rel);
        }
    }

    matches
}
