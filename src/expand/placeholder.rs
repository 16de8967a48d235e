//! `{N}` placeholder substitution in dependency tokens
//!
//! `{0}`, `{1}`, … are replaced by the successive path components of the
//! invoking target's normalized name. Indices past the last component are
//! left as written.

use std::sync::LazyLock;

use regex::Regex;

use super::glob::normalize;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\d+)\}").expect("Invalid regex"));

/// Substitute placeholders in `token` with the components of `parent`.
pub fn format(token: &str, parent: &str) -> String {
    let parent = normalize(parent);
    let segments: Vec<&str> = parent.split('/').collect();
    format_with(token, &segments)
}

/// Substitute placeholders in `token` with the given segments.
pub fn format_with(token: &str, segments: &[&str]) -> String {
    PLACEHOLDER
        .replace_all(token, |caps: &regex::Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| segments.get(index))
                .map(|segment| segment.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string()
}
