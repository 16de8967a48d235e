//! Layered settings loading
//!
//! Later layers override earlier ones:
//! 1. built-in defaults
//! 2. `/etc/remake/config.toml`
//! 3. `$XDG_CONFIG_HOME/remake/config.toml`
//! 4. `~/.remake.toml`
//! 5. `./.remake.toml`
//! 6. the `--config` file
//! 7. `REMAKE_*` environment variables

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use super::model::Settings;

/// Prefix for environment overrides, e.g. `REMAKE_SERIAL=true`
pub const ENV_PREFIX: &str = "REMAKE_";

/// Settings files that exist, lowest priority first.
fn settings_files(override_path: Option<&Path>) -> Vec<PathBuf> {
    let standard = [
        Some(PathBuf::from("/etc/remake/config.toml")),
        dirs::config_dir().map(|dir| dir.join("remake").join("config.toml")),
        dirs::home_dir().map(|home| home.join(".remake.toml")),
        Some(PathBuf::from(".remake.toml")),
    ];

    let mut files: Vec<PathBuf> = standard.into_iter().flatten().filter(|p| p.exists()).collect();

    if let Some(path) = override_path {
        if path.exists() {
            files.push(path.to_path_buf());
        } else {
            tracing::warn!("Override config not found: {}", path.display());
        }
    }
    files
}

/// Load [`Settings`] from every layer.
///
/// `override_path` is the `--config` file; a missing one is logged and
/// skipped.
pub fn load_settings(override_path: Option<&str>) -> Result<Settings> {
    let files = settings_files(override_path.map(Path::new));

    let figment = files
        .iter()
        .fold(
            Figment::new().merge(Serialized::defaults(Settings::default())),
            |figment, path| {
                tracing::debug!("Loading config from: {}", path.display());
                figment.merge(Toml::file(path))
            },
        )
        .merge(Env::prefixed(ENV_PREFIX));

    figment.extract().context("Failed to load configuration")
}
