// Resolves where the setup document lives.
// The `--config` flag wins; clap already folds `MACHINE_SETUP_CONFIG` into the same option.
// Without either, the document is expected at `~/.machine-setup/config.yaml`.

use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::libs::utilities::path_helpers::{app_dir, expand_tilde_with_home};
use crate::log_debug;

/// File name of the default setup document inside the app directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// The default document location, `~/.machine-setup/config.yaml`.
pub fn default_config_path() -> PathBuf {
    app_dir().join(DEFAULT_CONFIG_FILE)
}

/// Returns the absolute path of the setup document.
pub fn resolve_config_path(config_path: Option<&str>) -> PathBuf {
    resolve_config_path_with_home(config_path, dirs::home_dir().as_deref())
}

/// Same as [`resolve_config_path`], with an explicit home directory for `~` expansion.
pub fn resolve_config_path_with_home(config_path: Option<&str>, home: Option<&Path>) -> PathBuf {
    let resolved = match config_path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) => expand_tilde_with_home(path, home),
        None => default_config_path(),
    };
    log_debug!("[Config] Resolved setup document: {}", resolved.display().to_string().cyan());
    resolved
}
