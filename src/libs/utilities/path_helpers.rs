// Path helpers for user supplied paths (config file location, configure targets)
// and for recognizing executables on disk (extensions, the `brew` binary).

// `fs` for the permission lookup in `is_executable`.
use std::fs;
use std::path::{Path, PathBuf};

/// Expands a leading `~` using `home`.
///
/// Only a bare `~` or the `~/...` form is expanded. `~other/...` names another
/// user's home and is returned unchanged, as is any path when `home` is `None`.
///
/// # Arguments
/// * `path`: The path as written by the user.
/// * `home`: The home directory, usually `dirs::home_dir()`.
///
/// # Returns
/// * `PathBuf`: The expanded path.
pub fn expand_tilde_with_home(path: &str, home: Option<&Path>) -> PathBuf {
    let home = home.map(|h| h.to_string_lossy().into_owned());
    // `tilde_with_context` leaves `~user` forms alone.
    PathBuf::from(shellexpand::tilde_with_context(path, || home.as_deref()).into_owned())
}

/// The per-user directory `~/.machine-setup` holding the default config and extensions.
/// Falls back to a relative `.machine-setup` when no home directory is known.
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".machine-setup"))
        .unwrap_or_else(|| PathBuf::from(".machine-setup"))
}

/// `true` for a regular file with at least one execute bit set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    // `PermissionsExt` exposes the raw Unix mode bits.
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

/// On platforms without execute bits any regular file counts.
#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}
