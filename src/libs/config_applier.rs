//! # Configuration Orchestrator
//!
//! Puts the files listed under `configure:` in place, one item at a time, with the
//! same fail-fast policy as tool installation.
//!
//! ## Per-item workflow
//!
//! 1. **Resolve** the target path (`~` and `~/...` expand to the home directory).
//! 2. **Existence gate**: an existing target without `force` fails the item with
//!    "already exists". Nothing is overwritten and nothing is silently skipped.
//! 3. **Parent directories** are created recursively.
//! 4. **Produce** the content:
//!    - custom command: run it, then require the target to exist afterwards. Under
//!      `force` an existing target is first moved aside, so only a file the command
//!      actually wrote passes the check; the old file comes back if the command fails;
//!    - URL: normalize it, download it into a temporary file next to the target
//!      and atomically persist that file over the target.
//!
//! The temporary file is removed when dropped, so an aborted download never leaves
//! a half-written target behind.

// Standard library imports:
// `fs` for parent directory creation and moving an old target aside.
use std::fs;
use std::path::{Path, PathBuf};

// External crate imports:
// For adding color to paths and commands in the log output.
use colored::Colorize;
// Scoped temporary files: staging for downloads, parking space for old targets.
use tempfile::{NamedTempFile, TempPath};

// Internal module imports:
use crate::libs::batch::{BatchResult, StepError, run_fail_fast};
use crate::libs::executor::{CommandLine, ProcessRunner};
use crate::libs::fetcher::ConfigFetcher;
use crate::libs::run_context::RunContext;
use crate::libs::utilities::path_helpers::expand_tilde_with_home;
use crate::libs::utilities::url_normalizer;
use crate::schemas::work_items::{ConfigSource, ConfigureItem, Operation};
use crate::{log_debug, log_info, log_warn};

pub struct ConfigApplier<'a> {
    runner: &'a dyn ProcessRunner,
    fetcher: &'a dyn ConfigFetcher,
    home: Option<PathBuf>,
    force: bool,
}

impl<'a> ConfigApplier<'a> {
    /// Uses the current user's home directory for `~` expansion.
    pub fn new(runner: &'a dyn ProcessRunner, fetcher: &'a dyn ConfigFetcher, force: bool) -> Self {
        Self { runner, fetcher, home: dirs::home_dir(), force }
    }

    /// Overrides the home directory used for `~` expansion.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Applies `items` in order, stopping at the first failure.
    pub fn apply_configs(&self, ctx: &RunContext, items: &[ConfigureItem]) -> BatchResult {
        log_info!("[Configure] Processing {} configuration item(s)...", items.len());

        let result = run_fail_fast(
            "[Configure]",
            items,
            |item| (item.name.as_str(), Operation::Configure),
            |item| self.apply_one(ctx, item).map(|_| ()),
        );

        if result.is_success() {
            log_info!("[Configure] All requested tools have been configured successfully.");
        }
        result
    }

    /// Expands the item's target path.
    pub fn resolve_target(&self, item: &ConfigureItem) -> PathBuf {
        expand_tilde_with_home(&item.target_path, self.home.as_deref())
    }

    /// Applies one item and returns the path that was written.
    pub fn apply_one(&self, ctx: &RunContext, item: &ConfigureItem) -> Result<PathBuf, StepError> {
        // 1. Where the file goes, with `~` expanded.
        let target = self.resolve_target(item);
        log_debug!("[Configure] Target for '{}': {}", item.name, target.display().to_string().cyan());

        // 2. Never clobber an existing file unless the user asked for it.
        if target.exists() && !self.force {
            return Err(StepError::AlreadyExists(target));
        }

        // 3. Make sure the directory exists, e.g. `~/.config/starship/`.
        let parent = parent_dir(&target);
        fs::create_dir_all(&parent).map_err(|source| StepError::CreateDir { path: parent.clone(), source })?;

        // 4. Produce the content from whichever source the item names.
        match &item.source {
            ConfigSource::Command(command) => self.run_configure_command(ctx, command, &parent, &target)?,
            ConfigSource::Url(url) => self.download(ctx, url, &parent, &target)?,
        }

        log_info!("[Configure] Wrote {}", target.display().to_string().green());
        Ok(target)
    }

    fn run_configure_command(&self, ctx: &RunContext, command: &str, dir: &Path, target: &Path) -> Result<(), StepError> {
        // Blank commands are rejected when the document is loaded.
        let command = CommandLine::from_words(command).unwrap_or_else(|| CommandLine::shell(command));

        // With --force the old file is still there, and it would satisfy the output
        // check even if the command wrote nothing. Move it out of the way first.
        let stale = set_aside(dir, target)?;

        log_info!("[Configure] Running configure command: {}", command.to_string().cyan());
        let outcome = self.runner.run(ctx, &command).map_err(StepError::from).and_then(|()| {
            if target.exists() { Ok(()) } else { Err(StepError::MissingOutput(target.to_path_buf())) }
        });

        match (outcome, stale) {
            // Put the previous content back so a failed run changes nothing.
            (Err(e), Some(stale)) => {
                restore(stale, target);
                Err(e)
            }
            // Success: dropping `stale` deletes the old content.
            (outcome, _) => outcome,
        }
    }

    fn download(&self, ctx: &RunContext, url: &str, dir: &Path, target: &Path) -> Result<(), StepError> {
        // GitHub "blob" pages are HTML; fetch the raw file instead.
        let normalized = url_normalizer::normalize(url)?;
        if normalized.as_str() != url {
            log_debug!("[Configure] Rewrote {} to {}", url, normalized);
        }
        log_info!("[Configure] Downloading {}", normalized.as_str().blue());

        // Same directory as the target so the final rename stays on one filesystem.
        let mut staging =
            NamedTempFile::new_in(dir).map_err(|source| StepError::TempFile { dir: dir.to_path_buf(), source })?;
        let written = self.fetcher.fetch(ctx, &normalized, staging.as_file_mut())?;
        log_debug!("[Configure] Downloaded {} bytes", written);

        // Atomic replace: readers see either the old file or the complete new one.
        staging
            .persist(target)
            .map_err(|e| StepError::Persist { path: target.to_path_buf(), source: e.error })?;
        Ok(())
    }
}

/// Renames an existing `target` to a temporary path in `dir`. Returns `None` when
/// there is nothing to move. The returned path deletes itself when dropped.
fn set_aside(dir: &Path, target: &Path) -> Result<Option<TempPath>, StepError> {
    if !target.exists() {
        return Ok(None);
    }
    let stale = NamedTempFile::new_in(dir)
        .map_err(|source| StepError::TempFile { dir: dir.to_path_buf(), source })?
        .into_temp_path();
    fs::rename(target, &stale).map_err(|source| StepError::SetAside { path: target.to_path_buf(), source })?;
    log_debug!("[Configure] Moved previous {} aside", target.display());
    Ok(Some(stale))
}

/// Moves set-aside content back over `target`. If that fails the old content is
/// kept where it is and its location is logged.
fn restore(stale: TempPath, target: &Path) {
    if let Err(e) = stale.persist(target) {
        match e.path.keep() {
            Ok(kept) => log_warn!(
                "[Configure] Could not restore {}: {}. Previous content kept at {}",
                target.display(),
                e.error,
                kept.display()
            ),
            Err(keep_error) => log_warn!("[Configure] Could not restore {}: {}", target.display(), keep_error),
        }
    }
}

/// Directory that must exist before `target` can be written. Bare file names live in `.`.
fn parent_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
