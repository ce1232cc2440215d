// Bootstrap installers for the two prerequisites every other step relies on:
// the Xcode command-line tools (compilers, git) and Homebrew itself.
//
// Both are thin wrappers around the Command Executor. Each one first checks whether
// the prerequisite is already there and returns early if so, so running them twice
// is harmless. The actual installers are interactive (license dialog, sudo password),
// which is why they run with the terminal attached like any other install step.

// Standard library imports:
// `env` reads PATH to find an existing `brew`.
use std::env;
// `fs`/`OpenOptions` read and append to the shell profile.
use std::fs::{self, OpenOptions};
// `Write` for `writeln!` into the profile.
use std::io::{self, Write};
use std::path::{Path, PathBuf};

// For adding color to terminal output.
use colored::Colorize;

// Internal module imports:
// The process seam: checks and installers both go through it.
use crate::libs::executor::{CommandLine, ExecError, ProcessRunner};
use crate::libs::run_context::RunContext;
// The Homebrew program name shared with the tool installer.
use crate::libs::tool_installer::BREW;
use crate::libs::utilities::path_helpers::is_executable;
// Custom logging macros for structured output.
use crate::{log_debug, log_info, log_warn};

/// Homebrew's official install script, fetched and run by `/bin/bash`.
const HOMEBREW_INSTALL_SCRIPT: &str =
    r#"/bin/bash -c "$(curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)""#;

/// Where Homebrew puts `brew`: Apple Silicon first, then Intel.
const HOMEBREW_BIN_DIRS: [&str; 2] = ["/opt/homebrew/bin", "/usr/local/bin"];

/// Shell profile that receives the Homebrew PATH line.
const SHELL_PROFILE: &str = ".zshrc";

/// What a bootstrap step ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AlreadyInstalled,
    Installed,
}

/// Result of the best-effort shell profile update after Homebrew is installed.
#[derive(Debug, PartialEq, Eq)]
pub enum ProfileUpdate {
    /// The export line was appended to this file.
    Updated(PathBuf),
    /// The file already carries the export line.
    AlreadyPresent,
    /// No profile to update; nothing was created.
    NoProfile,
}

/// Installs the Xcode command-line tools and Homebrew.
pub struct Bootstrapper<'a> {
    runner: &'a dyn ProcessRunner,
    // Home directory holding the shell profile. `None` skips the profile update.
    home: Option<PathBuf>,
    // Directories searched for an existing `brew`, in order.
    brew_dirs: Vec<PathBuf>,
}

impl<'a> Bootstrapper<'a> {
    /// Uses the real home directory, `PATH` and the standard Homebrew locations.
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        let mut brew_dirs: Vec<PathBuf> = env::var_os("PATH").map(|p| env::split_paths(&p).collect()).unwrap_or_default();
        brew_dirs.extend(HOMEBREW_BIN_DIRS.iter().map(PathBuf::from));
        Self { runner, home: dirs::home_dir(), brew_dirs }
    }

    /// Overrides the home directory and the `brew` search directories.
    pub fn with_locations(mut self, home: Option<PathBuf>, brew_dirs: Vec<PathBuf>) -> Self {
        self.home = home;
        self.brew_dirs = brew_dirs;
        self
    }

    /// Installs the Xcode command-line tools unless `xcode-select -p` already finds them.
    pub fn install_xcode(&self, ctx: &RunContext) -> Result<Outcome, ExecError> {
        // `xcode-select -p` prints the active developer directory and fails when there is none.
        let check = CommandLine::program("xcode-select", ["-p"]);
        if self.runner.succeeds(ctx, &check)? {
            log_info!("[Bootstrap] Xcode command-line tools are already installed.");
            return Ok(Outcome::AlreadyInstalled);
        }

        log_info!("[Bootstrap] Installing Xcode command-line tools. Follow the system dialog to finish.");
        self.runner.run(ctx, &CommandLine::program("xcode-select", ["--install"]))?;
        log_info!("[Bootstrap] {}", "Xcode command-line tools installed.".green());
        Ok(Outcome::Installed)
    }

    /// Installs Homebrew unless a `brew` executable is already present, then tries to
    /// put Homebrew's `bin` directory on the user's PATH.
    pub fn install_homebrew(&self, ctx: &RunContext) -> Result<Outcome, ExecError> {
        if let Some(existing) = self.find_brew() {
            log_info!("[Bootstrap] Homebrew is already installed at {}.", existing.display().to_string().cyan());
            return Ok(Outcome::AlreadyInstalled);
        }

        log_info!("[Bootstrap] Installing Homebrew. Enter your password when prompted.");
        self.runner.run(ctx, &CommandLine::shell(HOMEBREW_INSTALL_SCRIPT))?;
        log_info!("[Bootstrap] {}", "Homebrew installed.".green());

        // Homebrew works without this; a failure here is only worth a warning.
        let Some(home) = &self.home else {
            log_warn!("[Bootstrap] No home directory; add Homebrew to your PATH manually.");
            return Ok(Outcome::Installed);
        };
        match update_shell_profile(home, &homebrew_bin_dir()) {
            Ok(ProfileUpdate::Updated(profile)) => log_info!(
                "[Bootstrap] Added Homebrew to PATH in {}. Restart your terminal or source it to pick it up.",
                profile.display()
            ),
            Ok(ProfileUpdate::AlreadyPresent) => log_debug!("[Bootstrap] Shell profile already exports Homebrew's PATH."),
            Ok(ProfileUpdate::NoProfile) => {
                log_info!("[Bootstrap] No ~/{} found; add Homebrew's bin directory to your PATH manually.", SHELL_PROFILE)
            }
            Err(e) => log_warn!("[Bootstrap] Could not update ~/{}: {}", SHELL_PROFILE, e),
        }
        Ok(Outcome::Installed)
    }

    /// First executable `brew` in the search directories.
    fn find_brew(&self) -> Option<PathBuf> {
        self.brew_dirs.iter().map(|dir| dir.join(BREW)).find(|candidate| is_executable(candidate))
    }
}

/// The `bin` directory a fresh Homebrew install uses on this machine.
fn homebrew_bin_dir() -> PathBuf {
    HOMEBREW_BIN_DIRS
        .iter()
        .map(PathBuf::from)
        .find(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from(HOMEBREW_BIN_DIRS[1]))
}

/// Appends `export PATH="<bin_dir>:$PATH"` to `~/.zshrc` unless it is already there.
/// A missing profile is left alone rather than created.
pub fn update_shell_profile(home: &Path, bin_dir: &Path) -> io::Result<ProfileUpdate> {
    let profile = home.join(SHELL_PROFILE);
    if !profile.is_file() {
        return Ok(ProfileUpdate::NoProfile);
    }

    let export = format!("export PATH=\"{}:$PATH\"", bin_dir.display());
    let content = fs::read_to_string(&profile)?;
    if content.lines().any(|line| line.trim() == export) {
        return Ok(ProfileUpdate::AlreadyPresent);
    }

    // Same marker style as every other line we add to a user's rc file.
    let mut file = OpenOptions::new().append(true).open(&profile)?;
    writeln!(file, "\n# Added by machine-setup")?;
    writeln!(file, "{export}")?;
    log_debug!("[Bootstrap] Appended '{}' to {}", export, profile.display());
    Ok(ProfileUpdate::Updated(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::run_context::Interrupted;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Answers checks from a fixed list and records every command it sees.
    struct Scripted {
        installed: bool,
        calls: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn new(installed: bool) -> Self {
            Self { installed, calls: RefCell::new(Vec::new()) }
        }
    }

    impl ProcessRunner for Scripted {
        fn run(&self, ctx: &RunContext, command: &CommandLine) -> Result<(), ExecError> {
            ctx.check().map_err(|reason| ExecError::Interrupted { command: command.to_string(), reason })?;
            self.calls.borrow_mut().push(command.to_string());
            Ok(())
        }

        fn succeeds(&self, ctx: &RunContext, command: &CommandLine) -> Result<bool, ExecError> {
            self.run(ctx, command)?;
            Ok(self.installed)
        }
    }

    #[test]
    fn xcode_is_left_alone_when_already_selected() {
        let runner = Scripted::new(true);
        let outcome = Bootstrapper::new(&runner).install_xcode(&RunContext::background()).unwrap();

        assert_eq!(outcome, Outcome::AlreadyInstalled);
        assert_eq!(*runner.calls.borrow(), vec!["xcode-select -p"]);
    }

    #[test]
    fn missing_xcode_runs_the_installer() {
        let runner = Scripted::new(false);
        let outcome = Bootstrapper::new(&runner).install_xcode(&RunContext::background()).unwrap();

        assert_eq!(outcome, Outcome::Installed);
        assert_eq!(*runner.calls.borrow(), vec!["xcode-select -p", "xcode-select --install"]);
    }

    #[test]
    fn cancelled_xcode_check_is_an_interruption() {
        let ctx = RunContext::background();
        ctx.cancel();
        let err = Bootstrapper::new(&Scripted::new(false)).install_xcode(&ctx).unwrap_err();
        assert_eq!(err.interruption(), Some(Interrupted::Cancelled));
    }

    #[cfg(unix)]
    #[test]
    fn existing_brew_skips_the_install_script() {
        use std::os::unix::fs::PermissionsExt;
        let bin = TempDir::new().unwrap();
        let brew = bin.path().join("brew");
        fs::write(&brew, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&brew, fs::Permissions::from_mode(0o755)).unwrap();

        let runner = Scripted::new(false);
        let outcome = Bootstrapper::new(&runner)
            .with_locations(None, vec![PathBuf::from("/no/such/dir"), bin.path().to_path_buf()])
            .install_homebrew(&RunContext::background())
            .unwrap();

        assert_eq!(outcome, Outcome::AlreadyInstalled);
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn missing_brew_runs_the_install_script() {
        let empty = TempDir::new().unwrap();
        let runner = Scripted::new(false);
        let outcome = Bootstrapper::new(&runner)
            .with_locations(None, vec![empty.path().to_path_buf()])
            .install_homebrew(&RunContext::background())
            .unwrap();

        assert_eq!(outcome, Outcome::Installed);
        assert_eq!(*runner.calls.borrow(), vec![format!("sh -c '{HOMEBREW_INSTALL_SCRIPT}'")]);
    }

    #[test]
    fn profile_gets_the_export_line_once() {
        let home = TempDir::new().unwrap();
        let profile = home.path().join(".zshrc");
        fs::write(&profile, "alias ll='ls -l'\n").unwrap();
        let bin = Path::new("/opt/homebrew/bin");

        assert_eq!(update_shell_profile(home.path(), bin).unwrap(), ProfileUpdate::Updated(profile.clone()));
        assert_eq!(update_shell_profile(home.path(), bin).unwrap(), ProfileUpdate::AlreadyPresent);

        let content = fs::read_to_string(&profile).unwrap();
        assert_eq!(content, "alias ll='ls -l'\n\n# Added by machine-setup\nexport PATH=\"/opt/homebrew/bin:$PATH\"\n");
    }

    #[test]
    fn missing_profile_is_not_created() {
        let home = TempDir::new().unwrap();
        assert_eq!(
            update_shell_profile(home.path(), Path::new("/usr/local/bin")).unwrap(),
            ProfileUpdate::NoProfile
        );
        assert!(!home.path().join(".zshrc").exists());
    }
}
