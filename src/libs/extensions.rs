// Extensions are standalone executables named `machine-setup-<name>`.
//
// They are looked up in the managed directory `~/.machine-setup/extensions` first
// and then on `PATH`; the first match for a name wins. In the managed directory an
// extension is either the executable itself or a git checkout `machine-setup-<name>/`
// with an executable of the same name inside (that is what `extension install`
// produces). Running one goes through the Command Executor with inherited stdio,
// like any other install step.
//
// Install, update and remove only ever touch the managed directory; executables
// that merely happen to be on PATH are never modified.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use thiserror::Error;

use crate::libs::executor::{CommandLine, ExecError, ProcessRunner};
use crate::libs::run_context::RunContext;
use crate::libs::utilities::path_helpers::{app_dir, is_executable};
use crate::{log_debug, log_info};

/// File-name prefix shared by all extension executables.
pub const EXTENSION_PREFIX: &str = "machine-setup-";

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("extension '{0}' not found. Run `machine-setup extension list` to see what is installed")]
    NotFound(String),
    #[error("extension '{0}' is not installed in the extensions directory")]
    NotInstalled(String),
    #[error("extension '{name}' is already installed at {}. Use `extension update` instead", path.display())]
    AlreadyInstalled { name: String, path: PathBuf },
    #[error("extension '{0}' is a single executable, not a git checkout; reinstall it to update")]
    NotACheckout(String),
    #[error("cannot derive an extension name from repository '{0}'")]
    InvalidRepository(String),
    #[error("'{0}' is not a valid extension name")]
    InvalidName(String),
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// A discovered extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    /// Name without the `machine-setup-` prefix.
    pub name: String,
    /// The executable that runs it.
    pub path: PathBuf,
}

/// The managed extensions directory plus the extra directories searched after it.
#[derive(Debug, Clone)]
pub struct ExtensionRegistry {
    managed_dir: PathBuf,
    path_dirs: Vec<PathBuf>,
}

impl ExtensionRegistry {
    pub fn new(managed_dir: PathBuf, path_dirs: Vec<PathBuf>) -> Self {
        Self { managed_dir, path_dirs }
    }

    /// `~/.machine-setup/extensions`, then every `PATH` entry.
    pub fn from_env() -> Self {
        let path_dirs = env::var_os("PATH").map(|path| env::split_paths(&path).collect()).unwrap_or_default();
        Self::new(app_dir().join("extensions"), path_dirs)
    }

    /// All extensions, sorted by name. A name shadowed by an earlier directory is listed once.
    pub fn list(&self) -> Vec<Extension> {
        let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();
        let dirs = std::iter::once((&self.managed_dir, true)).chain(self.path_dirs.iter().map(|dir| (dir, false)));
        for (dir, managed) in dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let Some(name) = extension_name(&path) else {
                    continue;
                };
                let executable = if managed { managed_executable(&path) } else { plain_executable(path.clone()) };
                if let Some(executable) = executable {
                    found.entry(name.to_string()).or_insert(executable);
                }
            }
        }
        found.into_iter().map(|(name, path)| Extension { name, path }).collect()
    }

    /// The first executable for `name` in search order.
    pub fn find(&self, name: &str) -> Option<Extension> {
        let file_name = format!("{EXTENSION_PREFIX}{name}");
        managed_executable(&self.managed_dir.join(&file_name))
            .or_else(|| self.path_dirs.iter().find_map(|dir| plain_executable(dir.join(&file_name))))
            .map(|path| Extension { name: name.to_string(), path })
    }

    /// Runs extension `name` with `args`.
    pub fn run(
        &self,
        runner: &dyn ProcessRunner,
        ctx: &RunContext,
        name: &str,
        args: &[String],
    ) -> Result<(), ExtensionError> {
        let extension = self.find(name).ok_or_else(|| ExtensionError::NotFound(name.to_string()))?;
        log_debug!("[Extensions] Resolved '{}' to {}", name, extension.path.display());
        log_info!("[Extensions] Running {}...", name.bold());

        let command = CommandLine::program(extension.path.to_string_lossy(), args.iter().cloned());
        runner.run(ctx, &command)?;
        Ok(())
    }

    /// Clones `repository` into the managed directory and returns the extension's name.
    pub fn install(&self, runner: &dyn ProcessRunner, ctx: &RunContext, repository: &str) -> Result<String, ExtensionError> {
        let name = name_from_repository(repository)
            .ok_or_else(|| ExtensionError::InvalidRepository(repository.to_string()))?;
        let destination = self.managed_path(&name);
        if destination.exists() {
            return Err(ExtensionError::AlreadyInstalled { name, path: destination });
        }

        fs::create_dir_all(&self.managed_dir)
            .map_err(|source| ExtensionError::Io { path: self.managed_dir.clone(), source })?;

        log_info!("[Extensions] Installing {} from {}...", name.bold(), repository.cyan());
        let clone = CommandLine::program(
            "git",
            ["clone".to_string(), repository.to_string(), destination.to_string_lossy().into_owned()],
        );
        runner.run(ctx, &clone)?;
        log_info!("[Extensions] Installed extension '{}'", name.green());
        Ok(name)
    }

    /// Pulls the latest commits into an installed checkout.
    pub fn update(&self, runner: &dyn ProcessRunner, ctx: &RunContext, name: &str) -> Result<(), ExtensionError> {
        let path = self.installed_path(name)?;
        if !path.is_dir() {
            return Err(ExtensionError::NotACheckout(name.to_string()));
        }

        log_info!("[Extensions] Updating {}...", name.bold());
        let pull = CommandLine::program("git", ["-C".to_string(), path.to_string_lossy().into_owned(), "pull".to_string()]);
        runner.run(ctx, &pull)?;
        log_info!("[Extensions] Updated extension '{}'", name.green());
        Ok(())
    }

    /// Deletes an installed extension, checkout or single executable.
    pub fn remove(&self, name: &str) -> Result<(), ExtensionError> {
        let path = self.installed_path(name)?;
        let removed = if path.is_dir() { fs::remove_dir_all(&path) } else { fs::remove_file(&path) };
        removed.map_err(|source| ExtensionError::Io { path: path.clone(), source })?;
        log_info!("[Extensions] Removed extension '{}'", name.green());
        Ok(())
    }

    fn managed_path(&self, name: &str) -> PathBuf {
        self.managed_dir.join(format!("{EXTENSION_PREFIX}{name}"))
    }

    /// Location of `name` in the managed directory, which must exist.
    fn installed_path(&self, name: &str) -> Result<PathBuf, ExtensionError> {
        // Names end up in a path; refuse anything that could step outside the directory.
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ExtensionError::InvalidName(name.to_string()));
        }
        let path = self.managed_path(name);
        // `symlink_metadata` so a dangling link can still be removed.
        if fs::symlink_metadata(&path).is_err() {
            return Err(ExtensionError::NotInstalled(name.to_string()));
        }
        Ok(path)
    }
}

fn extension_name(path: &Path) -> Option<&str> {
    path.file_name()?
        .to_str()?
        .strip_prefix(EXTENSION_PREFIX)
        .filter(|name| !name.is_empty())
}

/// Extension name for a clone URL or path: the last path segment without `.git`
/// and without a leading `machine-setup-`.
/// `https://github.com/me/machine-setup-dock.git` and `git@github.com:me/dock` both give `dock`.
fn name_from_repository(repository: &str) -> Option<String> {
    let trimmed = repository.trim().trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next()?;
    let last = last.strip_suffix(".git").unwrap_or(last);
    let name = last.strip_prefix(EXTENSION_PREFIX).unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
        return None;
    }
    Some(name.to_string())
}

fn plain_executable(path: PathBuf) -> Option<PathBuf> {
    is_executable(&path).then_some(path)
}

/// A managed entry is runnable as-is, or is a checkout holding an executable of the same name.
fn managed_executable(path: &Path) -> Option<PathBuf> {
    if is_executable(path) {
        return Some(path.to_path_buf());
    }
    let inner = path.join(path.file_name()?);
    is_executable(&inner).then_some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<CommandLine>>,
    }

    impl ProcessRunner for Recorder {
        fn run(&self, _ctx: &RunContext, command: &CommandLine) -> Result<(), ExecError> {
            self.calls.borrow_mut().push(command.clone());
            Ok(())
        }
    }

    #[test]
    fn repository_names_are_derived_from_the_last_segment() {
        assert_eq!(name_from_repository("https://github.com/me/machine-setup-dock.git").as_deref(), Some("dock"));
        assert_eq!(name_from_repository("git@github.com:me/fonts").as_deref(), Some("fonts"));
        assert_eq!(name_from_repository("/srv/git/notes/").as_deref(), Some("notes"));
        assert_eq!(name_from_repository("https://github.com/me/"), Some("me".to_string()));
        assert_eq!(name_from_repository("machine-setup-"), None);
        assert_eq!(name_from_repository(".."), None);
    }

    #[test]
    fn install_clones_into_the_managed_directory() {
        let root = TempDir::new().unwrap();
        let managed = root.path().join("extensions");
        let registry = ExtensionRegistry::new(managed.clone(), Vec::new());
        let runner = Recorder::default();

        let name = registry
            .install(&runner, &RunContext::background(), "https://github.com/me/machine-setup-dock.git")
            .unwrap();

        assert_eq!(name, "dock");
        assert!(managed.is_dir());
        assert_eq!(
            *runner.calls.borrow(),
            vec![CommandLine::program(
                "git",
                [
                    "clone".to_string(),
                    "https://github.com/me/machine-setup-dock.git".to_string(),
                    managed.join("machine-setup-dock").to_string_lossy().into_owned(),
                ]
            )]
        );
    }

    #[test]
    fn install_refuses_an_existing_extension() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("machine-setup-dock")).unwrap();
        let registry = ExtensionRegistry::new(root.path().to_path_buf(), Vec::new());
        let runner = Recorder::default();

        let err = registry.install(&runner, &RunContext::background(), "git@github.com:me/dock.git").unwrap_err();

        assert!(matches!(err, ExtensionError::AlreadyInstalled { ref name, .. } if name == "dock"));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn update_pulls_inside_the_checkout() {
        let root = TempDir::new().unwrap();
        let checkout = root.path().join("machine-setup-dock");
        fs::create_dir_all(&checkout).unwrap();
        let registry = ExtensionRegistry::new(root.path().to_path_buf(), Vec::new());
        let runner = Recorder::default();

        registry.update(&runner, &RunContext::background(), "dock").unwrap();

        assert_eq!(
            *runner.calls.borrow(),
            vec![CommandLine::program(
                "git",
                ["-C".to_string(), checkout.to_string_lossy().into_owned(), "pull".to_string()]
            )]
        );
    }

    #[test]
    fn update_of_a_missing_extension_runs_nothing() {
        let root = TempDir::new().unwrap();
        let registry = ExtensionRegistry::new(root.path().to_path_buf(), Vec::new());
        let runner = Recorder::default();

        let err = registry.update(&runner, &RunContext::background(), "ghost").unwrap_err();

        assert!(matches!(err, ExtensionError::NotInstalled(name) if name == "ghost"));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn remove_deletes_checkouts_and_rejects_escaping_names() {
        let root = TempDir::new().unwrap();
        let checkout = root.path().join("machine-setup-dock");
        fs::create_dir_all(checkout.join(".git")).unwrap();
        let registry = ExtensionRegistry::new(root.path().to_path_buf(), Vec::new());

        registry.remove("dock").unwrap();
        assert!(!checkout.exists());

        assert!(matches!(registry.remove("dock"), Err(ExtensionError::NotInstalled(_))));
        assert!(matches!(registry.remove("../x"), Err(ExtensionError::InvalidName(_))));
        assert!(matches!(registry.remove(""), Err(ExtensionError::InvalidName(_))));
    }

    #[test]
    fn unknown_extension_is_reported() {
        let registry = ExtensionRegistry::new(PathBuf::from("/no/such/dir"), Vec::new());
        let err = registry.run(&Recorder::default(), &RunContext::background(), "ghost", &[]).unwrap_err();
        assert!(matches!(err, ExtensionError::NotFound(name) if name == "ghost"));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use pretty_assertions::assert_eq;
        use std::os::unix::fs::PermissionsExt;

        fn install(dir: &Path, file: &str, mode: u32) -> PathBuf {
            fs::create_dir_all(dir).unwrap();
            let path = dir.join(file);
            fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
            path
        }

        #[test]
        fn list_finds_executables_and_honours_search_order() {
            let managed = TempDir::new().unwrap();
            let on_path = TempDir::new().unwrap();
            let fonts = install(managed.path(), "machine-setup-fonts", 0o755);
            install(on_path.path(), "machine-setup-fonts", 0o755);
            let dock = install(on_path.path(), "machine-setup-dock", 0o755);
            install(on_path.path(), "machine-setup-notes", 0o644);
            install(on_path.path(), "unrelated-tool", 0o755);

            let registry = ExtensionRegistry::new(managed.path().into(), vec![on_path.path().into()]);

            assert_eq!(
                registry.list(),
                vec![
                    Extension { name: "dock".into(), path: dock },
                    Extension { name: "fonts".into(), path: fonts },
                ]
            );
        }

        #[test]
        fn cloned_checkout_is_found_by_its_inner_executable() {
            let managed = TempDir::new().unwrap();
            let checkout = managed.path().join("machine-setup-dock");
            let inner = install(&checkout, "machine-setup-dock", 0o755);
            // A checkout without the executable is not an extension.
            fs::create_dir_all(managed.path().join("machine-setup-empty")).unwrap();

            let registry = ExtensionRegistry::new(managed.path().into(), Vec::new());

            assert_eq!(registry.list(), vec![Extension { name: "dock".into(), path: inner.clone() }]);
            assert_eq!(registry.find("dock"), Some(Extension { name: "dock".into(), path: inner }));
            assert_eq!(registry.find("empty"), None);
        }

        #[test]
        fn directories_on_path_are_not_extensions() {
            let on_path = TempDir::new().unwrap();
            install(&on_path.path().join("machine-setup-dock"), "machine-setup-dock", 0o755);

            let registry = ExtensionRegistry::new(PathBuf::from("/no/such/dir"), vec![on_path.path().into()]);
            assert!(registry.list().is_empty());
        }

        #[test]
        fn run_passes_arguments_to_the_extension() {
            let dir = TempDir::new().unwrap();
            let path = install(dir.path(), "machine-setup-dock", 0o755);
            let registry = ExtensionRegistry::new(dir.path().into(), Vec::new());
            let runner = Recorder::default();

            registry
                .run(&runner, &RunContext::background(), "dock", &["--reset".to_string()])
                .unwrap();

            assert_eq!(
                *runner.calls.borrow(),
                vec![CommandLine::program(path.to_string_lossy(), ["--reset"])]
            );
        }

        #[test]
        fn single_executable_cannot_be_updated_but_can_be_removed() {
            let dir = TempDir::new().unwrap();
            let path = install(dir.path(), "machine-setup-dock", 0o755);
            let registry = ExtensionRegistry::new(dir.path().into(), Vec::new());
            let runner = Recorder::default();

            let err = registry.update(&runner, &RunContext::background(), "dock").unwrap_err();
            assert!(matches!(err, ExtensionError::NotACheckout(_)));

            registry.remove("dock").unwrap();
            assert!(!path.exists());
        }
    }
}
