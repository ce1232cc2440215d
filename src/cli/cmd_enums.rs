use crate::cli::type_enums::OutputFormat;
use clap::{Args, Parser, Subcommand};

/// Defines the command-line interface (CLI) for 'machine-setup'.
#[derive(Parser)]
#[command(name = "machine-setup")]
#[command(version, about = "Bootstrap a development machine from a declarative list of tools and configs")]
pub struct Cli {
    /// Enables detailed debug output for troubleshooting.
    #[arg(short, long, global = true)]
    pub(crate) debug: bool,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

/// Options shared by every command that runs a batch.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Path to the setup document (defaults to ~/.machine-setup/config.yaml).
    #[arg(long, env = "MACHINE_SETUP_CONFIG")]
    pub config: Option<String>,
    /// Reinstall tools and overwrite existing configuration files.
    #[arg(long)]
    pub force: bool,
    /// Never prompt; use flags and defaults only.
    #[arg(long)]
    pub non_interactive: bool,
    /// Abort the whole run after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
    /// Report format printed after the run.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

/// Enumerates all supported subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Install the tools listed in the setup document, or a single prerequisite.
    Install {
        /// Install only this prerequisite instead of the document's tools.
        #[command(subcommand)]
        target: Option<InstallTarget>,
        #[command(flatten)]
        opts: RunOptions,
    },
    /// Put the configuration files listed in the setup document in place.
    Configure(RunOptions),
    /// Install every tool, then apply every configuration, as one batch.
    Now(RunOptions),
    /// List, run, install, update or remove `machine-setup-<name>` extensions.
    Extension {
        #[command(subcommand)]
        action: ExtensionCommands,
    },
    /// Show the current version and check for a newer release.
    Version,
}

/// Prerequisites that can be installed on their own, before any setup document exists.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallTarget {
    /// Install the Xcode command-line tools (skipped if already present).
    Xcode,
    /// Install Homebrew (skipped if `brew` is already installed) and add it to PATH.
    Homebrew,
}

#[derive(Subcommand)]
pub enum ExtensionCommands {
    /// List discovered extensions.
    List,
    /// Run an extension, passing the remaining arguments through.
    Run {
        /// Extension name, without the `machine-setup-` prefix.
        name: String,
        /// Arguments handed to the extension.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Install an extension by cloning its git repository.
    Install {
        /// Clone URL or path, e.g. https://github.com/me/machine-setup-dock.git
        repository: String,
    },
    /// Update an installed extension with `git pull`.
    Update {
        /// Extension name, without the `machine-setup-` prefix.
        name: String,
    },
    /// Remove an installed extension.
    Remove {
        /// Extension name, without the `machine-setup-` prefix.
        name: String,
    },
}
