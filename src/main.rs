mod cli;
mod commands;
mod libs;
mod logger;
mod schemas;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::cmd_enums::{Cli, Commands};
use crate::libs::batch::BatchError;
use crate::libs::executor::ExecError;
use crate::libs::extensions::ExtensionError;

/// Exit status when the run was cancelled (Ctrl-C) or hit its deadline.
const EXIT_CANCELLED: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.debug);

    let outcome = match cli.command {
        Commands::Install { target, opts } => commands::install::run(target, opts),
        Commands::Configure(opts) => commands::configure::run(opts),
        Commands::Now(opts) => commands::now::run(opts),
        Commands::Extension { action } => commands::extension::run(action),
        Commands::Version => commands::version::run(),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_interrupted(&e) => {
            crate::log_warn!("{:#}", e);
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            crate::log_error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Whether `error` comes from a cancelled or expired run rather than a real failure.
fn is_interrupted(error: &anyhow::Error) -> bool {
    if let Some(batch) = error.downcast_ref::<BatchError>() {
        return batch.is_interrupted();
    }
    // `install xcode|homebrew` surfaces executor errors directly.
    if let Some(exec) = error.downcast_ref::<ExecError>() {
        return exec.interruption().is_some();
    }
    matches!(error.downcast_ref::<ExtensionError>(), Some(ExtensionError::Exec(e)) if e.interruption().is_some())
}
