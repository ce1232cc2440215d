// `machine-setup install`: installs the tools listed under `tools:`.
// `machine-setup install xcode|homebrew` installs one prerequisite instead; those
// don't need a setup document, so the document is never loaded for them.

use anyhow::Result;

use crate::cli::cmd_enums::{InstallTarget, RunOptions};
use crate::commands::{build_context, finish, prepare};
use crate::libs::bootstrap::Bootstrapper;
use crate::libs::executor::SystemProcessRunner;
use crate::libs::tool_installer::ToolInstaller;
use crate::{log_debug, log_info};

pub fn run(target: Option<InstallTarget>, opts: RunOptions) -> Result<()> {
    log_debug!("Entered install::run() function.");
    if let Some(target) = target {
        return install_prerequisite(target, &opts);
    }

    let prepared = prepare(&opts)?;

    if prepared.config.tools.is_empty() {
        log_info!("[Tools] No tools listed in the setup document. Nothing to install.");
        return Ok(());
    }

    let runner = SystemProcessRunner::new();
    let result = ToolInstaller::new(&runner, prepared.force).install_tools(&prepared.ctx, &prepared.config.tools);
    finish(result, opts.output)?;

    log_info!("'machine-setup install' command completed!!");
    Ok(())
}

fn install_prerequisite(target: InstallTarget, opts: &RunOptions) -> Result<()> {
    // Only the deadline applies here; there is no document, no force and no report.
    let ctx = build_context(opts.timeout);
    let runner = SystemProcessRunner::new();
    let bootstrapper = Bootstrapper::new(&runner);

    let (label, outcome) = match target {
        InstallTarget::Xcode => ("xcode", bootstrapper.install_xcode(&ctx)?),
        InstallTarget::Homebrew => ("homebrew", bootstrapper.install_homebrew(&ctx)?),
    };
    log_debug!("[Bootstrap] {} finished: {:?}", label, outcome);
    log_info!("'machine-setup install {}' command completed!!", label);
    Ok(())
}
