// `machine-setup now`: every tool, then every configuration item, as one fail-fast batch
// with a single report.

use anyhow::Result;

use crate::cli::cmd_enums::RunOptions;
use crate::commands::{finish, prepare};
use crate::libs::config_applier::ConfigApplier;
use crate::libs::executor::SystemProcessRunner;
use crate::libs::fetcher::HttpFetcher;
use crate::libs::setup_runner::SetupRunner;
use crate::libs::tool_installer::ToolInstaller;
use crate::{log_debug, log_info};

pub fn run(opts: RunOptions) -> Result<()> {
    log_debug!("Entered now::run() function.");
    let prepared = prepare(&opts)?;

    let items = prepared.config.into_work_items();
    if items.is_empty() {
        log_info!("The setup document lists no tools and no configuration items. Nothing to do.");
        return Ok(());
    }

    let runner = SystemProcessRunner::new();
    let fetcher = HttpFetcher::new();
    let setup = SetupRunner::new(
        ToolInstaller::new(&runner, prepared.force),
        ConfigApplier::new(&runner, &fetcher, prepared.force),
    );
    log_info!("[Setup] Processing {} item(s)...", items.len());
    let result = setup.run(&prepared.ctx, &items);
    finish(result, opts.output)?;

    log_info!("'machine-setup now' command completed!!");
    Ok(())
}
