// `machine-setup configure`: puts the files listed under `configure:` in place.

use anyhow::Result;

use crate::cli::cmd_enums::RunOptions;
use crate::commands::{finish, prepare};
use crate::libs::config_applier::ConfigApplier;
use crate::libs::executor::SystemProcessRunner;
use crate::libs::fetcher::HttpFetcher;
use crate::{log_debug, log_info};

pub fn run(opts: RunOptions) -> Result<()> {
    log_debug!("Entered configure::run() function.");
    let prepared = prepare(&opts)?;

    if prepared.config.configure.is_empty() {
        log_info!("[Configure] No configuration items listed in the setup document. Nothing to apply.");
        return Ok(());
    }

    let runner = SystemProcessRunner::new();
    let fetcher = HttpFetcher::new();
    let result = ConfigApplier::new(&runner, &fetcher, prepared.force)
        .apply_configs(&prepared.ctx, &prepared.config.configure);
    finish(result, opts.output)?;

    log_info!("'machine-setup configure' command completed!!");
    Ok(())
}
