// One module per subcommand, plus the plumbing every batch command shares:
// building the execution context, prompting, loading the document and printing the report.

pub mod configure;
pub mod extension;
pub mod install;
pub mod now;
pub mod version;

use std::io::IsTerminal;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::console::Term;
use dialoguer::{Confirm, Input};

use crate::cli::cmd_enums::RunOptions;
use crate::cli::type_enums::OutputFormat;
use crate::libs::batch::BatchResult;
use crate::libs::config_loading::{SetupConfig, load_setup_config};
use crate::libs::paths::{default_config_path, resolve_config_path};
use crate::libs::report;
use crate::libs::run_context::RunContext;
use crate::libs::stats_recorder::Stat;
use crate::{log_debug, log_info, log_warn};

/// Exit status used when a second Ctrl-C forces the process down (128 + SIGINT).
const EXIT_INTERRUPTED: i32 = 130;

/// Everything a batch command needs once flags and prompts are settled.
pub(crate) struct Prepared {
    pub ctx: RunContext,
    pub config: SetupConfig,
    pub force: bool,
}

/// Resolves options, asks for missing ones when interactive, loads the document
/// and builds the execution context with its Ctrl-C handler.
pub(crate) fn prepare(opts: &RunOptions) -> Result<Prepared> {
    let interactive = !opts.non_interactive && std::io::stdin().is_terminal();
    log_debug!("[Setup] Interactive mode: {}", interactive);

    let config_arg = match (&opts.config, interactive) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(prompt_config_path()?),
        (None, false) => None,
    };
    let config_path = resolve_config_path(config_arg.as_deref());
    log_info!("Using configuration file: {}", config_path.display().to_string().cyan());

    let config = load_setup_config(&config_path)?;

    let force = if opts.force || !interactive { opts.force } else { prompt_force()? };

    let ctx = build_context(opts.timeout);
    Ok(Prepared { ctx, config, force })
}

fn prompt_config_path() -> Result<String> {
    let default = default_config_path().display().to_string();
    Input::<String>::new()
        .with_prompt("Setup document")
        .default(default)
        .interact_text_on(&Term::stderr())
        .context("failed to read the setup document path")
}

fn prompt_force() -> Result<bool> {
    Confirm::new()
        .with_prompt("Reinstall tools and overwrite existing configuration files?")
        .default(false)
        .interact_on(&Term::stderr())
        .context("failed to read the force confirmation")
}

/// Root context for one command. Ctrl-C cancels it, which kills the running child.
pub(crate) fn build_context(timeout_secs: Option<u64>) -> RunContext {
    let ctx = match timeout_secs {
        Some(secs) => {
            log_debug!("[Setup] Run deadline: {}s", secs);
            RunContext::with_timeout(Duration::from_secs(secs))
        }
        None => RunContext::background(),
    };

    // The first Ctrl-C cancels the context and lets the current step unwind, so the
    // partial report still gets printed. A second one exits on the spot.
    let handle = ctx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if handle.is_cancelled() {
            log_warn!("Second interrupt received, exiting immediately.");
            std::process::exit(EXIT_INTERRUPTED);
        }
        log_warn!("Interrupt received, stopping the current step... (press Ctrl-C again to exit now)");
        handle.cancel();
    }) {
        log_warn!("Could not install the Ctrl-C handler: {}", e);
    }
    ctx
}

/// Prints the (possibly partial) report, then turns the batch outcome into the command's result.
pub(crate) fn finish(result: BatchResult, output: OutputFormat) -> Result<()> {
    print_report(&result.stats, output)?;
    match result.error {
        None => Ok(()),
        Some(error) => Err(error.into()),
    }
}

pub(crate) fn print_report(stats: &[Stat], output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Table => report::print_table(stats),
        OutputFormat::Json => println!("{}", report::render_json(stats).context("failed to render the JSON report")?),
    }
    Ok(())
}
