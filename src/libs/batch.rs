//! # Batch Driver
//!
//! The sequential, fail-fast loop shared by the installation and configuration
//! orchestrators. Each item moves through `Pending -> Running -> {Succeeded | Failed}`:
//!
//! 1. a "starting" line is logged and a stat is opened,
//! 2. the item's main step runs,
//! 3. on failure the stat is finalized as `error` and the batch stops right there,
//!    returning the stats gathered so far together with the error,
//! 4. on success the stat is finalized as `success` and the next item starts.
//!
//! Items after a failed one are never attempted.

use std::path::PathBuf;

// For bold tags and colored item names in the progress lines.
use colored::Colorize;
// Derives `Display` and `Error` for the step and batch errors.
use thiserror::Error;

use crate::libs::executor::ExecError;
use crate::libs::fetcher::FetchError;
use crate::libs::run_context::Interrupted;
use crate::libs::stats_recorder::{Stat, StatsRecorder};
use crate::libs::utilities::url_normalizer::UrlError;
use crate::schemas::work_items::{Operation, Status};
use crate::{log_error, log_info};

/// Why the main step of a single work item failed.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("configuration file already exists at {}. Use --force to overwrite", .0.display())]
    AlreadyExists(PathBuf),
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Url(#[from] UrlError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to create configuration file in {}: {source}", dir.display())]
    TempFile {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write configuration to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to move existing {} aside: {source}", path.display())]
    SetAside {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("configure command executed, but config file not found at {}", .0.display())]
    MissingOutput(PathBuf),
}

impl StepError {
    /// The interruption behind this failure, if the context was cancelled or expired.
    pub fn interruption(&self) -> Option<Interrupted> {
        match self {
            StepError::Exec(e) => e.interruption(),
            StepError::Fetch(FetchError::Interrupted(reason)) => Some(*reason),
            _ => None,
        }
    }
}

/// The error that ended a batch, naming the item that triggered it.
#[derive(Debug, Error)]
#[error("{operation} of '{item}' failed: {source}")]
pub struct BatchError {
    pub item: String,
    pub operation: Operation,
    #[source]
    pub source: StepError,
}

impl BatchError {
    pub fn is_interrupted(&self) -> bool {
        self.source.interruption().is_some()
    }
}

/// Ordered stats of one batch run plus the error that stopped it, if any.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub stats: Vec<Stat>,
    pub error: Option<BatchError>,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs `step` over `items` in order, stopping at the first failure.
///
/// * `tag`: log prefix, e.g. `[Tools]`.
/// * `describe`: yields the name and operation recorded for an item.
/// * `step`: the item's main step.
pub fn run_fail_fast<T, D, F>(tag: &str, items: &[T], describe: D, mut step: F) -> BatchResult
where
    D: Fn(&T) -> (&str, Operation),
    F: FnMut(&T) -> Result<(), StepError>,
{
    // One recorder per batch; it hands back the stats in the order items ran.
    let mut recorder = StatsRecorder::new();

    for (index, item) in items.iter().enumerate() {
        let (name, operation) = describe(item);
        log_info!(
            "{} [{}/{}] {} {}...",
            tag.bold(),
            index + 1,
            items.len(),
            starting_verb(operation),
            name.bright_blue().bold()
        );
        // The clock starts here, so the duration includes everything the step does.
        let pending = recorder.start(name, operation);

        match step(item) {
            Ok(()) => {
                let stat = recorder.finish(pending, Status::Success);
                log_info!("{} {} {}", tag.bold(), "Done:".green(), stat.name.bold().green());
            }
            Err(source) => {
                // Record the failure first so the partial report includes this item.
                recorder.finish(pending, Status::Error);
                log_error!("{} Failed to {} {}: {}", tag.bold(), operation_verb(operation), name.bold().red(), source);
                let remaining = items.len() - index - 1;
                if remaining > 0 {
                    log_error!("{} Aborting batch; {} remaining item(s) not attempted.", tag.bold(), remaining);
                }
                return BatchResult {
                    stats: recorder.into_stats(),
                    error: Some(BatchError { item: name.to_string(), operation, source }),
                };
            }
        }
    }

    BatchResult { stats: recorder.into_stats(), error: None }
}

fn starting_verb(operation: Operation) -> &'static str {
    match operation {
        Operation::Install => "Installing",
        Operation::Configure => "Configuring",
    }
}

fn operation_verb(operation: Operation) -> &'static str {
    match operation {
        Operation::Install => "install",
        Operation::Configure => "configure",
    }
}
