//! # Stats Recorder
//!
//! Per-item outcome records for one batch run.
//!
//! A [`Stat`] is opened with [`StatsRecorder::start`] when an item begins and is
//! appended, finalized, by [`StatsRecorder::finish`] when the item ends, whatever
//! the outcome. Appended stats are never changed again. The recorder is owned by
//! the orchestrator's sequential loop, so no locking is involved.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::schemas::work_items::{Operation, Status};

/// Outcome record of one work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stat {
    pub name: String,
    pub operation: Operation,
    pub status: Status,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

// Whole milliseconds are plenty for install steps and keep the JSON readable.
fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

/// A stat whose item is still being processed.
#[derive(Debug)]
#[must_use = "a started stat must be finished to be recorded"]
pub struct PendingStat {
    name: String,
    operation: Operation,
    started: Instant,
}

#[derive(Debug, Default)]
pub struct StatsRecorder {
    stats: Vec<Stat>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the clock for `name`.
    pub fn start(&self, name: &str, operation: Operation) -> PendingStat {
        PendingStat { name: name.to_string(), operation, started: Instant::now() }
    }

    /// Finalizes `pending` with `status` and the elapsed time, and appends it.
    pub fn finish(&mut self, pending: PendingStat, status: Status) -> &Stat {
        let stat = Stat {
            name: pending.name,
            operation: pending.operation,
            status,
            duration: pending.started.elapsed(),
        };
        self.stats.push(stat);
        &self.stats[self.stats.len() - 1]
    }

    pub fn into_stats(self) -> Vec<Stat> {
        self.stats
    }
}

/// Sum of all recorded durations.
pub fn total_duration(stats: &[Stat]) -> Duration {
    stats.iter().map(|s| s.duration).sum()
}
