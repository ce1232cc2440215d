// Rendering of the run report printed after a batch, complete or aborted.
// The table is for people, the JSON for scripts; both carry the same stats.

use std::time::Duration;

// For coloring each row by its status.
use colored::{ColoredString, Colorize};
// `prettytable` draws the bordered table; `row!` builds one row with optional styling.
use prettytable::{Table, row};

use crate::libs::stats_recorder::{Stat, total_duration};
use crate::schemas::work_items::Status;

/// Formats a duration the way the report shows it: `850ms`, `4.20s`, `2m 05s`.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    // Short steps read best in milliseconds, long ones in minutes.
    if millis < 1_000 {
        format!("{millis}ms")
    } else if millis < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

fn paint(text: String, status: Status) -> ColoredString {
    match status {
        Status::Success => text.green(),
        Status::Error => text.red(),
    }
}

/// Builds the Name / Duration / Status / Operation table with a trailing Total row.
pub fn render_table(stats: &[Stat]) -> Table {
    let mut table = Table::new();
    // Bold, foreground-colored header.
    table.set_titles(row![bFg => "Name", "Duration", "Status", "Operation"]);
    for stat in stats {
        table.add_row(row![
            paint(stat.name.clone(), stat.status),
            paint(format_duration(stat.duration), stat.status),
            paint(stat.status.to_string(), stat.status),
            paint(stat.operation.to_string(), stat.status),
        ]);
    }
    // Summed over attempted items only; skipped ones never got a stat.
    table.add_row(row![b => "Total", format_duration(total_duration(stats)), "", ""]);
    table
}

/// Prints the report table to stdout, stamped with the local time.
pub fn print_table(stats: &[Stat]) {
    println!();
    println!("{} {}", "Run report".bold(), chrono::Local::now().format("(%Y-%m-%d %H:%M:%S)").to_string().dimmed());
    render_table(stats).printstd();
}

/// Serializes the stats as a pretty JSON array.
pub fn render_json(stats: &[Stat]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(stats)
}
