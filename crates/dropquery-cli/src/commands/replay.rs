//! Replay command implementation.
//!
//! A trace is a JSON-lines file of page events, one per line, each with an
//! optional `at_ms` timestamp:
//!
//! ```text
//! {"type":"navigated","url":"https://chatgpt.com/"}
//! {"type":"request","url":"https://chatgpt.com/backend-api/conversation","method":"POST","transport":"fetch","status":200,"at_ms":1000}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use dropquery_core::{
    Clock, DetectorHub, PageEvent, QueryTracker, TrackerStats, candidate_channel,
};
use dropquery_types::{ThrottleGate, VolumeEstimates, format_volume};

use crate::cli::OutputFormat;
use crate::format::{plural, to_json};
use crate::util::{Session, write_output};

/// One line of a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayLine {
    /// Milliseconds since the Unix epoch; the current time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_ms: Option<u64>,
    #[serde(flatten)]
    pub event: PageEvent,
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    events: usize,
    candidates: usize,
    #[serde(flatten)]
    stats: TrackerStats,
    daily_usage_ml: f64,
}

/// Parse a trace, reporting the line number of the first bad line.
pub fn parse_trace(content: &str) -> Result<Vec<ReplayLine>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Invalid page event on line {}", index + 1))
        })
        .collect()
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read trace from stdin")?;
        Ok(content)
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read trace: {}", input.display()))
    }
}

pub async fn cmd_replay(
    session: &Session,
    estimates: VolumeEstimates,
    throttle_window_ms: u64,
    clock: Arc<dyn Clock>,
    input: &Path,
    format: OutputFormat,
) -> Result<()> {
    let trace = parse_trace(&read_input(input)?)?;
    debug!("Replaying {} page events", trace.len());

    let (tx, rx) = candidate_channel();
    let mut hub = DetectorHub::new(estimates, session.ledger.context().clone(), clock, tx);
    let mut candidates = 0;
    for line in &trace {
        candidates += match line.at_ms {
            Some(at_ms) => hub.handle_at(line.event.clone(), at_ms),
            None => hub.handle(line.event.clone()),
        };
    }
    drop(hub);

    let tracker = QueryTracker::new(
        Arc::clone(&session.ledger),
        ThrottleGate::with_window_ms(throttle_window_ms),
    );
    let stats = tracker.run(rx, CancellationToken::new()).await;
    let summary = session.ledger.summary().await.context("Failed to read ledger")?;

    let report = ReplayReport {
        events: trace.len(),
        candidates,
        stats,
        daily_usage_ml: summary.daily_usage_ml,
    };
    let content = match format {
        OutputFormat::Json => to_json(&report)?,
        OutputFormat::Text | OutputFormat::Csv => format!(
            "Replayed {} {}: {} {}, {} recorded, {} throttled. Today: {}\n",
            report.events,
            plural(report.events, "event", "events"),
            report.candidates,
            plural(report.candidates, "candidate", "candidates"),
            report.stats.recorded,
            report.stats.rejected,
            format_volume(report.daily_usage_ml, summary.display_unit)
        ),
    };
    write_output(None, &content)
}
