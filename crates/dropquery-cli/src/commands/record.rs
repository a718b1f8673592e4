//! Record command implementation.

use anyhow::{Context, Result};
use dropquery_types::{ModelTag, VolumeEstimates, format_volume};
use tracing::info;

use crate::cli::OutputFormat;
use crate::format::to_json;
use crate::util::{Session, write_output};

pub async fn cmd_record(
    session: &Session,
    estimates: &VolumeEstimates,
    model: &str,
    volume: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let model = ModelTag::parse_lenient(model);
    let volume = volume.unwrap_or_else(|| estimates.estimate(model));

    let record = session
        .ledger
        .record_query(model, volume)
        .await
        .context("Failed to record query")?;
    let summary = session.ledger.summary().await.context("Failed to read ledger")?;
    info!("Recorded {} query by hand", model);

    let content = match format {
        OutputFormat::Json => to_json(&record)?,
        OutputFormat::Text | OutputFormat::Csv => format!(
            "Recorded {} for {}. Today: {}\n",
            format_volume(record.water_usage_ml, summary.display_unit),
            record.model,
            format_volume(summary.daily_usage_ml, summary.display_unit)
        ),
    };
    write_output(None, &content)
}
