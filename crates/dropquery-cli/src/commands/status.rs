//! Status command implementation.

use anyhow::{Context, Result};

use crate::cli::{OutputArgs, OutputFormat};
use crate::format::{format_summary_csv, format_summary_text, to_json};
use crate::util::{Session, write_output};

pub async fn cmd_status(session: &Session, output: &OutputArgs) -> Result<()> {
    let summary = session
        .ledger
        .summary()
        .await
        .context("Failed to read ledger")?;

    let content = match output.format {
        OutputFormat::Text => format_summary_text(&summary),
        OutputFormat::Json => to_json(&summary)?,
        OutputFormat::Csv => format_summary_csv(&summary),
    };
    write_output(output.output.as_ref(), &content)
}
