//! Message command implementation.

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use dropquery_core::{
    EquivalenceConstants, ImpactMessage, MessageGenerator, SummaryFigures, SummaryFrequency,
    summary_text,
};

use crate::cli::OutputFormat;
use crate::format::to_json;
use crate::util::{Session, write_output};

/// Arguments for the message command.
pub struct MessageArgs {
    pub daily: Option<f64>,
    pub average: Option<f64>,
    pub summary: Option<SummaryFrequency>,
    pub seed: Option<u64>,
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    frequency: SummaryFrequency,
    text: &'a str,
}

pub async fn cmd_message(
    session: &Session,
    constants: EquivalenceConstants,
    args: MessageArgs,
) -> Result<()> {
    let summary = session.ledger.summary().await.context("Failed to read ledger")?;
    let figures = SummaryFigures {
        daily_ml: args.daily.unwrap_or(summary.daily_usage_ml),
        weekly_ml: summary.weekly_usage_ml,
        total_ml: summary.total_usage_ml,
        average_ml: args.average.unwrap_or(summary.average_usage_ml),
    };
    let unit = summary.display_unit;

    let content = if let Some(frequency) = args.summary {
        let text = summary_text(frequency, figures, unit, &constants);
        match args.format {
            OutputFormat::Json => to_json(&SummaryOutput {
                frequency,
                text: &text,
            })?,
            OutputFormat::Text | OutputFormat::Csv => format!("{}\n", text),
        }
    } else {
        let rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut generator = MessageGenerator::with_rng(constants, rng);
        let message: ImpactMessage = generator.message(figures.daily_ml, figures.average_ml, unit);
        match args.format {
            OutputFormat::Json => to_json(&message)?,
            OutputFormat::Text | OutputFormat::Csv => format!("{}\n", message.text),
        }
    };
    write_output(None, &content)
}
