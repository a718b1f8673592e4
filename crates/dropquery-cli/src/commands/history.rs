//! History command implementation.

use anyhow::{Context, Result, bail};
use dropquery_store::HistoryQuery;
use dropquery_types::ModelTag;

use crate::cli::{OutputArgs, OutputFormat};
use crate::format::{
    format_daily_csv, format_daily_text, format_history_csv, format_history_text, to_json,
};
use crate::util::{Session, parse_date_arg, write_output};

/// Arguments for the history command.
pub struct HistoryArgs<'a> {
    pub output: &'a OutputArgs,
    pub model: Option<ModelTag>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub count: u32,
    pub daily: bool,
}

pub async fn cmd_history(session: &Session, args: HistoryArgs<'_>) -> Result<()> {
    let HistoryArgs {
        output,
        model,
        since,
        until,
        count,
        daily,
    } = args;

    // Parse date filters upfront to fail fast
    let since = since.as_deref().map(parse_date_arg).transpose()?;
    let until = until.as_deref().map(parse_date_arg).transpose()?;
    if let (Some(since), Some(until)) = (since, until)
        && since > until
    {
        bail!("--since must not be after --until");
    }

    let unit = session.ledger.state().await.context("Failed to read ledger")?.display_unit;

    let content = if daily {
        let mut totals = session
            .ledger
            .storage()
            .with_store(|store| store.daily_totals())
            .await
            .context("Failed to read daily totals")?;
        totals.retain(|t| since.is_none_or(|s| t.date >= s) && until.is_none_or(|u| t.date <= u));
        if count > 0 {
            let skip = totals.len().saturating_sub(count as usize);
            totals.drain(..skip);
        }
        match output.format {
            OutputFormat::Text => format_daily_text(&totals, unit),
            OutputFormat::Json => to_json(&totals)?,
            OutputFormat::Csv => format_daily_csv(&totals)?,
        }
    } else {
        let mut query = HistoryQuery::new();
        if let Some(model) = model {
            query = query.model(model);
        }
        if let Some(since) = since {
            query = query.since(since);
        }
        if let Some(until) = until {
            query = query.until(until);
        }
        if count > 0 {
            query = query.limit(count);
        }
        let records = session
            .ledger
            .storage()
            .with_store(|store| store.query_history(&query))
            .await
            .context("Failed to query history")?;
        match output.format {
            OutputFormat::Text => format_history_text(&records, unit),
            OutputFormat::Json => to_json(&records)?,
            OutputFormat::Csv => format_history_csv(&records)?,
        }
    };

    write_output(output.output.as_ref(), &content)
}
