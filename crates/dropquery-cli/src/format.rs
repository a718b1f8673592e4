//! Output formatting for ledger data.

use anyhow::{Context, Result};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;

use dropquery_types::ledger::format_date;
use dropquery_types::{DailyTotal, DisplayUnit, LedgerSummary, UsageRecord, format_volume};

/// Serialize `value` as pretty JSON with a trailing newline.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    Ok(json + "\n")
}

#[must_use]
pub fn format_summary_text(summary: &LedgerSummary) -> String {
    let unit = summary.display_unit;
    let mut out = String::new();
    out.push_str(&format!(
        "Today:    {} ({} {})\n",
        format_volume(summary.daily_usage_ml, unit),
        summary.queries_today,
        plural(summary.queries_today, "query", "queries")
    ));
    out.push_str(&format!(
        "Week:     {}\n",
        format_volume(summary.weekly_usage_ml, unit)
    ));
    out.push_str(&format!(
        "Total:    {}\n",
        format_volume(summary.total_usage_ml, unit)
    ));
    if summary.average_usage_ml > 0.0 {
        out.push_str(&format!(
            "Average:  {} per day\n",
            format_volume(summary.average_usage_ml, unit)
        ));
    } else {
        out.push_str("Average:  not enough data yet\n");
    }
    if let Some(last) = &summary.last_record {
        out.push_str(&format!(
            "Last:     {} {} on {}\n",
            last.model,
            format_volume(last.water_usage_ml, unit),
            format_date(last.date)
        ));
    }
    out
}

#[must_use]
pub fn format_summary_csv(summary: &LedgerSummary) -> String {
    format!(
        "daily_usage_ml,weekly_usage_ml,total_usage_ml,average_usage_ml,query_count,queries_today,display_unit\n{},{},{},{},{},{},{}\n",
        summary.daily_usage_ml,
        summary.weekly_usage_ml,
        summary.total_usage_ml,
        summary.average_usage_ml,
        summary.query_count,
        summary.queries_today,
        summary.display_unit
    )
}

#[must_use]
pub fn format_history_text(records: &[UsageRecord], unit: DisplayUnit) -> String {
    if records.is_empty() {
        return "No queries recorded.\n".to_string();
    }
    let mut out = format!("{:<25} {:<12} {:>12}\n", "Time", "Model", "Water");
    out.push_str(&format!("{}\n", "-".repeat(51)));
    for record in records {
        let time = record
            .timestamp
            .format(&Rfc3339)
            .unwrap_or_else(|_| format_date(record.date));
        out.push_str(&format!(
            "{:<25} {:<12} {:>12}\n",
            time,
            record.model.as_str(),
            format_volume(record.water_usage_ml, unit)
        ));
    }
    out
}

#[must_use]
pub fn format_daily_text(totals: &[DailyTotal], unit: DisplayUnit) -> String {
    if totals.is_empty() {
        return "No archived days yet.\n".to_string();
    }
    let mut out = format!("{:<12} {:>12}\n", "Date", "Water");
    out.push_str(&format!("{}\n", "-".repeat(25)));
    for total in totals {
        out.push_str(&format!(
            "{:<12} {:>12}\n",
            format_date(total.date),
            format_volume(total.usage_ml, unit)
        ));
    }
    out
}

/// Write records through the store's CSV exporter.
pub fn format_history_csv(records: &[UsageRecord]) -> Result<String> {
    let mut buf = Vec::new();
    dropquery_store::write_history_csv(records, &mut buf).context("Failed to write CSV")?;
    String::from_utf8(buf).context("CSV output was not UTF-8")
}

pub fn format_daily_csv(totals: &[DailyTotal]) -> Result<String> {
    let mut buf = Vec::new();
    dropquery_store::write_daily_totals_csv(totals, &mut buf).context("Failed to write CSV")?;
    String::from_utf8(buf).context("CSV output was not UTF-8")
}

pub(crate) fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}
