//! CSV export of usage history and archived daily totals.

use std::io::Write;

use serde::Serialize;
use time::format_description::well_known::Rfc3339;

use dropquery_types::ledger::format_date;
use dropquery_types::{DailyTotal, UsageRecord};

use crate::error::Result;

#[derive(Serialize)]
struct HistoryRow<'a> {
    date: String,
    timestamp: String,
    model: &'a str,
    water_usage_ml: f64,
}

#[derive(Serialize)]
struct DailyRow {
    date: String,
    usage_ml: f64,
}

/// Write usage records as CSV with a header row.
///
/// Columns: `date,timestamp,model,water_usage_ml`.
pub fn write_history_csv<W: Write>(records: &[UsageRecord], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(HistoryRow {
            date: format_date(record.date),
            timestamp: record.timestamp.format(&Rfc3339)?,
            model: record.model.as_str(),
            water_usage_ml: record.water_usage_ml,
        })?;
    }
    if records.is_empty() {
        csv.write_record(["date", "timestamp", "model", "water_usage_ml"])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write archived daily totals as CSV with a header row.
///
/// Columns: `date,usage_ml`.
pub fn write_daily_totals_csv<W: Write>(totals: &[DailyTotal], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for total in totals {
        csv.serialize(DailyRow {
            date: format_date(total.date),
            usage_ml: total.usage_ml,
        })?;
    }
    if totals.is_empty() {
        csv.write_record(["date", "usage_ml"])?;
    }
    csv.flush()?;
    Ok(())
}
