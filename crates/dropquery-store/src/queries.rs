//! Query builder for retained usage history.
//!
//! History is stored as one JSON array, so filtering happens in memory after
//! the document is loaded.

use time::Date;

use dropquery_types::{ModelTag, UsageRecord};

/// Query builder for usage records.
///
/// # Example
///
/// ```
/// use dropquery_store::HistoryQuery;
/// use dropquery_types::ModelTag;
/// use time::macros::date;
///
/// let query = HistoryQuery::new()
///     .model(ModelTag::Claude)
///     .since(date!(2024 - 01 - 01))
///     .limit(10)
///     .oldest_first();
/// ```
#[derive(Debug, Default, Clone)]
pub struct HistoryQuery {
    /// Filter by model (optional).
    pub model: Option<ModelTag>,
    /// Include only records dated on or after this date (optional).
    pub since: Option<Date>,
    /// Include only records dated on or before this date (optional).
    pub until: Option<Date>,
    /// Maximum number of results to return (optional).
    pub limit: Option<u32>,
    /// Number of results to skip (optional).
    pub offset: Option<u32>,
    /// If true, newest records come first. Default: true.
    pub newest_first: bool,
}

impl HistoryQuery {
    /// Create a new query: no filters, no limit, newest first.
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Only include records attributed to `model`.
    pub fn model(mut self, model: ModelTag) -> Self {
        self.model = Some(model);
        self
    }

    /// Filter to records dated on or after `date`.
    pub fn since(mut self, date: Date) -> Self {
        self.since = Some(date);
        self
    }

    /// Filter to records dated on or before `date`.
    pub fn until(mut self, date: Date) -> Self {
        self.until = Some(date);
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results chronologically.
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Whether a single record passes the filters.
    pub fn matches(&self, record: &UsageRecord) -> bool {
        self.model.is_none_or(|m| record.model == m)
            && self.since.is_none_or(|d| record.date >= d)
            && self.until.is_none_or(|d| record.date <= d)
    }

    /// Apply filters, ordering and pagination to `records`.
    ///
    /// `records` is expected in append order (oldest first).
    pub fn apply(&self, records: &[UsageRecord]) -> Vec<UsageRecord> {
        let mut matched: Vec<UsageRecord> = records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.timestamp);
        if self.newest_first {
            matched.reverse();
        }

        let offset = self.offset.unwrap_or(0) as usize;
        let limit = self.limit.map_or(usize::MAX, |l| l as usize);
        matched.into_iter().skip(offset).take(limit).collect()
    }
}
