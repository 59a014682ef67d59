//! Aggregated spending insights

use serde::Serialize;

/// One time bucket of the spending series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Bucket key (`YYYY-MM-DD`, `YYYY-Www`, `YYYY-MM` or `YYYY`)
    pub key: String,
    pub total: f64,
}

/// One label of a categorical breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownEntry {
    pub label: String,
    pub total: f64,
}

/// Category, payment, kind and delivery-provider totals, each sorted by total descending
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Breakdowns {
    pub by_category: Vec<BreakdownEntry>,
    pub by_payment: Vec<BreakdownEntry>,
    pub by_kind: Vec<BreakdownEntry>,
    pub by_delivery_provider: Vec<BreakdownEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct InsightStats {
    pub total: f64,
    pub average_per_day: f64,
    /// `None` when there is nothing to rank
    pub top_category: Option<String>,
}

/// Everything the insights view needs, rebuilt on every request
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct InsightsResult {
    /// Sorted by key ascending
    pub series: Vec<SeriesPoint>,
    pub breakdowns: Breakdowns,
    pub stats: InsightStats,
}

impl InsightsResult {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
