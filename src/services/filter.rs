//! Record filtering for the list and insights views

use chrono::NaiveDate;

use crate::types::{ExpenseRecord, PaymentMethod};

/// Optional criteria; an empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    /// Inclusive lower bound
    pub start: Option<NaiveDate>,
    /// Inclusive upper bound
    pub end: Option<NaiveDate>,
    pub category: Option<String>,
    pub payment: Option<PaymentMethod>,
    /// Case-insensitive text over description, merchant, category and subcategory
    pub query: Option<String>,
}

impl ExpenseFilter {
    /// Date-range-only filter used by the insights view
    pub fn for_insights(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            start,
            end,
            ..Default::default()
        }
    }

    pub fn in_range(&self, date: NaiveDate) -> bool {
        if self.start.is_some_and(|start| date < start) {
            return false;
        }
        if self.end.is_some_and(|end| date > end) {
            return false;
        }
        true
    }

    fn matches_text(&self, record: &ExpenseRecord) -> bool {
        let needle = match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q.to_lowercase(),
            _ => return true,
        };
        let haystack = format!(
            "{} {} {} {}",
            record.description.as_deref().unwrap_or(""),
            record.merchant.as_deref().unwrap_or(""),
            record.category,
            record.subcategory
        )
        .to_lowercase();
        haystack.contains(&needle)
    }

    pub fn matches(&self, record: &ExpenseRecord) -> bool {
        if !self.in_range(record.date) {
            return false;
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if record.category != category {
                return false;
            }
        }
        if let Some(payment) = self.payment {
            if record.payment_method != payment {
                return false;
            }
        }
        self.matches_text(record)
    }

    /// Matching records, input order preserved
    pub fn apply(&self, records: &[ExpenseRecord]) -> Vec<ExpenseRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Sum of amounts shown next to the filtered list
pub fn filtered_total(records: &[ExpenseRecord]) -> f64 {
    records
        .iter()
        .map(|r| r.amount)
        .filter(|a| a.is_finite())
        .sum()
}

/// Records in the window, oldest first, ready for aggregation
pub fn insights_window(
    records: &[ExpenseRecord],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<ExpenseRecord> {
    let mut window = ExpenseFilter::for_insights(start, end).apply(records);
    window.sort_by_key(|r| r.date);
    window
}
