//! Date-key derivation for period bucketing

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{parse_calendar_date, ExpenseError, Result};

/// Granularity of the insights series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodMode {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl PeriodMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
        }
    }

    /// Column header for the bucket key
    pub fn key_column_label(&self) -> &'static str {
        match self {
            Self::Daily => "Date",
            Self::Weekly => "Week",
            Self::Monthly => "Month",
            Self::Yearly => "Year",
        }
    }
}

impl FromStr for PeriodMode {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(ExpenseError::Parse(format!("unknown period mode: {}", other))),
        }
    }
}

impl fmt::Display for PeriodMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label().to_lowercase())
    }
}

/// Week number within the year: `ceil((day_of_year + weekday_of_jan1) / 7)`.
///
/// `weekday_of_jan1` counts from Sunday = 0. This is not ISO-8601 week
/// numbering; late-December dates can land in week 53 or 54.
pub fn week_of_year(date: NaiveDate) -> u32 {
    let day_of_year = date.ordinal();
    let jan1_weekday = NaiveDate::from_ymd_opt(date.year(), 1, 1)
        .map(|jan1| jan1.weekday().num_days_from_sunday())
        .unwrap_or(0);
    (day_of_year + jan1_weekday).div_ceil(7)
}

/// Grouping key of `date` for the given granularity
pub fn derive_bucket_key(date: NaiveDate, mode: PeriodMode) -> String {
    match mode {
        PeriodMode::Daily => date.format("%Y-%m-%d").to_string(),
        PeriodMode::Weekly => format!("{:04}-W{:02}", date.year(), week_of_year(date)),
        PeriodMode::Monthly => date.format("%Y-%m").to_string(),
        PeriodMode::Yearly => format!("{:04}", date.year()),
    }
}

/// [`derive_bucket_key`] for a raw `YYYY-MM-DD` string; malformed input is an error.
pub fn bucket_key_for(date: &str, mode: PeriodMode) -> Result<String> {
    Ok(derive_bucket_key(parse_calendar_date(date)?, mode))
}
