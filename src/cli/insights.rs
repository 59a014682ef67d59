//! `insights` subcommand

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use serde::Serialize;

use super::render::{period_header, render_insights};
use super::Context;
use crate::services::filter::insights_window;
use crate::services::{build_insights, PeriodMode, RecordStore};
use crate::types::{parse_calendar_date, ExpenseError, InsightsResult, Result};

/// Period selector. `range` is a daily series over an explicit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Range,
}

impl ReportPeriod {
    pub fn mode(self) -> PeriodMode {
        match self {
            Self::Daily | Self::Range => PeriodMode::Daily,
            Self::Weekly => PeriodMode::Weekly,
            Self::Monthly => PeriodMode::Monthly,
            Self::Yearly => PeriodMode::Yearly,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Range => "Range",
            other => other.mode().label(),
        }
    }
}

#[derive(Serialize)]
struct InsightsReport<'a> {
    period: PeriodMode,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    #[serde(flatten)]
    insights: &'a InsightsResult,
}

/// Show spending insights for a period
#[derive(Args, Debug, Default)]
pub struct InsightsArgs {
    /// Series granularity
    #[arg(long, value_enum, default_value_t = ReportPeriod::Daily)]
    pub period: ReportPeriod,

    /// First day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_calendar_date)]
    pub start: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_calendar_date)]
    pub end: Option<NaiveDate>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl InsightsArgs {
    pub fn run(self, ctx: &Context) -> Result<String> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ExpenseError::Validation(format!(
                    "start {} is after end {}",
                    start, end
                )));
            }
        }

        let records = ctx.records().list()?;
        let window = insights_window(&records, self.start, self.end);
        let mode = self.period.mode();
        let result = build_insights(&window, mode);

        if self.json {
            let report = InsightsReport {
                period: mode,
                start: self.start,
                end: self.end,
                insights: &result,
            };
            return serde_json::to_string_pretty(&report)
                .map_err(|e| ExpenseError::Parse(format!("Serialization failed: {}", e)));
        }

        let header = period_header(self.period.label(), self.start, self.end);
        Ok(render_insights(&result, &header, mode.key_column_label()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support::{make_context, run};

    fn seed(ctx: &Context) {
        for (date, amount, category, payment) in [
            ("2024-03-01", "100", "Alimentação", "pix"),
            ("2024-03-02", "50", "Alimentação", "debit"),
            ("2024-03-02", "30", "Transporte", "pix"),
            ("2024-05-10", "20", "Lazer", "pix"),
        ] {
            run(
                ctx,
                &[
                    "add", "--date", date, "--amount", amount, "--category", category,
                    "--payment", payment,
                ],
            )
            .unwrap();
        }
    }

    #[test]
    fn test_report_period_mode() {
        assert_eq!(ReportPeriod::Range.mode(), PeriodMode::Daily);
        assert_eq!(ReportPeriod::Range.label(), "Range");
        assert_eq!(ReportPeriod::Weekly.label(), "Weekly");
    }

    #[test]
    fn test_insights_json_window() {
        let (ctx, _tmp) = make_context();
        seed(&ctx);

        let out = run(
            &ctx,
            &[
                "insights",
                "--period",
                "range",
                "--start",
                "2024-03-01",
                "--end",
                "2024-03-31",
                "--json",
            ],
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["period"], "daily");
        assert_eq!(value["start"], "2024-03-01");
        assert_eq!(value["stats"]["total"], 180.0);
        assert_eq!(value["stats"]["average_per_day"], 90.0);
        assert_eq!(value["stats"]["top_category"], "Alimentação");
        let keys: Vec<&str> = value["series"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["key"].as_str().unwrap())
            .collect();
        assert_eq!(keys, vec!["2024-03-01", "2024-03-02"]);
    }

    #[test]
    fn test_insights_monthly_text() {
        let (ctx, _tmp) = make_context();
        seed(&ctx);

        let out = run(&ctx, &["insights", "--period", "monthly"]).unwrap();

        assert!(out.starts_with("Period: Monthly\n"));
        assert!(out.contains("2024-03"));
        assert!(out.contains("2024-05"));
        assert!(out.contains("R$ 200,00"));
    }

    #[test]
    fn test_insights_empty_store() {
        let (ctx, _tmp) = make_context();
        let out = run(&ctx, &["insights"]).unwrap();
        assert!(out.contains("No expenses in this period."));
    }

    #[test]
    fn test_insights_rejects_inverted_range() {
        let (ctx, _tmp) = make_context();
        let err = run(
            &ctx,
            &["insights", "--start", "2024-04-01", "--end", "2024-03-01"],
        );
        assert!(matches!(err, Err(ExpenseError::Validation(_))));
    }
}
