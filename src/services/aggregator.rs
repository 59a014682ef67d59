//! Aggregator service for computing spending insights

use std::collections::BTreeMap;

use crate::services::bucket::{derive_bucket_key, PeriodMode};
use crate::types::{
    BreakdownEntry, Breakdowns, ExpenseRecord, InsightStats, InsightsResult, SeriesPoint,
};

/// Negative and non-finite amounts count as zero
fn clamp_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

/// Sum amounts by label. BTreeMap keeps labels in ascending order, which
/// the stable descending sort in [`into_breakdown`] uses as tiebreak.
fn sum_by<F>(records: &[ExpenseRecord], mut label: F) -> BTreeMap<String, f64>
where
    F: FnMut(&ExpenseRecord) -> Option<String>,
{
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for record in records {
        if let Some(key) = label(record) {
            *totals.entry(key).or_insert(0.0) += clamp_amount(record.amount);
        }
    }
    totals
}

/// Sort by total descending; equal totals stay in label order
fn into_breakdown(totals: BTreeMap<String, f64>) -> Vec<BreakdownEntry> {
    let mut entries: Vec<BreakdownEntry> = totals
        .into_iter()
        .map(|(label, total)| BreakdownEntry { label, total })
        .collect();
    entries.sort_by(|a, b| b.total.total_cmp(&a.total));
    entries
}

/// Aggregator for computing spending insights
pub struct Aggregator;

impl Aggregator {
    /// Build the full insights result for records already filtered to the
    /// desired date window.
    pub fn insights(records: &[ExpenseRecord], mode: PeriodMode) -> InsightsResult {
        tracing::debug!(records = records.len(), %mode, "building insights");

        if records.is_empty() {
            return InsightsResult::default();
        }

        let series = Self::series(records, mode);
        let by_category = Self::by_category(records);

        let total: f64 = series.iter().map(|p| p.total).sum();
        let span = Self::span_days(records);
        let average_per_day = if span > 0 { total / span as f64 } else { 0.0 };
        let top_category = by_category.first().map(|e| e.label.clone());

        InsightsResult {
            series,
            breakdowns: Breakdowns {
                by_category,
                by_payment: Self::by_payment(records),
                by_kind: Self::by_kind(records),
                by_delivery_provider: Self::by_delivery_provider(records),
            },
            stats: InsightStats {
                total,
                average_per_day,
                top_category,
            },
        }
    }

    /// Sum by bucket key (sorted by key ascending)
    pub fn series(records: &[ExpenseRecord], mode: PeriodMode) -> Vec<SeriesPoint> {
        sum_by(records, |r| Some(derive_bucket_key(r.date, mode)))
            .into_iter()
            .map(|(key, total)| SeriesPoint { key, total })
            .collect()
    }

    pub fn by_category(records: &[ExpenseRecord]) -> Vec<BreakdownEntry> {
        into_breakdown(sum_by(records, |r| Some(r.category.clone())))
    }

    pub fn by_payment(records: &[ExpenseRecord]) -> Vec<BreakdownEntry> {
        into_breakdown(sum_by(records, |r| Some(r.payment_label())))
    }

    pub fn by_kind(records: &[ExpenseRecord]) -> Vec<BreakdownEntry> {
        into_breakdown(sum_by(records, |r| Some(r.kind.label().to_string())))
    }

    /// Only `Delivery` records contribute
    pub fn by_delivery_provider(records: &[ExpenseRecord]) -> Vec<BreakdownEntry> {
        into_breakdown(sum_by(records, ExpenseRecord::delivery_label))
    }

    /// Inclusive day count between the earliest and latest date (0 when empty)
    pub fn span_days(records: &[ExpenseRecord]) -> u64 {
        let min = records.iter().map(|r| r.date).min();
        let max = records.iter().map(|r| r.date).max();
        match (min, max) {
            (Some(min), Some(max)) => (max - min).num_days().unsigned_abs() + 1,
            _ => 0,
        }
    }
}

/// Entry point for the insights view, see [`Aggregator::insights`]
pub fn build_insights(records: &[ExpenseRecord], mode: PeriodMode) -> InsightsResult {
    Aggregator::insights(records, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        CreatedAt, DeliveryProvider, ExpenseKind, PaymentMethod, Priority, DELIVERY_SUBCATEGORY,
    };
    use chrono::{NaiveDate, TimeZone, Utc};

    fn make_record(date: &str, amount: f64, category: &str) -> ExpenseRecord {
        ExpenseRecord {
            id: format!("{}-{}-{}", date, category, amount),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount,
            category: category.to_string(),
            subcategory: "Diversos".to_string(),
            kind: ExpenseKind::Purchase,
            payment_method: PaymentMethod::Pix,
            card: None,
            installments: 1,
            delivery_provider: None,
            delivery_provider_other: None,
            fuel_price_per_liter: None,
            fuel_type: None,
            priority: Priority::Essential,
            merchant: None,
            description: None,
            created_at: CreatedAt::LegacyUtc(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()),
        }
    }

    fn make_delivery(
        date: &str,
        amount: f64,
        provider: Option<DeliveryProvider>,
        other: Option<&str>,
    ) -> ExpenseRecord {
        let mut r = make_record(date, amount, "Alimentação");
        r.subcategory = DELIVERY_SUBCATEGORY.to_string();
        r.delivery_provider = provider;
        r.delivery_provider_other = other.map(String::from);
        r
    }

    fn labels(entries: &[BreakdownEntry]) -> Vec<(&str, f64)> {
        entries.iter().map(|e| (e.label.as_str(), e.total)).collect()
    }

    // ========== insights() tests ==========

    #[test]
    fn test_insights_empty() {
        let result = Aggregator::insights(&[], PeriodMode::Daily);

        assert!(result.series.is_empty());
        assert!(result.breakdowns.by_category.is_empty());
        assert!(result.breakdowns.by_payment.is_empty());
        assert!(result.breakdowns.by_kind.is_empty());
        assert!(result.breakdowns.by_delivery_provider.is_empty());
        assert_eq!(result.stats.total, 0.0);
        assert_eq!(result.stats.average_per_day, 0.0);
        assert!(result.stats.top_category.is_none());
    }

    #[test]
    fn test_insights_monthly_scenario() {
        let records = vec![
            make_record("2024-03-01", 100.0, "Food"),
            make_record("2024-03-02", 50.0, "Food"),
            make_record("2024-03-02", 30.0, "Transport"),
        ];

        let result = build_insights(&records, PeriodMode::Monthly);

        assert_eq!(result.series.len(), 1);
        assert_eq!(result.series[0].key, "2024-03");
        assert!((result.series[0].total - 180.0).abs() < f64::EPSILON);
        assert_eq!(
            labels(&result.breakdowns.by_category),
            vec![("Food", 150.0), ("Transport", 30.0)]
        );
        assert!((result.stats.total - 180.0).abs() < f64::EPSILON);
        assert!((result.stats.average_per_day - 90.0).abs() < f64::EPSILON);
        assert_eq!(result.stats.top_category.as_deref(), Some("Food"));
    }

    #[test]
    fn test_insights_total_matches_record_sum() {
        let records = vec![
            make_record("2024-01-10", 12.34, "A"),
            make_record("2024-02-11", 56.78, "B"),
            make_record("2024-02-11", 0.01, "C"),
            make_record("2025-07-30", 1000.0, "A"),
        ];
        let expected: f64 = records.iter().map(|r| r.amount).sum();

        let result = Aggregator::insights(&records, PeriodMode::Weekly);

        assert!((result.stats.total - expected).abs() < 1e-9);
        let series_sum: f64 = result.series.iter().map(|p| p.total).sum();
        assert_eq!(series_sum, result.stats.total);
    }

    #[test]
    fn test_insights_clamps_bad_amounts() {
        let records = vec![
            make_record("2024-01-10", 10.0, "A"),
            make_record("2024-01-10", -5.0, "A"),
            make_record("2024-01-10", f64::NAN, "B"),
            make_record("2024-01-10", f64::INFINITY, "B"),
        ];

        let result = Aggregator::insights(&records, PeriodMode::Daily);

        assert!((result.stats.total - 10.0).abs() < f64::EPSILON);
        assert!(result.stats.total.is_finite());
        assert_eq!(labels(&result.breakdowns.by_category), vec![("A", 10.0), ("B", 0.0)]);
    }

    #[test]
    fn test_insights_is_idempotent() {
        let records = vec![
            make_record("2024-05-01", 20.0, "B"),
            make_record("2024-05-03", 20.0, "A"),
            make_delivery("2024-05-04", 15.0, Some(DeliveryProvider::IFood), None),
        ];
        let snapshot = records.clone();

        let first = Aggregator::insights(&records, PeriodMode::Weekly);
        let second = Aggregator::insights(&records, PeriodMode::Weekly);

        assert_eq!(first, second);
        assert_eq!(records, snapshot);
    }

    // ========== series() tests ==========

    #[test]
    fn test_series_sorted_ascending_and_unique() {
        let records = vec![
            make_record("2024-01-20", 1.0, "A"),
            make_record("2024-01-10", 2.0, "A"),
            make_record("2024-01-15", 3.0, "A"),
            make_record("2024-01-10", 4.0, "A"),
        ];

        let series = Aggregator::series(&records, PeriodMode::Daily);

        let keys: Vec<&str> = series.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["2024-01-10", "2024-01-15", "2024-01-20"]);
        assert!((series[0].total - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_series_weekly_groups_first_week() {
        let records = vec![
            make_record("2024-01-01", 10.0, "A"),
            make_record("2024-01-05", 20.0, "A"),
            make_record("2024-01-08", 30.0, "A"),
        ];

        let series = Aggregator::series(&records, PeriodMode::Weekly);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].key, "2024-W01");
        assert!((series[0].total - 30.0).abs() < f64::EPSILON);
        assert_eq!(series[1].key, "2024-W02");
    }

    #[test]
    fn test_series_yearly() {
        let records = vec![
            make_record("2023-12-31", 10.0, "A"),
            make_record("2024-01-01", 20.0, "A"),
        ];

        let series = Aggregator::series(&records, PeriodMode::Yearly);

        let keys: Vec<&str> = series.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["2023", "2024"]);
    }

    // ========== breakdown tests ==========

    #[test]
    fn test_breakdown_ties_break_by_label() {
        let records = vec![
            make_record("2024-01-01", 10.0, "Zeta"),
            make_record("2024-01-01", 10.0, "Alpha"),
            make_record("2024-01-01", 25.0, "Mid"),
        ];

        let result = Aggregator::by_category(&records);

        assert_eq!(
            labels(&result),
            vec![("Mid", 25.0), ("Alpha", 10.0), ("Zeta", 10.0)]
        );
    }

    #[test]
    fn test_top_category_tie_uses_label_order() {
        let records = vec![
            make_record("2024-01-01", 10.0, "Zeta"),
            make_record("2024-01-01", 10.0, "Alpha"),
        ];

        let result = Aggregator::insights(&records, PeriodMode::Daily);

        assert_eq!(result.stats.top_category.as_deref(), Some("Alpha"));
    }

    #[test]
    fn test_by_payment_labels() {
        let mut credit_card = make_record("2024-01-01", 100.0, "A");
        credit_card.payment_method = PaymentMethod::Credit;
        credit_card.card = Some("Itaú".into());
        let mut credit = make_record("2024-01-01", 40.0, "A");
        credit.payment_method = PaymentMethod::Credit;
        let mut debit = make_record("2024-01-01", 30.0, "A");
        debit.payment_method = PaymentMethod::Debit;
        debit.card = Some("Itaú".into());
        let pix = make_record("2024-01-01", 20.0, "A");

        let result = Aggregator::by_payment(&[credit_card, credit, debit, pix]);

        assert_eq!(
            labels(&result),
            vec![
                ("Credit (Itaú)", 100.0),
                ("Credit", 40.0),
                ("Debit", 30.0),
                ("Pix", 20.0)
            ]
        );
    }

    #[test]
    fn test_by_kind_labels() {
        let mut bill = make_record("2024-01-01", 300.0, "Casa");
        bill.kind = ExpenseKind::Bill;
        let mut donation = make_record("2024-01-01", 5.0, "Outros");
        donation.kind = ExpenseKind::Donation;
        let purchase = make_record("2024-01-01", 50.0, "Compras");

        let result = Aggregator::by_kind(&[bill, donation, purchase]);

        assert_eq!(
            labels(&result),
            vec![("Bill", 300.0), ("Purchase", 50.0), ("Donation", 5.0)]
        );
    }

    #[test]
    fn test_by_delivery_provider_ignores_non_delivery() {
        let mut not_delivery = make_record("2024-01-01", 999.0, "Alimentação");
        not_delivery.subcategory = "Restaurante".into();
        not_delivery.delivery_provider = Some(DeliveryProvider::IFood);

        let records = vec![
            not_delivery,
            make_delivery("2024-01-01", 30.0, Some(DeliveryProvider::IFood), None),
            make_delivery("2024-01-02", 25.0, Some(DeliveryProvider::NinetyNine), None),
            make_delivery("2024-01-03", 12.0, Some(DeliveryProvider::Other), None),
            make_delivery("2024-01-03", 11.0, Some(DeliveryProvider::Other), Some("Zé")),
            make_delivery(
                "2024-01-04",
                8.0,
                Some(DeliveryProvider::Unrecognized("rappi".into())),
                None,
            ),
            make_delivery("2024-01-05", 3.0, None, None),
        ];

        let result = Aggregator::by_delivery_provider(&records);

        assert_eq!(
            labels(&result),
            vec![
                ("iFood", 30.0),
                ("99", 25.0),
                ("Outros", 12.0),
                ("Zé", 11.0),
                ("rappi", 8.0),
                ("(not informed)", 3.0)
            ]
        );
    }

    #[test]
    fn test_breakdowns_sorted_descending() {
        let records = vec![
            make_record("2024-01-01", 5.0, "A"),
            make_record("2024-01-01", 50.0, "B"),
            make_record("2024-01-01", 500.0, "C"),
            make_record("2024-01-01", 50.0, "A"),
        ];

        let result = Aggregator::insights(&records, PeriodMode::Daily);

        for breakdown in [
            &result.breakdowns.by_category,
            &result.breakdowns.by_payment,
            &result.breakdowns.by_kind,
        ] {
            assert!(breakdown.windows(2).all(|w| w[0].total >= w[1].total));
        }
        assert_eq!(result.stats.top_category.as_deref(), Some("C"));
    }

    // ========== average / span tests ==========

    #[test]
    fn test_average_single_date_equals_total() {
        let records = vec![
            make_record("2024-06-10", 70.0, "A"),
            make_record("2024-06-10", 30.0, "B"),
        ];

        let result = Aggregator::insights(&records, PeriodMode::Daily);

        assert_eq!(Aggregator::span_days(&records), 1);
        assert!((result.stats.average_per_day - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_two_consecutive_days() {
        let records = vec![
            make_record("2024-06-10", 100.0, "A"),
            make_record("2024-06-11", 200.0, "A"),
        ];

        let result = Aggregator::insights(&records, PeriodMode::Daily);

        assert!((result.stats.average_per_day - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_span_days_ignores_input_order() {
        let records = vec![
            make_record("2024-03-31", 1.0, "A"),
            make_record("2024-02-01", 1.0, "A"),
            make_record("2024-02-29", 1.0, "A"),
        ];

        // Feb 1 → Mar 31 in a leap year = 60 days inclusive
        assert_eq!(Aggregator::span_days(&records), 60);
        assert_eq!(Aggregator::span_days(&[]), 0);
    }
}
