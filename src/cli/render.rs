//! Plain-text presentation of records and insights

use chrono::NaiveDate;

use crate::types::{BreakdownEntry, ExpenseRecord, InsightsResult};

const BAR_WIDTH: usize = 20;

/// Group digits in threes with `.` (pt-BR style)
/// Example: 1234567 → "1.234.567"
pub fn format_grouped(n: u64) -> String {
    let s = n.to_string();
    let len = s.len();
    let mut result = String::with_capacity(len + len / 3);

    // Digits are ASCII, so byte indexing is safe
    for (i, ch) in s.bytes().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push('.');
        }
        result.push(ch as char);
    }

    result
}

/// Format an amount as Brazilian reais
/// Example: 1234.5 → "R$ 1.234,50"
pub fn format_brl(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{}R$ {},{:02}",
        sign,
        format_grouped(cents / 100),
        cents % 100
    )
}

/// Bar proportional to `value / max`
/// Example: value=50, max=100, width=8 → "▓▓▓▓░░░░"
pub fn format_bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || !max.is_finite() || width == 0 {
        return "░".repeat(width);
    }
    let ratio = (value / max).max(0.0);
    let filled = (ratio * width as f64).round() as usize;
    let filled = filled.min(width);
    let empty = width.saturating_sub(filled);
    format!("{}{}", "▓".repeat(filled), "░".repeat(empty))
}

/// Share of `part` in `whole` as a percentage (0 when whole is 0)
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// One-line summary of a record for the list view
pub fn render_record_line(record: &ExpenseRecord) -> String {
    let mut badges: Vec<String> = vec![
        format!("{} • {}", record.category, record.subcategory),
        record.kind.label().to_string(),
    ];

    let mut payment = record.payment_label();
    if let Some(installments) = record.installments_label() {
        payment.push_str(&format!(" • {}", installments));
    }
    badges.push(payment);
    badges.push(record.priority.label().to_string());

    if record.is_delivery() && record.delivery_provider.is_some() {
        if let Some(label) = record.delivery_label() {
            badges.push(label);
        }
    }

    if record.is_fuel() {
        if let Some(fuel_type) = &record.fuel_type {
            badges.push(fuel_type.clone());
        }
        if let Some(price) = record.fuel_price_per_liter.filter(|p| *p > 0.0) {
            badges.push(format!("{}/L", format_brl(price)));
        }
    }

    if let Some(merchant) = &record.merchant {
        badges.push(merchant.clone());
    }

    format!(
        "{}  {:>14}  {}  [{}]  ({})",
        record.date,
        format_brl(record.amount),
        record.description.as_deref().unwrap_or("(no description)"),
        badges.join(" | "),
        record.id
    )
}

/// Header line: "Period: Monthly (2024-01-01 → …)"
pub fn period_header(label: &str, start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    if start.is_none() && end.is_none() {
        return format!("Period: {}", label);
    }
    let fmt = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "…".into());
    format!("Period: {} ({} → {})", label, fmt(start), fmt(end))
}

fn render_breakdown(out: &mut String, title: &str, entries: &[BreakdownEntry], total: f64) {
    out.push_str(&format!("\n{}\n", title));
    if entries.is_empty() {
        out.push_str("  (none)\n");
        return;
    }
    let max = entries.first().map(|e| e.total).unwrap_or(0.0);
    for entry in entries {
        out.push_str(&format!(
            "  {:<24} {:>14} {:>6.1}%  {}\n",
            entry.label,
            format_brl(entry.total),
            percent_of(entry.total, total),
            format_bar(entry.total, max, BAR_WIDTH)
        ));
    }
}

/// Full insights report: stats, series and the four breakdowns
pub fn render_insights(result: &InsightsResult, header: &str, key_column: &str) -> String {
    let stats = &result.stats;
    let mut out = String::new();

    out.push_str(header);
    out.push('\n');
    out.push_str(&format!("\n  {:<14} {}\n", "Total", format_brl(stats.total)));
    out.push_str(&format!(
        "  {:<14} {}\n",
        "Avg/day",
        format_brl(stats.average_per_day)
    ));
    out.push_str(&format!(
        "  {:<14} {}\n",
        "Top category",
        stats.top_category.as_deref().unwrap_or("—")
    ));

    if result.is_empty() {
        out.push_str("\nNo expenses in this period.\n");
        return out;
    }

    out.push_str(&format!("\n  {:<12} {:>14}\n", key_column, "Total"));
    let max = result
        .series
        .iter()
        .map(|p| p.total)
        .fold(0.0_f64, f64::max);
    for point in &result.series {
        out.push_str(&format!(
            "  {:<12} {:>14}  {}\n",
            point.key,
            format_brl(point.total),
            format_bar(point.total, max, BAR_WIDTH)
        ));
    }

    let b = &result.breakdowns;
    render_breakdown(&mut out, "By category", &b.by_category, stats.total);
    render_breakdown(&mut out, "By payment", &b.by_payment, stats.total);
    render_breakdown(&mut out, "By kind", &b.by_kind, stats.total);
    let delivery_total: f64 = b.by_delivery_provider.iter().map(|e| e.total).sum();
    render_breakdown(
        &mut out,
        "Delivery by provider",
        &b.by_delivery_provider,
        delivery_total,
    );

    out
}
