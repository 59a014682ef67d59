//! JSON backup and CSV import/export

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};

use crate::services::migration::{local_now, normalize_created_at};
use crate::types::{
    parse_calendar_date, CreatedAt, DeliveryProvider, ExpenseError, ExpenseRecord, Result,
};

/// Backup format version
pub const EXPORT_VERSION: u32 = 1;

pub const CSV_HEADER: [&str; 17] = [
    "id",
    "date",
    "amount",
    "category",
    "subcategory",
    "kind",
    "deliveryProvider",
    "deliveryProviderOther",
    "paymentMethod",
    "card",
    "installments",
    "fuelPricePerLiter",
    "fuelType",
    "priority",
    "merchant",
    "description",
    "createdAt",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub exported_at: CreatedAt,
    pub expenses: Vec<ExpenseRecord>,
}

#[derive(Debug, Deserialize)]
struct ImportDocument {
    expenses: Option<Vec<serde_json::Value>>,
}

/// Records read from an import file
#[derive(Debug, Default)]
pub struct ImportBatch {
    pub records: Vec<ExpenseRecord>,
    /// Entries without an id
    pub skipped: usize,
}

fn normalized(records: &[ExpenseRecord], offset: FixedOffset) -> Vec<ExpenseRecord> {
    records
        .iter()
        .cloned()
        .map(|mut r| {
            r.created_at = normalize_created_at(r.created_at, offset);
            r
        })
        .collect()
}

/// Pretty-printed JSON backup with normalized createdAt values
pub fn write_json(records: &[ExpenseRecord], offset: FixedOffset) -> Result<String> {
    let doc = ExportDocument {
        version: EXPORT_VERSION,
        exported_at: local_now(),
        expenses: normalized(records, offset),
    };
    serde_json::to_string_pretty(&doc)
        .map_err(|e| ExpenseError::Parse(format!("Serialization failed: {}", e)))
}

fn has_id(value: &serde_json::Value) -> bool {
    value
        .get("id")
        .and_then(|id| id.as_str())
        .is_some_and(|id| !id.trim().is_empty())
}

/// Parse a JSON backup. Entries without an id are skipped; a missing
/// createdAt is stamped with the current time.
pub fn read_json(text: &str) -> Result<ImportBatch> {
    let doc: ImportDocument = serde_json::from_str(text)
        .map_err(|e| ExpenseError::Parse(format!("Invalid backup file: {}", e)))?;
    let entries = doc
        .expenses
        .ok_or_else(|| ExpenseError::Parse("Invalid backup file: missing expenses".into()))?;

    let mut batch = ImportBatch::default();
    for (i, mut value) in entries.into_iter().enumerate() {
        if !has_id(&value) {
            batch.skipped += 1;
            continue;
        }
        if let Some(obj) = value.as_object_mut() {
            let missing = obj
                .get("createdAt")
                .and_then(|c| c.as_str())
                .is_none_or(|c| c.trim().is_empty());
            if missing {
                obj.insert("createdAt".into(), local_now().to_string().into());
            }
        }
        let record: ExpenseRecord = serde_json::from_value(value)
            .map_err(|e| ExpenseError::Parse(format!("expense #{}: {}", i + 1, e)))?;
        batch.records.push(record);
    }

    if batch.skipped > 0 {
        tracing::warn!(skipped = batch.skipped, "skipped backup entries without id");
    }
    Ok(batch)
}

fn format_amount(value: f64) -> String {
    format!("{}", value)
}

/// Write records as CSV with the fixed header order
pub fn write_csv(records: &[ExpenseRecord], offset: FixedOffset, writer: impl Write) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(CSV_HEADER)
        .map_err(|e| ExpenseError::Csv(format!("CSV write error: {e}")))?;

    for r in normalized(records, offset) {
        csv.write_record([
            r.id,
            r.date.format("%Y-%m-%d").to_string(),
            format_amount(r.amount),
            r.category,
            r.subcategory,
            r.kind.to_string(),
            r.delivery_provider.map(String::from).unwrap_or_default(),
            r.delivery_provider_other.unwrap_or_default(),
            r.payment_method.to_string(),
            r.card.unwrap_or_default(),
            r.installments.to_string(),
            r.fuel_price_per_liter.map(format_amount).unwrap_or_default(),
            r.fuel_type.unwrap_or_default(),
            r.priority.to_string(),
            r.merchant.unwrap_or_default(),
            r.description.unwrap_or_default(),
            r.created_at.to_string(),
        ])
        .map_err(|e| ExpenseError::Csv(format!("CSV write error: {e}")))?;
    }

    csv.flush()?;
    Ok(())
}

/// Row accessor by header name; missing columns read as empty
struct Row<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
}

impl Row<'_> {
    fn get(&self, name: &str) -> &str {
        self.columns
            .get(name)
            .and_then(|&i| self.record.get(i))
            .map(str::trim)
            .unwrap_or("")
    }

    fn optional(&self, name: &str) -> Option<String> {
        Some(self.get(name))
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    fn to_record(&self) -> Result<ExpenseRecord> {
        let amount: f64 = self
            .get("amount")
            .parse()
            .map_err(|e| ExpenseError::Parse(format!("invalid amount: {}", e)))?;
        if !amount.is_finite() {
            return Err(ExpenseError::Validation(format!(
                "amount must be a finite number, got {:?}",
                self.get("amount")
            )));
        }

        let category = self.get("category");
        if category.is_empty() {
            return Err(ExpenseError::Validation("category is required".into()));
        }

        let installments = match self.get("installments") {
            "" => 1,
            raw => raw
                .parse()
                .map_err(|e| ExpenseError::Parse(format!("invalid installments: {}", e)))?,
        };

        let fuel_price_per_liter = match self.get("fuelPricePerLiter") {
            "" => None,
            raw => Some(
                raw.parse::<f64>()
                    .map_err(|e| ExpenseError::Parse(format!("invalid fuel price: {}", e)))?,
            )
            .filter(|p| p.is_finite()),
        };

        let created_at = match self.get("createdAt") {
            "" => local_now(),
            raw => raw.parse()?,
        };

        Ok(ExpenseRecord {
            id: self.get("id").to_string(),
            date: parse_calendar_date(self.get("date"))?,
            amount,
            category: category.to_string(),
            subcategory: self.get("subcategory").to_string(),
            kind: self.get("kind").parse()?,
            payment_method: self.get("paymentMethod").parse()?,
            card: self.optional("card"),
            installments,
            delivery_provider: self.optional("deliveryProvider").map(DeliveryProvider::from),
            delivery_provider_other: self.optional("deliveryProviderOther"),
            fuel_price_per_liter,
            fuel_type: self.optional("fuelType"),
            priority: self.get("priority").parse()?,
            merchant: self.optional("merchant"),
            description: self.optional("description"),
            created_at,
        })
    }
}

/// Read records from CSV with a header row. Rows without an id are skipped.
pub fn read_csv(reader: impl Read) -> Result<ImportBatch> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: HashMap<String, usize> = csv
        .headers()
        .map_err(|e| ExpenseError::Csv(format!("CSV header error: {e}")))?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_string(), i))
        .collect();

    let mut batch = ImportBatch::default();

    for (i, result) in csv.records().enumerate() {
        let record = result.map_err(|e| ExpenseError::Csv(format!("row {}: {e}", i + 1)))?;
        let row = Row {
            columns: &columns,
            record: &record,
        };

        if row.get("id").is_empty() {
            batch.skipped += 1;
            continue;
        }

        let expense = row
            .to_record()
            .map_err(|e| ExpenseError::Csv(format!("row {}: {}", i + 1, e)))?;
        batch.records.push(expense);
    }

    Ok(batch)
}
