//! Expense record types

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ExpenseError, Result};

/// Subcategory that unlocks the fuel fields
pub const FUEL_SUBCATEGORY: &str = "Combustível";

/// Subcategory that unlocks the delivery provider fields
pub const DELIVERY_SUBCATEGORY: &str = "Delivery";

/// Subcategory used when none is chosen
pub const DEFAULT_SUBCATEGORY: &str = "Diversos";

/// Parse a `YYYY-MM-DD` calendar date, failing fast on anything else.
pub fn parse_calendar_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| ExpenseError::Parse(format!("invalid date {:?}: {}", s, e)))
}

/// Whether the expense is a one-off purchase, a recurring bill, or a donation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseKind {
    #[default]
    #[serde(alias = "compra")]
    Purchase,
    #[serde(alias = "conta")]
    Bill,
    #[serde(alias = "doacao")]
    Donation,
}

impl ExpenseKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Purchase => "Purchase",
            Self::Bill => "Bill",
            Self::Donation => "Donation",
        }
    }
}

impl FromStr for ExpenseKind {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "purchase" | "compra" => Ok(Self::Purchase),
            "bill" | "conta" => Ok(Self::Bill),
            "donation" | "doacao" => Ok(Self::Donation),
            other => Err(ExpenseError::Parse(format!("unknown kind: {}", other))),
        }
    }
}

impl fmt::Display for ExpenseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Purchase => "purchase",
            Self::Bill => "bill",
            Self::Donation => "donation",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Pix,
    #[serde(alias = "debito")]
    Debit,
    #[serde(alias = "credito")]
    Credit,
}

impl PaymentMethod {
    /// Card names are only meaningful for card payments
    pub fn uses_card(&self) -> bool {
        matches!(self, Self::Credit | Self::Debit)
    }
}

impl FromStr for PaymentMethod {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "pix" => Ok(Self::Pix),
            "debit" | "debito" => Ok(Self::Debit),
            "credit" | "credito" => Ok(Self::Credit),
            other => Err(ExpenseError::Parse(format!(
                "unknown payment method: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pix => "pix",
            Self::Debit => "debit",
            Self::Credit => "credit",
        };
        f.write_str(s)
    }
}

/// Delivery app used for a `Delivery` expense.
///
/// Values outside the known set are kept verbatim so imported data
/// round-trips without loss.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeliveryProvider {
    IFood,
    NinetyNine,
    Other,
    Unrecognized(String),
}

impl From<String> for DeliveryProvider {
    fn from(s: String) -> Self {
        match s.trim() {
            "ifood" => Self::IFood,
            "99" | "ninety_nine" => Self::NinetyNine,
            "other" | "outros" => Self::Other,
            _ => Self::Unrecognized(s),
        }
    }
}

impl From<DeliveryProvider> for String {
    fn from(p: DeliveryProvider) -> Self {
        match p {
            DeliveryProvider::IFood => "ifood".into(),
            DeliveryProvider::NinetyNine => "ninety_nine".into(),
            DeliveryProvider::Other => "other".into(),
            DeliveryProvider::Unrecognized(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    #[serde(alias = "essencial")]
    Essential,
    #[serde(alias = "importante")]
    Important,
    #[serde(alias = "baixa")]
    Low,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Essential => "High",
            Self::Important => "Medium",
            Self::Low => "Low",
        }
    }
}

impl FromStr for Priority {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "essential" | "essencial" => Ok(Self::Essential),
            "important" | "importante" => Ok(Self::Important),
            "low" | "baixa" => Ok(Self::Low),
            other => Err(ExpenseError::Parse(format!("unknown priority: {}", other))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Essential => "essential",
            Self::Important => "important",
            Self::Low => "low",
        };
        f.write_str(s)
    }
}

/// Record creation timestamp.
///
/// Older data was stamped in UTC (`...Z`); newer data carries the local
/// offset. Legacy values are converted once at load time, see
/// [`crate::services::migration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CreatedAt {
    LegacyUtc(DateTime<Utc>),
    LocalOffset(DateTime<FixedOffset>),
}

impl CreatedAt {
    /// Comparable instant, independent of the variant
    pub fn instant(&self) -> DateTime<Utc> {
        match self {
            Self::LegacyUtc(dt) => *dt,
            Self::LocalOffset(dt) => dt.with_timezone(&Utc),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::LegacyUtc(_))
    }
}

impl FromStr for CreatedAt {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parsed = DateTime::parse_from_rfc3339(s)
            .map_err(|e| ExpenseError::Parse(format!("invalid createdAt {:?}: {}", s, e)))?;
        if s.ends_with('Z') || s.ends_with('z') {
            Ok(Self::LegacyUtc(parsed.with_timezone(&Utc)))
        } else {
            Ok(Self::LocalOffset(parsed))
        }
    }
}

impl TryFrom<String> for CreatedAt {
    type Error = ExpenseError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for CreatedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LegacyUtc(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::LocalOffset(dt) => {
                f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, false))
            }
        }
    }
}

impl From<CreatedAt> for String {
    fn from(c: CreatedAt) -> Self {
        c.to_string()
    }
}

/// Treat absent, null, and blank strings alike
fn blank_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(T::from))
}

fn default_installments() -> u32 {
    1
}

/// A single logged expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    pub id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub kind: ExpenseKind,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub card: Option<String>,
    #[serde(default = "default_installments")]
    pub installments: u32,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub delivery_provider: Option<DeliveryProvider>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub delivery_provider_other: Option<String>,
    #[serde(default)]
    pub fuel_price_per_liter: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub fuel_type: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub merchant: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    pub created_at: CreatedAt,
}

impl ExpenseRecord {
    pub fn is_delivery(&self) -> bool {
        self.subcategory == DELIVERY_SUBCATEGORY
    }

    pub fn is_fuel(&self) -> bool {
        self.subcategory == FUEL_SUBCATEGORY
    }

    /// Payment label: "Credit (<card>)", "Credit", "Debit" or "Pix"
    pub fn payment_label(&self) -> String {
        match self.payment_method {
            PaymentMethod::Credit => match self.card.as_deref() {
                Some(card) if !card.is_empty() => format!("Credit ({})", card),
                _ => "Credit".to_string(),
            },
            PaymentMethod::Debit => "Debit".to_string(),
            PaymentMethod::Pix => "Pix".to_string(),
        }
    }

    /// Provider label for the delivery breakdown.
    ///
    /// Returns `None` for records outside the `Delivery` subcategory.
    pub fn delivery_label(&self) -> Option<String> {
        if !self.is_delivery() {
            return None;
        }
        let label = match &self.delivery_provider {
            Some(DeliveryProvider::IFood) => "iFood".to_string(),
            Some(DeliveryProvider::NinetyNine) => "99".to_string(),
            Some(DeliveryProvider::Other) => self
                .delivery_provider_other
                .clone()
                .unwrap_or_else(|| "Outros".to_string()),
            Some(DeliveryProvider::Unrecognized(raw)) if !raw.trim().is_empty() => raw.clone(),
            _ => "(not informed)".to_string(),
        };
        Some(label)
    }

    /// Installment badge ("3x"), only for credit purchases split in more than one
    pub fn installments_label(&self) -> Option<String> {
        if self.payment_method == PaymentMethod::Credit && self.installments > 1 {
            Some(format!("{}x", self.installments))
        } else {
            None
        }
    }
}

/// Expense input before it becomes a stored record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpenseDraft {
    pub date: Option<NaiveDate>,
    pub amount: f64,
    pub category: String,
    pub subcategory: String,
    pub kind: ExpenseKind,
    pub payment_method: PaymentMethod,
    pub card: Option<String>,
    pub installments: u32,
    pub delivery_provider: Option<DeliveryProvider>,
    pub delivery_provider_other: Option<String>,
    pub fuel_price_per_liter: Option<f64>,
    pub fuel_type: Option<String>,
    pub priority: Priority,
    pub merchant: Option<String>,
    pub description: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl ExpenseDraft {
    /// Draft pre-filled from an existing record (edit / copy-last)
    pub fn from_record(record: &ExpenseRecord) -> Self {
        Self {
            date: Some(record.date),
            amount: record.amount,
            category: record.category.clone(),
            subcategory: record.subcategory.clone(),
            kind: record.kind,
            payment_method: record.payment_method,
            card: record.card.clone(),
            installments: record.installments,
            delivery_provider: record.delivery_provider.clone(),
            delivery_provider_other: record.delivery_provider_other.clone(),
            fuel_price_per_liter: record.fuel_price_per_liter,
            fuel_type: record.fuel_type.clone(),
            priority: record.priority,
            merchant: record.merchant.clone(),
            description: record.description.clone(),
        }
    }

    /// Validate the draft and drop fields that do not apply to it.
    pub fn into_record(self, id: String, created_at: CreatedAt) -> Result<ExpenseRecord> {
        let date = self
            .date
            .ok_or_else(|| ExpenseError::Validation("date is required".into()))?;

        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ExpenseError::Validation(
                "amount must be greater than zero".into(),
            ));
        }

        let category = self.category.trim().to_string();
        if category.is_empty() {
            return Err(ExpenseError::Validation("category is required".into()));
        }

        let mut subcategory = self.subcategory.trim().to_string();
        if subcategory.is_empty() {
            subcategory = DEFAULT_SUBCATEGORY.to_string();
        }

        let card = if self.payment_method.uses_card() {
            trimmed(self.card)
        } else {
            None
        };

        let installments = match self.payment_method {
            PaymentMethod::Credit if self.installments == 0 => {
                return Err(ExpenseError::Validation(
                    "installments must be at least 1".into(),
                ));
            }
            PaymentMethod::Credit => self.installments,
            _ => 1,
        };

        let (delivery_provider, delivery_provider_other) = if subcategory == DELIVERY_SUBCATEGORY
        {
            let other = match self.delivery_provider {
                Some(DeliveryProvider::Other) => trimmed(self.delivery_provider_other),
                _ => None,
            };
            (self.delivery_provider, other)
        } else {
            (None, None)
        };

        let (fuel_price_per_liter, fuel_type) = if subcategory == FUEL_SUBCATEGORY {
            (
                self.fuel_price_per_liter.filter(|p| p.is_finite()),
                trimmed(self.fuel_type),
            )
        } else {
            (None, None)
        };

        Ok(ExpenseRecord {
            id,
            date,
            amount: self.amount,
            category,
            subcategory,
            kind: self.kind,
            payment_method: self.payment_method,
            card,
            installments,
            delivery_provider,
            delivery_provider_other,
            fuel_price_per_liter,
            fuel_type,
            priority: self.priority,
            merchant: trimmed(self.merchant),
            description: trimmed(self.description),
            created_at,
        })
    }
}
