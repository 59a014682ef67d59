//! `add`, `edit`, `delete` and `list` subcommands

use chrono::{Local, NaiveDate};
use clap::Args;

use super::render::{format_brl, render_record_line};
use super::Context;
use crate::services::filter::filtered_total;
use crate::services::migration::local_now;
use crate::services::{ExpenseFilter, RecordStore};
use crate::types::{
    parse_calendar_date, DeliveryProvider, ExpenseDraft, ExpenseError, ExpenseKind,
    ExpenseRecord, PaymentMethod, Priority, Result,
};

/// Expense fields shared by `add` and `edit`
#[derive(Args, Debug, Default)]
pub struct ExpenseFields {
    /// Expense date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_calendar_date)]
    pub date: Option<NaiveDate>,

    /// Amount in reais
    #[arg(long)]
    pub amount: Option<f64>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub subcategory: Option<String>,

    /// purchase, bill or donation
    #[arg(long)]
    pub kind: Option<ExpenseKind>,

    /// pix, debit or credit
    #[arg(long)]
    pub payment: Option<PaymentMethod>,

    #[arg(long)]
    pub card: Option<String>,

    /// Number of installments (credit only)
    #[arg(long)]
    pub installments: Option<u32>,

    /// Delivery provider: ifood, 99 or other
    #[arg(long)]
    pub provider: Option<String>,

    /// Provider name when --provider is other
    #[arg(long)]
    pub provider_other: Option<String>,

    /// Fuel price per liter
    #[arg(long)]
    pub fuel_price: Option<f64>,

    #[arg(long)]
    pub fuel_type: Option<String>,

    /// essential, important or low
    #[arg(long)]
    pub priority: Option<Priority>,

    #[arg(long)]
    pub merchant: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

impl ExpenseFields {
    /// Overwrite the draft with every field given on the command line
    pub fn apply_to(self, draft: &mut ExpenseDraft) {
        if let Some(date) = self.date {
            draft.date = Some(date);
        }
        if let Some(amount) = self.amount {
            draft.amount = amount;
        }
        if let Some(category) = self.category {
            draft.category = category;
        }
        if let Some(subcategory) = self.subcategory {
            draft.subcategory = subcategory;
        }
        if let Some(kind) = self.kind {
            draft.kind = kind;
        }
        if let Some(payment) = self.payment {
            draft.payment_method = payment;
        }
        if self.card.is_some() {
            draft.card = self.card;
        }
        if let Some(installments) = self.installments {
            draft.installments = installments;
        }
        if let Some(provider) = self.provider {
            draft.delivery_provider = Some(DeliveryProvider::from(provider));
        }
        if self.provider_other.is_some() {
            draft.delivery_provider_other = self.provider_other;
        }
        if self.fuel_price.is_some() {
            draft.fuel_price_per_liter = self.fuel_price;
        }
        if self.fuel_type.is_some() {
            draft.fuel_type = self.fuel_type;
        }
        if let Some(priority) = self.priority {
            draft.priority = priority;
        }
        if self.merchant.is_some() {
            draft.merchant = self.merchant;
        }
        if self.description.is_some() {
            draft.description = self.description;
        }
    }
}

/// Keep the taxonomy aware of categories typed on the command line
fn remember_category(ctx: &Context, record: &ExpenseRecord) -> Result<()> {
    ctx.taxonomy().modify(|t| {
        if t.ensure_subcategory(&record.category, &record.subcategory) {
            tracing::info!(
                category = %record.category,
                subcategory = %record.subcategory,
                "added to taxonomy"
            );
        }
        Ok(())
    })?;
    Ok(())
}

/// Log a new expense
#[derive(Args, Debug)]
pub struct AddArgs {
    #[command(flatten)]
    pub fields: ExpenseFields,

    /// Start from the most recent expense (date defaults to today)
    #[arg(long)]
    pub copy_last: bool,
}

impl AddArgs {
    pub fn run(self, ctx: &Context) -> Result<String> {
        let store = ctx.records();

        let mut draft = if self.copy_last {
            let last = store
                .latest()?
                .ok_or_else(|| ExpenseError::NotFound("no expense to copy".into()))?;
            ExpenseDraft::from_record(&last)
        } else {
            ExpenseDraft {
                installments: 1,
                ..Default::default()
            }
        };
        draft.date = Some(Local::now().date_naive());
        self.fields.apply_to(&mut draft);

        let record = draft.into_record(uuid::Uuid::new_v4().to_string(), local_now())?;
        store.create(record.clone())?;
        remember_category(ctx, &record)?;

        Ok(format!("Saved expense {}\n{}", record.id, render_record_line(&record)))
    }
}

/// Change an existing expense
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Expense ID
    #[arg(value_name = "ID")]
    pub id: String,

    #[command(flatten)]
    pub fields: ExpenseFields,
}

impl EditArgs {
    pub fn run(self, ctx: &Context) -> Result<String> {
        let store = ctx.records();
        let existing = store
            .get(&self.id)?
            .ok_or_else(|| ExpenseError::NotFound(format!("expense {}", self.id)))?;

        let mut draft = ExpenseDraft::from_record(&existing);
        self.fields.apply_to(&mut draft);

        let record = store.update(&self.id, draft)?;
        remember_category(ctx, &record)?;

        Ok(format!("Updated expense {}\n{}", record.id, render_record_line(&record)))
    }
}

/// Delete an expense
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Expense ID
    #[arg(value_name = "ID")]
    pub id: String,
}

impl DeleteArgs {
    pub fn run(self, ctx: &Context) -> Result<String> {
        ctx.records().delete(&self.id)?;
        Ok(format!("Deleted expense {}", self.id))
    }
}

/// List expenses, newest first
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// First day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_calendar_date)]
    pub start: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_calendar_date)]
    pub end: Option<NaiveDate>,

    #[arg(long)]
    pub category: Option<String>,

    /// pix, debit or credit
    #[arg(long)]
    pub payment: Option<PaymentMethod>,

    /// Text search over description, merchant, category and subcategory
    #[arg(long, short)]
    pub query: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    fn filter(&self) -> ExpenseFilter {
        ExpenseFilter {
            start: self.start,
            end: self.end,
            category: self.category.clone(),
            payment: self.payment,
            query: self.query.clone(),
        }
    }

    pub fn run(self, ctx: &Context) -> Result<String> {
        let records = self.filter().apply(&ctx.records().list()?);

        if self.json {
            return serde_json::to_string_pretty(&records)
                .map_err(|e| ExpenseError::Parse(format!("Serialization failed: {}", e)));
        }

        Ok(render_list(&records))
    }
}

fn render_list(records: &[ExpenseRecord]) -> String {
    if records.is_empty() {
        return "No expenses found.".to_string();
    }
    let mut out: Vec<String> = records.iter().map(render_record_line).collect();
    out.push(String::new());
    out.push(format!(
        "{} expense(s), total {}",
        records.len(),
        format_brl(filtered_total(records))
    ));
    out.join("\n")
}
