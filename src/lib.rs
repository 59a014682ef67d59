//! expensetrack: personal expense log with period-bucketed spending insights.
//!
//! The insights engine lives in [`services::aggregator`] and
//! [`services::bucket`]; everything else is storage and presentation
//! around it.

pub mod cli;
pub mod logging;
pub mod services;
pub mod types;

pub use services::{build_insights, derive_bucket_key, PeriodMode};
