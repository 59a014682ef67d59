//! Services for expense storage, aggregation and import/export

pub mod aggregator;
pub mod bucket;
pub mod filter;
pub mod migration;
pub mod paths;
pub mod store;
pub mod taxonomy;
pub mod transfer;

pub use aggregator::{build_insights, Aggregator};
pub use bucket::{derive_bucket_key, PeriodMode};
pub use filter::ExpenseFilter;
pub use paths::DataDir;
pub use store::{JsonRecordStore, RecordStore};
pub use taxonomy::TaxonomyStore;
