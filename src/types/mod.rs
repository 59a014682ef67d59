//! Type definitions for expensetrack

mod error;
mod expense;
mod insights;
mod taxonomy;

pub use error::*;
pub use expense::*;
pub use insights::*;
pub use taxonomy::*;
