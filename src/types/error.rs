use thiserror::Error;

/// expensetrack error types
#[derive(Error, Debug)]
pub enum ExpenseError {
    /// Failed to parse a date, timestamp, or JSON document
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record store operation failed
    #[error("store error: {0}")]
    Store(String),

    /// Taxonomy/configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Expense input rejected
    #[error("invalid expense: {0}")]
    Validation(String),

    /// Referenced record or taxonomy entry does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Record id or taxonomy name already exists
    #[error("already exists: {0}")]
    Duplicate(String),

    /// CSV read/write failed
    #[error("csv error: {0}")]
    Csv(String),
}

/// Result type alias for expensetrack
pub type Result<T> = std::result::Result<T, ExpenseError>;
