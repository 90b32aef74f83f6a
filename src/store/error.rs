//! Store Errors
//!
//! Error types for persistence operations.

/// Errors that can occur in a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique constraint on `customers.email`
    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    /// Foreign key from `accounts.customer_id` would dangle
    #[error("Customer not found: {0}")]
    MissingCustomer(i64),

    /// Customer still referenced by accounts
    #[error("Customer {0} still owns accounts")]
    CustomerInUse(i64),

    /// Numeric value does not fit the stored column
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Stored row cannot be mapped to a domain record
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
