//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Record-manager errors.
///
/// These represent invalid input and business rule violations and are
/// surfaced to the caller as client errors. They are never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Malformed or semantically invalid input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced identifier does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Operation would violate a business invariant
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn customer_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "Customer",
            id: id.to_string(),
        }
    }

    pub fn account_not_found(account_no: impl ToString) -> Self {
        Self::NotFound {
            entity: "Account",
            id: account_no.to_string(),
        }
    }

    pub fn duplicate_email(email: &str) -> Self {
        Self::Validation(format!("Email already exists: {}", email))
    }

    /// Check if this error means the referenced record is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
