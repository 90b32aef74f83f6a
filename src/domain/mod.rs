//! Domain module
//!
//! Core domain types and business rules, independent of storage and HTTP.

pub mod account;
pub mod account_number;
pub mod account_type;
pub mod context;
pub mod customer;
pub mod error;
pub mod money;
pub mod user;

pub use account::{Account, AccountDraft};
pub use account_number::{format_account_number, AccountNumberAllocator};
pub use account_type::AccountType;
pub use context::OperationContext;
pub use customer::{Customer, CustomerDraft};
pub use error::DomainError;
pub use money::{Amount, AmountError, Balance};
pub use user::{NewUser, User};
