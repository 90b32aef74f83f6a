//! Application services
//!
//! Business rules on top of the record store.

mod account_service;
mod auth_service;
mod customer_service;

pub use account_service::{AccountService, Withdrawal};
pub use auth_service::{hash_password, AuthService, Claims, IssuedToken};
pub use customer_service::CustomerService;
