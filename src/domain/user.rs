//! Administrative user
//!
//! Login identities for the back office. Unrelated to customers.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_ROLE: &str = "ADMIN";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_date: DateTime<Utc>,
}

/// Input for a new user; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: String,
}
