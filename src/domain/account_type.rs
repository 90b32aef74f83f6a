//! Account type
//!
//! Closed enumeration of account kinds. Payloads and stored rows may still
//! carry the legacy literal `SAVING`, which is normalized to `SAVINGS` at
//! the deserialization boundary. Serialization always emits the canonical
//! enumeration name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AccountType {
    Savings,
    Current,
    Checking,
    Business,
}

impl AccountType {
    pub const ALL: [AccountType; 4] = [
        AccountType::Savings,
        AccountType::Current,
        AccountType::Checking,
        AccountType::Business,
    ];

    /// Canonical enumeration name, used on the wire and in the store
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "SAVINGS",
            AccountType::Current => "CURRENT",
            AccountType::Checking => "CHECKING",
            AccountType::Business => "BUSINESS",
        }
    }

    /// Literals a stored row of this type may carry
    pub fn stored_literals(&self) -> &'static [&'static str] {
        match self {
            AccountType::Savings => &["SAVINGS", "SAVING"],
            AccountType::Current => &["CURRENT"],
            AccountType::Checking => &["CHECKING"],
            AccountType::Business => &["BUSINESS"],
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AccountType::Savings => "Savings Account",
            AccountType::Current => "Current Account",
            AccountType::Checking => "Checking Account",
            AccountType::Business => "Business Account",
        }
    }

    /// Normalize a payload or stored literal.
    ///
    /// Case-insensitive; accepts the legacy `SAVING` as `SAVINGS`.
    pub fn normalize(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SAVINGS" | "SAVING" => Ok(AccountType::Savings),
            "CURRENT" => Ok(AccountType::Current),
            "CHECKING" => Ok(AccountType::Checking),
            "BUSINESS" => Ok(AccountType::Business),
            _ => Err(unknown(value)),
        }
    }
}

fn unknown(value: &str) -> DomainError {
    DomainError::validation(format!("Unknown account type: {}", value))
}

/// Strict parse used for path and query values: canonical names only,
/// case-sensitive.
impl FromStr for AccountType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| unknown(s))
    }
}

impl TryFrom<String> for AccountType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AccountType::normalize(&value)
    }
}

impl From<AccountType> for String {
    fn from(account_type: AccountType) -> Self {
        account_type.as_str().to_string()
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
