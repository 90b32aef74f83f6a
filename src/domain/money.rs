//! Monetary types
//!
//! Domain primitives for account balances and mutation amounts.
//! All values carry exactly two fractional digits; anything finer is rejected
//! at construction time rather than rounded.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DomainError;

/// Fractional digits of every stored monetary value
pub const SCALE: u32 = 2;

/// Largest value that fits NUMERIC(15,2)
const MAX_VALUE: &str = "9999999999999.99";

fn max_value() -> Decimal {
    // constant literal, always parses
    Decimal::from_str(MAX_VALUE).unwrap_or(Decimal::MAX)
}

/// Errors that can occur when creating a monetary value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Balance must be non-negative (got {0})")]
    Negative(Decimal),

    #[error("Too many decimal places (max {SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Value exceeds maximum allowed ({MAX_VALUE})")]
    Overflow,

    #[error("Insufficient balance: required {required}, available {available}")]
    Insufficient {
        required: Decimal,
        available: Decimal,
    },

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl From<AmountError> for DomainError {
    fn from(err: AmountError) -> Self {
        DomainError::Validation(err.to_string())
    }
}

fn check_scale(value: Decimal) -> Result<Decimal, AmountError> {
    let normalized = value.normalize();
    if normalized.scale() > SCALE {
        return Err(AmountError::TooManyDecimals(normalized.scale()));
    }
    if value > max_value() {
        return Err(AmountError::Overflow);
    }
    let mut scaled = value;
    scaled.rescale(SCALE);
    Ok(scaled)
}

/// Amount is a strictly positive deposit or withdrawal value.
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use banking_admin::domain::Amount;
///
/// let amount = Amount::new(Decimal::new(5, 0)).unwrap();
/// assert_eq!(amount.to_string(), "5.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    /// Create a new Amount.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 2 decimal places
    /// - `AmountError::Overflow` if value does not fit a stored balance
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }
        check_scale(value).map(Self)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s).map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

/// Balance is an account balance: zero or positive, two fractional digits.
///
/// Serialized as a decimal string (`"100.00"`); deserialized from either a
/// JSON number or a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "String")]
pub struct Balance(Decimal);

impl Balance {
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::Negative(value));
        }
        check_scale(value).map(Self)
    }

    pub fn zero() -> Self {
        Self(Decimal::new(0, SCALE))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check if balance covers a withdrawal of `amount`
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add amount to balance
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 + amount.value())
    }

    /// Subtract amount from balance; never goes below zero
    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        if !self.is_sufficient_for(amount) {
            return Err(AmountError::Insufficient {
                required: amount.value(),
                available: self.0,
            });
        }
        Balance::new(self.0 - amount.value())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<Decimal> for Balance {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Balance::new(value)
    }
}

impl From<Balance> for String {
    fn from(balance: Balance) -> Self {
        balance.to_string()
    }
}

/// Sum of balances, rendered with the same two-digit scale
pub fn format_total(total: Decimal) -> String {
    let mut total = total;
    total.rescale(SCALE);
    total.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::new(dec!(100));
        assert_eq!(amount.unwrap().value(), dec!(100.00));
    }

    #[test]
    fn test_amount_zero_and_negative_rejected() {
        assert!(matches!(Amount::new(Decimal::ZERO), Err(AmountError::NotPositive(_))));
        assert!(matches!(Amount::new(dec!(-5)), Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_amount_too_many_decimals() {
        let amount = Amount::new(dec!(0.125));
        assert!(matches!(amount, Err(AmountError::TooManyDecimals(3))));
    }

    #[test]
    fn test_trailing_zeros_are_not_extra_precision() {
        let amount = Amount::new(dec!(1.5000)).unwrap();
        assert_eq!(amount.to_string(), "1.50");
    }

    #[test]
    fn test_balance_rejects_negative() {
        assert!(matches!(Balance::new(dec!(-0.01)), Err(AmountError::Negative(_))));
        assert_eq!(Balance::new(Decimal::ZERO).unwrap(), Balance::zero());
    }

    #[test]
    fn test_balance_overflow() {
        assert!(Balance::new(dec!(9999999999999.99)).is_ok());
        assert!(matches!(Balance::new(dec!(10000000000000)), Err(AmountError::Overflow)));
    }

    #[test]
    fn test_balance_credit_debit() {
        let balance = Balance::new(dec!(100)).unwrap();

        let balance = balance.credit(&Amount::new(dec!(50)).unwrap()).unwrap();
        assert_eq!(balance.value(), dec!(150.00));

        let balance = balance.debit(&Amount::new(dec!(150)).unwrap()).unwrap();
        assert_eq!(balance, Balance::zero());
    }

    #[test]
    fn test_balance_debit_insufficient() {
        let balance = Balance::new(dec!(100)).unwrap();
        let result = balance.debit(&Amount::new(dec!(150)).unwrap());

        assert!(matches!(result, Err(AmountError::Insufficient { .. })));
    }

    #[test]
    fn test_balance_serializes_as_two_digit_string() {
        let balance = Balance::new(dec!(12750.5)).unwrap();
        assert_eq!(serde_json::to_string(&balance).unwrap(), "\"12750.50\"");
    }

    #[test]
    fn test_balance_deserializes_from_number_or_string() {
        let from_number: Balance = serde_json::from_str("100.00").unwrap();
        let from_string: Balance = serde_json::from_str("\"100\"").unwrap();

        assert_eq!(from_number, from_string);
        assert!(serde_json::from_str::<Balance>("-1").is_err());
    }

    #[test]
    fn test_format_total() {
        assert_eq!(format_total(dec!(0)), "0.00");
        assert_eq!(format_total(dec!(250.5)), "250.50");
    }
}
