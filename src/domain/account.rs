//! Account record
//!
//! Balance mutation rules:
//! - deposit of a non-positive amount is a no-op (no timestamp refresh)
//! - withdrawal of a non-positive amount, or of more than the balance, is
//!   rejected without touching state
//! - every applied mutation refreshes `updated_date`

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AccountType, Amount, AmountError, Balance, DomainError};

const HOLDER_NAME_MIN: usize = 2;
const HOLDER_NAME_MAX: usize = 100;

/// Stored account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_no: String,
    pub account_holder_name: String,
    pub account_balance: Balance,
    pub account_type: AccountType,
    pub customer_id: i64,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

impl Account {
    /// Apply a deposit. Returns whether the balance changed.
    pub fn deposit(&mut self, amount: Decimal, now: DateTime<Utc>) -> Result<bool, DomainError> {
        let amount = match positive_amount(amount)? {
            Some(amount) => amount,
            None => return Ok(false),
        };
        self.account_balance = self.account_balance.credit(&amount)?;
        self.updated_date = Some(now);
        Ok(true)
    }

    /// Apply a withdrawal. Returns `false`, leaving the account untouched,
    /// when the amount is non-positive or exceeds the balance.
    pub fn withdraw(&mut self, amount: Decimal, now: DateTime<Utc>) -> Result<bool, DomainError> {
        let amount = match positive_amount(amount)? {
            Some(amount) => amount,
            None => return Ok(false),
        };
        match self.account_balance.debit(&amount) {
            Ok(balance) => {
                self.account_balance = balance;
                self.updated_date = Some(now);
                Ok(true)
            }
            Err(AmountError::Insufficient { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// `None` for amounts the mutation rules treat as "nothing to do"
pub fn positive_amount(amount: Decimal) -> Result<Option<Amount>, DomainError> {
    match Amount::new(amount) {
        Ok(amount) => Ok(Some(amount)),
        Err(AmountError::NotPositive(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Validated input for a new account. The account number is never part of
/// it: the allocator assigns one on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountDraft {
    pub account_holder_name: String,
    pub account_balance: Balance,
    pub account_type: AccountType,
    pub customer_id: i64,
}

impl AccountDraft {
    pub fn new(
        account_holder_name: impl Into<String>,
        balance: Decimal,
        account_type: AccountType,
        customer_id: i64,
    ) -> Result<Self, DomainError> {
        let account_holder_name = account_holder_name.into().trim().to_string();
        let len = account_holder_name.chars().count();
        if len == 0 {
            return Err(DomainError::validation("Account holder name is required"));
        }
        if !(HOLDER_NAME_MIN..=HOLDER_NAME_MAX).contains(&len) {
            return Err(DomainError::validation(format!(
                "Account holder name must be between {} and {} characters",
                HOLDER_NAME_MIN, HOLDER_NAME_MAX
            )));
        }

        let account_balance = Balance::new(balance).map_err(|e| match e {
            AmountError::Negative(_) => {
                DomainError::validation("Account balance must be non-negative")
            }
            other => other.into(),
        })?;

        Ok(Self {
            account_holder_name,
            account_balance,
            account_type,
            customer_id,
        })
    }

    /// Materialize the record once an account number has been allocated
    pub fn into_account(self, account_no: String, created_date: DateTime<Utc>) -> Account {
        Account {
            account_no,
            account_holder_name: self.account_holder_name,
            account_balance: self.account_balance,
            account_type: self.account_type,
            customer_id: self.customer_id,
            created_date,
            updated_date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn account(balance: Decimal) -> Account {
        AccountDraft::new("Ann Lee", balance, AccountType::Savings, 1)
            .unwrap()
            .into_account("ACC000001".to_string(), Utc::now() - Duration::minutes(5))
    }

    #[test]
    fn test_deposit_adds_and_refreshes_timestamp() {
        let mut acc = account(dec!(100));
        let now = Utc::now();

        assert!(acc.deposit(dec!(50), now).unwrap());
        assert_eq!(acc.account_balance.value(), dec!(150.00));
        assert_eq!(acc.updated_date, Some(now));
    }

    #[test]
    fn test_non_positive_deposit_is_noop() {
        let mut acc = account(dec!(100));
        let before = acc.clone();

        assert!(!acc.deposit(Decimal::ZERO, Utc::now()).unwrap());
        assert!(!acc.deposit(dec!(-10), Utc::now()).unwrap());
        assert_eq!(acc, before);
    }

    #[test]
    fn test_overdraft_rejected_without_mutation() {
        let mut acc = account(dec!(100));
        let before = acc.clone();

        assert!(!acc.withdraw(dec!(150), Utc::now()).unwrap());
        assert_eq!(acc, before);
    }

    #[test]
    fn test_withdraw_within_balance() {
        let mut acc = account(dec!(100));

        assert!(acc.withdraw(dec!(100), Utc::now()).unwrap());
        assert_eq!(acc.account_balance, Balance::zero());
        assert!(acc.updated_date.is_some());
    }

    #[test]
    fn test_non_positive_withdraw_rejected() {
        let mut acc = account(dec!(100));

        assert!(!acc.withdraw(Decimal::ZERO, Utc::now()).unwrap());
        assert!(!acc.withdraw(dec!(-1), Utc::now()).unwrap());
        assert!(acc.updated_date.is_none());
    }

    #[test]
    fn test_sub_cent_amount_is_validation_error() {
        let mut acc = account(dec!(100));

        assert!(matches!(acc.deposit(dec!(0.001), Utc::now()), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_negative_opening_balance_rejected() {
        let err = AccountDraft::new("Ann Lee", dec!(-0.01), AccountType::Current, 1).unwrap_err();
        assert_eq!(err, DomainError::validation("Account balance must be non-negative"));
    }

    #[test]
    fn test_holder_name_required() {
        assert!(AccountDraft::new("  ", dec!(1), AccountType::Current, 1).is_err());
        assert!(AccountDraft::new("A", dec!(1), AccountType::Current, 1).is_err());
    }

    #[test]
    fn test_account_serializes_camel_case() {
        let json = serde_json::to_value(account(dec!(100))).unwrap();

        assert_eq!(json["accountNo"], "ACC000001");
        assert_eq!(json["accountBalance"], "100.00");
        assert_eq!(json["accountType"], "SAVINGS");
        assert_eq!(json["customerId"], 1);
        assert!(json["updatedDate"].is_null());
    }
}
