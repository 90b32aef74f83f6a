//! Account Service
//!
//! Record manager for accounts: customer reference check, non-negative
//! balance, account-number allocation, deposit and withdrawal.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::account::positive_amount;
use crate::domain::account_number::MAX_CONCURRENT_RETRIES;
use crate::domain::{
    Account, AccountDraft, AccountNumberAllocator, AccountType, DomainError, OperationContext,
};
use crate::error::{AppError, AppResult};
use crate::store::{AccountFilter, Debit, Store, StoreError};

use super::customer_service::recent_window;

/// Result of a withdrawal attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Withdrawal {
    /// `false` when the amount was non-positive or exceeded the balance
    pub succeeded: bool,
    /// Account state after the attempt
    pub account: Account,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Open an account for an existing customer
    pub async fn create(
        &self,
        account_holder_name: String,
        balance: Decimal,
        account_type: AccountType,
        customer_id: i64,
        context: &OperationContext,
    ) -> AppResult<Account> {
        if self.store.find_customer(customer_id).await?.is_none() {
            return Err(DomainError::customer_not_found(customer_id).into());
        }

        let draft = AccountDraft::new(account_holder_name, balance, account_type, customer_id)?;
        let account = self.insert_with_new_number(draft).await?;

        tracing::info!(
            account_no = %account.account_no,
            customer_id,
            account_type = account.account_type.display_name(),
            balance = %account.account_balance,
            actor = context.actor(),
            "Account created"
        );

        Ok(account)
    }

    /// Allocate a number and insert, advancing past numbers that are taken
    /// already or get taken by a concurrent insert.
    async fn insert_with_new_number(&self, draft: AccountDraft) -> AppResult<Account> {
        let count = self.store.count_accounts(None).await?;
        let created_date = Utc::now();
        let mut allocator = AccountNumberAllocator::starting_after(count.max(0) as u64);
        let mut lost_races = 0;

        loop {
            let candidate = allocator.next_candidate();
            if self.store.account_no_exists(&candidate).await? {
                continue;
            }

            let account = draft.clone().into_account(candidate, created_date);
            match self.store.insert_account(&account).await {
                Ok(Some(inserted)) => return Ok(inserted),
                Ok(None) => {
                    lost_races += 1;
                    tracing::debug!(
                        account_no = %account.account_no,
                        lost_races,
                        "Account number taken concurrently, trying next"
                    );
                    if lost_races >= MAX_CONCURRENT_RETRIES {
                        return Err(AppError::Internal(
                            "Account number allocation kept losing to concurrent inserts"
                                .to_string(),
                        ));
                    }
                }
                Err(StoreError::MissingCustomer(id)) => {
                    return Err(DomainError::customer_not_found(id).into());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn get_by_number(&self, account_no: &str) -> AppResult<Account> {
        self.store
            .find_account(account_no)
            .await?
            .ok_or_else(|| DomainError::account_not_found(account_no).into())
    }

    /// Remove an account regardless of its balance
    pub async fn delete(&self, account_no: &str, context: &OperationContext) -> AppResult<()> {
        if !self.store.delete_account(account_no).await? {
            return Err(DomainError::account_not_found(account_no).into());
        }

        tracing::info!(account_no, actor = context.actor(), "Account deleted");

        Ok(())
    }

    /// Add `amount` to the balance. A non-positive amount changes nothing
    /// and returns the account as it is.
    pub async fn deposit(
        &self,
        account_no: &str,
        amount: Decimal,
        context: &OperationContext,
    ) -> AppResult<Account> {
        let Some(amount) = positive_amount(amount)? else {
            return self.get_by_number(account_no).await;
        };

        let account = self
            .store
            .credit_account(account_no, amount, Utc::now())
            .await?
            .ok_or_else(|| DomainError::account_not_found(account_no))?;

        tracing::info!(
            account_no,
            amount = %amount,
            balance = %account.account_balance,
            actor = context.actor(),
            "Deposit applied"
        );

        Ok(account)
    }

    /// Subtract `amount` if the balance covers it. Rejections leave the
    /// account untouched.
    pub async fn withdraw(
        &self,
        account_no: &str,
        amount: Decimal,
        context: &OperationContext,
    ) -> AppResult<Withdrawal> {
        let Some(amount) = positive_amount(amount)? else {
            let account = self.get_by_number(account_no).await?;
            return Ok(Withdrawal {
                succeeded: false,
                account,
            });
        };

        match self
            .store
            .debit_account(account_no, amount, Utc::now())
            .await?
        {
            Debit::Applied(account) => {
                tracing::info!(
                    account_no,
                    amount = %amount,
                    balance = %account.account_balance,
                    actor = context.actor(),
                    "Withdrawal applied"
                );
                Ok(Withdrawal {
                    succeeded: true,
                    account,
                })
            }
            Debit::Insufficient(account) => {
                tracing::warn!(
                    account_no,
                    amount = %amount,
                    balance = %account.account_balance,
                    actor = context.actor(),
                    "Withdrawal rejected: insufficient balance"
                );
                Ok(Withdrawal {
                    succeeded: false,
                    account,
                })
            }
            Debit::NotFound => Err(DomainError::account_not_found(account_no).into()),
        }
    }

    /// All accounts, newest first
    pub async fn list(&self) -> AppResult<Vec<Account>> {
        Ok(self.store.list_accounts(AccountFilter::All).await?)
    }

    pub async fn list_by_customer(&self, customer_id: i64) -> AppResult<Vec<Account>> {
        Ok(self
            .store
            .list_accounts(AccountFilter::Customer(customer_id))
            .await?)
    }

    pub async fn list_by_type(&self, account_type: AccountType) -> AppResult<Vec<Account>> {
        Ok(self
            .store
            .list_accounts(AccountFilter::Type(account_type))
            .await?)
    }

    /// Accounts whose balance is strictly above `min`
    pub async fn list_with_balance_above(&self, min: Decimal) -> AppResult<Vec<Account>> {
        Ok(self
            .store
            .list_accounts(AccountFilter::BalanceAbove(min))
            .await?)
    }

    pub async fn list_recent(&self, days: i64) -> AppResult<Vec<Account>> {
        let cutoff = Utc::now() - recent_window(days)?;
        Ok(self
            .store
            .list_accounts(AccountFilter::CreatedAfter(cutoff))
            .await?)
    }

    pub async fn total_balance(&self) -> AppResult<Decimal> {
        Ok(self.store.total_balance(None).await?)
    }

    pub async fn total_balance_by_type(&self, account_type: AccountType) -> AppResult<Decimal> {
        Ok(self.store.total_balance(Some(account_type)).await?)
    }

    pub async fn count(&self) -> AppResult<i64> {
        Ok(self.store.count_accounts(None).await?)
    }

    pub async fn count_by_type(&self, account_type: AccountType) -> AppResult<i64> {
        Ok(self.store.count_accounts(Some(account_type)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::domain::CustomerDraft;
    use crate::store::{CustomerStore, MemoryStore};

    async fn setup() -> (AccountService, Arc<MemoryStore>, i64) {
        let store = Arc::new(MemoryStore::new());
        let customer = store
            .insert_customer(
                &CustomerDraft::new("Ann Lee", "ann@x.com", "+1-555", "10 Main St, City, ST 00000"),
                Utc::now(),
            )
            .await
            .unwrap();
        (AccountService::new(store.clone()), store, customer.customer_id)
    }

    async fn open(service: &AccountService, customer_id: i64, balance: Decimal) -> Account {
        service
            .create(
                "Ann Lee".to_string(),
                balance,
                AccountType::Savings,
                customer_id,
                &OperationContext::new(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sequential_numbers_on_empty_store() {
        let (service, _, customer_id) = setup().await;

        let mut numbers = Vec::new();
        for _ in 0..5 {
            numbers.push(open(&service, customer_id, dec!(1)).await.account_no);
        }

        assert_eq!(
            numbers,
            vec!["ACC000001", "ACC000002", "ACC000003", "ACC000004", "ACC000005"]
        );
    }

    #[tokio::test]
    async fn test_allocator_skips_numbers_freed_by_delete() {
        let (service, _, customer_id) = setup().await;
        let ctx = OperationContext::new();
        open(&service, customer_id, dec!(1)).await;
        open(&service, customer_id, dec!(1)).await;
        open(&service, customer_id, dec!(1)).await;

        // count drops to 2, so the first candidate ACC000003 collides
        service.delete("ACC000001", &ctx).await.unwrap();
        let next = open(&service, customer_id, dec!(1)).await;

        assert_eq!(next.account_no, "ACC000004");
    }

    #[tokio::test]
    async fn test_allocator_walks_past_long_runs_of_taken_numbers() {
        let (service, _, customer_id) = setup().await;
        let ctx = OperationContext::new();
        for _ in 0..130 {
            open(&service, customer_id, dec!(1)).await;
        }
        for sequence in 1..=64 {
            service
                .delete(&crate::domain::format_account_number(sequence), &ctx)
                .await
                .unwrap();
        }

        // count is 66; ACC000067..ACC000130 are all still taken
        let next = open(&service, customer_id, dec!(1)).await;

        assert_eq!(next.account_no, "ACC000131");
        assert_eq!(service.count().await.unwrap(), 67);
    }

    #[tokio::test]
    async fn test_create_for_missing_customer() {
        let (service, _, _) = setup().await;

        let err = service
            .create("Ghost".into(), dec!(-5), AccountType::Current, 99, &OperationContext::new())
            .await
            .unwrap_err();

        // Customer reference is checked before the balance
        assert!(matches!(err, AppError::Domain(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_create_negative_balance() {
        let (service, _, customer_id) = setup().await;

        let err = service
            .create("Ann Lee".into(), dec!(-5), AccountType::Current, customer_id, &OperationContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Domain(DomainError::Validation(_))));
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deposit_and_withdraw_scenario() {
        let (service, _, customer_id) = setup().await;
        let ctx = OperationContext::new();
        let account = open(&service, customer_id, dec!(100.00)).await;
        assert_eq!(account.account_no, "ACC000001");

        let rejected = service.withdraw("ACC000001", dec!(150), &ctx).await.unwrap();
        assert!(!rejected.succeeded);
        assert_eq!(rejected.account.account_balance.value(), dec!(100.00));
        assert!(rejected.account.updated_date.is_none());

        let deposited = service.deposit("ACC000001", dec!(50), &ctx).await.unwrap();
        assert_eq!(deposited.account_balance.to_string(), "150.00");
        assert!(deposited.updated_date.is_some());

        let withdrawn = service.withdraw("ACC000001", dec!(150), &ctx).await.unwrap();
        assert!(withdrawn.succeeded);
        assert_eq!(withdrawn.account.account_balance.to_string(), "0.00");
    }

    #[tokio::test]
    async fn test_non_positive_amounts() {
        let (service, _, customer_id) = setup().await;
        let ctx = OperationContext::new();
        open(&service, customer_id, dec!(100)).await;

        let unchanged = service.deposit("ACC000001", dec!(0), &ctx).await.unwrap();
        assert_eq!(unchanged.account_balance.value(), dec!(100));
        assert!(unchanged.updated_date.is_none());

        let rejected = service.withdraw("ACC000001", dec!(-1), &ctx).await.unwrap();
        assert!(!rejected.succeeded);
    }

    #[tokio::test]
    async fn test_mutating_missing_account() {
        let (service, _, _) = setup().await;
        let ctx = OperationContext::new();

        for result in [
            service.deposit("ACC404404", dec!(1), &ctx).await.map(|_| ()),
            service.withdraw("ACC404404", dec!(1), &ctx).await.map(|_| ()),
            service.delete("ACC404404", &ctx).await,
        ] {
            assert!(matches!(result, Err(AppError::Domain(ref e)) if e.is_not_found()));
        }
    }

    #[tokio::test]
    async fn test_aggregates() {
        let (service, _, customer_id) = setup().await;
        let ctx = OperationContext::new();
        open(&service, customer_id, dec!(100)).await;
        open(&service, customer_id, dec!(20.50)).await;
        service
            .create("Ann Lee".into(), dec!(5), AccountType::Business, customer_id, &ctx)
            .await
            .unwrap();

        assert_eq!(service.count().await.unwrap(), 3);
        assert_eq!(service.count_by_type(AccountType::Savings).await.unwrap(), 2);
        assert_eq!(service.total_balance().await.unwrap(), dec!(125.50));
        assert_eq!(
            service.total_balance_by_type(AccountType::Business).await.unwrap(),
            dec!(5)
        );
        assert_eq!(service.total_balance_by_type(AccountType::Checking).await.unwrap(), dec!(0));
        assert_eq!(service.list_by_type(AccountType::Business).await.unwrap().len(), 1);
        assert_eq!(service.list_by_customer(customer_id).await.unwrap().len(), 3);
        assert_eq!(service.list_with_balance_above(dec!(20.50)).await.unwrap().len(), 1);
        assert_eq!(service.list_recent(30).await.unwrap().len(), 3);
    }
}
