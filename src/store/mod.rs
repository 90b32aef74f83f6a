//! Store module
//!
//! Persistence seams for the record managers. The managers only see these
//! traits; `postgres` is the production backend and `memory` keeps the same
//! semantics in process.

mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{Account, AccountType, Amount, Customer, CustomerDraft, NewUser, User};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Customer list selection; results are always newest first
#[derive(Debug, Clone, PartialEq)]
pub enum CustomerFilter {
    All,
    /// Case-insensitive substring match on the name
    NameContains(String),
    WithAccounts,
    WithoutAccounts,
    CreatedAfter(DateTime<Utc>),
}

/// Account list selection; results are always newest first
#[derive(Debug, Clone, PartialEq)]
pub enum AccountFilter {
    All,
    Customer(i64),
    Type(AccountType),
    BalanceAbove(Decimal),
    CreatedAfter(DateTime<Utc>),
}

/// Outcome of a conditional withdrawal
#[derive(Debug, Clone, PartialEq)]
pub enum Debit {
    Applied(Account),
    /// Balance did not cover the amount; the record is returned unchanged
    Insufficient(Account),
    NotFound,
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Insert and return the record with its assigned id
    async fn insert_customer(
        &self,
        draft: &CustomerDraft,
        created_date: DateTime<Utc>,
    ) -> StoreResult<Customer>;

    async fn find_customer(&self, customer_id: i64) -> StoreResult<Option<Customer>>;

    async fn find_customer_by_email(&self, email: &str) -> StoreResult<Option<Customer>>;

    /// Whether `email` belongs to a customer other than `except`
    async fn email_taken(&self, email: &str, except: Option<i64>) -> StoreResult<bool>;

    /// Overwrite mutable fields; `None` if the id is absent
    async fn update_customer(
        &self,
        customer_id: i64,
        draft: &CustomerDraft,
        updated_date: DateTime<Utc>,
    ) -> StoreResult<Option<Customer>>;

    /// Remove the record; `false` if the id is absent
    async fn delete_customer(&self, customer_id: i64) -> StoreResult<bool>;

    async fn list_customers(&self, filter: CustomerFilter) -> StoreResult<Vec<Customer>>;

    async fn count_customers(&self) -> StoreResult<i64>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert unless the account number is taken; `None` on collision
    async fn insert_account(&self, account: &Account) -> StoreResult<Option<Account>>;

    async fn account_no_exists(&self, account_no: &str) -> StoreResult<bool>;

    async fn find_account(&self, account_no: &str) -> StoreResult<Option<Account>>;

    /// Remove the record; `false` if absent
    async fn delete_account(&self, account_no: &str) -> StoreResult<bool>;

    /// Atomically add `amount`; `None` if absent
    async fn credit_account(
        &self,
        account_no: &str,
        amount: Amount,
        updated_date: DateTime<Utc>,
    ) -> StoreResult<Option<Account>>;

    /// Atomically subtract `amount` if the balance covers it
    async fn debit_account(
        &self,
        account_no: &str,
        amount: Amount,
        updated_date: DateTime<Utc>,
    ) -> StoreResult<Debit>;

    async fn list_accounts(&self, filter: AccountFilter) -> StoreResult<Vec<Account>>;

    async fn count_accounts(&self, account_type: Option<AccountType>) -> StoreResult<i64>;

    async fn total_balance(&self, account_type: Option<AccountType>) -> StoreResult<Decimal>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_active_user(&self, username: &str) -> StoreResult<Option<User>>;

    async fn user_exists(&self, username: &str) -> StoreResult<bool>;

    async fn insert_user(&self, user: &NewUser, created_date: DateTime<Utc>) -> StoreResult<User>;

    async fn count_users(&self) -> StoreResult<i64>;
}

/// Every store the application needs, behind one object
pub trait Store: CustomerStore + AccountStore + UserStore {}

impl<T: CustomerStore + AccountStore + UserStore> Store for T {}
