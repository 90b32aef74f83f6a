//! In-memory store
//!
//! Same observable semantics as the PostgreSQL store, held in process
//! behind one lock. Each operation takes the lock once, so conditional
//! updates are atomic here as well.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::domain::{Account, AccountType, Amount, Customer, CustomerDraft, NewUser, User};

use super::{
    AccountFilter, AccountStore, CustomerFilter, CustomerStore, Debit, StoreError, StoreResult,
    UserStore,
};

#[derive(Debug, Default)]
struct State {
    customers: BTreeMap<i64, Customer>,
    next_customer_id: i64,
    accounts: HashMap<String, Account>,
    users: BTreeMap<String, User>,
    next_user_id: i64,
}

impl State {
    fn owns_accounts(&self, customer_id: i64) -> bool {
        self.accounts.values().any(|a| a.customer_id == customer_id)
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.customers
            .values()
            .any(|c| c.email == email && Some(c.customer_id) != except)
    }

    fn accounts_of_type(&self, account_type: Option<AccountType>) -> impl Iterator<Item = &Account> {
        self.accounts
            .values()
            .filter(move |a| account_type.map_or(true, |t| a.account_type == t))
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_customers_first(mut customers: Vec<Customer>) -> Vec<Customer> {
    customers.sort_by(|a, b| {
        b.created_date
            .cmp(&a.created_date)
            .then(b.customer_id.cmp(&a.customer_id))
    });
    customers
}

fn newest_accounts_first(mut accounts: Vec<Account>) -> Vec<Account> {
    accounts.sort_by(|a, b| {
        b.created_date
            .cmp(&a.created_date)
            .then(b.account_no.cmp(&a.account_no))
    });
    accounts
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn insert_customer(
        &self,
        draft: &CustomerDraft,
        created_date: DateTime<Utc>,
    ) -> StoreResult<Customer> {
        let mut state = self.state.write().await;
        if state.email_taken(&draft.email, None) {
            return Err(StoreError::DuplicateEmail(draft.email.clone()));
        }

        state.next_customer_id += 1;
        let customer = Customer {
            customer_id: state.next_customer_id,
            name: draft.name.clone(),
            email: draft.email.clone(),
            mobile_number: draft.mobile_number.clone(),
            address: draft.address.clone(),
            created_date,
            updated_date: None,
        };
        state.customers.insert(customer.customer_id, customer.clone());

        Ok(customer)
    }

    async fn find_customer(&self, customer_id: i64) -> StoreResult<Option<Customer>> {
        Ok(self.state.read().await.customers.get(&customer_id).cloned())
    }

    async fn find_customer_by_email(&self, email: &str) -> StoreResult<Option<Customer>> {
        let state = self.state.read().await;
        Ok(state.customers.values().find(|c| c.email == email).cloned())
    }

    async fn email_taken(&self, email: &str, except: Option<i64>) -> StoreResult<bool> {
        Ok(self.state.read().await.email_taken(email, except))
    }

    async fn update_customer(
        &self,
        customer_id: i64,
        draft: &CustomerDraft,
        updated_date: DateTime<Utc>,
    ) -> StoreResult<Option<Customer>> {
        let mut state = self.state.write().await;
        if !state.customers.contains_key(&customer_id) {
            return Ok(None);
        }
        if state.email_taken(&draft.email, Some(customer_id)) {
            return Err(StoreError::DuplicateEmail(draft.email.clone()));
        }

        let customer = state
            .customers
            .get_mut(&customer_id)
            .ok_or(StoreError::Corrupt(format!("customer {} vanished", customer_id)))?;
        customer.name = draft.name.clone();
        customer.email = draft.email.clone();
        customer.mobile_number = draft.mobile_number.clone();
        customer.address = draft.address.clone();
        customer.updated_date = Some(updated_date);

        Ok(Some(customer.clone()))
    }

    async fn delete_customer(&self, customer_id: i64) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.owns_accounts(customer_id) {
            return Err(StoreError::CustomerInUse(customer_id));
        }
        Ok(state.customers.remove(&customer_id).is_some())
    }

    async fn list_customers(&self, filter: CustomerFilter) -> StoreResult<Vec<Customer>> {
        let state = self.state.read().await;
        let matches = |c: &Customer| match &filter {
            CustomerFilter::All => true,
            CustomerFilter::NameContains(pattern) => {
                c.name.to_lowercase().contains(&pattern.to_lowercase())
            }
            CustomerFilter::WithAccounts => state.owns_accounts(c.customer_id),
            CustomerFilter::WithoutAccounts => !state.owns_accounts(c.customer_id),
            CustomerFilter::CreatedAfter(cutoff) => c.created_date > *cutoff,
        };

        let customers = state.customers.values().filter(|c| matches(c)).cloned().collect();
        Ok(newest_customers_first(customers))
    }

    async fn count_customers(&self) -> StoreResult<i64> {
        Ok(self.state.read().await.customers.len() as i64)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, account: &Account) -> StoreResult<Option<Account>> {
        let mut state = self.state.write().await;
        if !state.customers.contains_key(&account.customer_id) {
            return Err(StoreError::MissingCustomer(account.customer_id));
        }
        if state.accounts.contains_key(&account.account_no) {
            return Ok(None);
        }

        state
            .accounts
            .insert(account.account_no.clone(), account.clone());
        Ok(Some(account.clone()))
    }

    async fn account_no_exists(&self, account_no: &str) -> StoreResult<bool> {
        Ok(self.state.read().await.accounts.contains_key(account_no))
    }

    async fn find_account(&self, account_no: &str) -> StoreResult<Option<Account>> {
        Ok(self.state.read().await.accounts.get(account_no).cloned())
    }

    async fn delete_account(&self, account_no: &str) -> StoreResult<bool> {
        Ok(self.state.write().await.accounts.remove(account_no).is_some())
    }

    async fn credit_account(
        &self,
        account_no: &str,
        amount: Amount,
        updated_date: DateTime<Utc>,
    ) -> StoreResult<Option<Account>> {
        let mut state = self.state.write().await;
        let Some(account) = state.accounts.get_mut(account_no) else {
            return Ok(None);
        };

        account
            .deposit(amount.value(), updated_date)
            .map_err(|e| StoreError::OutOfRange(e.to_string()))?;

        Ok(Some(account.clone()))
    }

    async fn debit_account(
        &self,
        account_no: &str,
        amount: Amount,
        updated_date: DateTime<Utc>,
    ) -> StoreResult<Debit> {
        let mut state = self.state.write().await;
        let Some(account) = state.accounts.get_mut(account_no) else {
            return Ok(Debit::NotFound);
        };

        match account.withdraw(amount.value(), updated_date) {
            Ok(true) => Ok(Debit::Applied(account.clone())),
            Ok(false) => Ok(Debit::Insufficient(account.clone())),
            Err(e) => Err(StoreError::OutOfRange(e.to_string())),
        }
    }

    async fn list_accounts(&self, filter: AccountFilter) -> StoreResult<Vec<Account>> {
        let state = self.state.read().await;
        let matches = |a: &Account| match &filter {
            AccountFilter::All => true,
            AccountFilter::Customer(customer_id) => a.customer_id == *customer_id,
            AccountFilter::Type(account_type) => a.account_type == *account_type,
            AccountFilter::BalanceAbove(min) => a.account_balance.value() > *min,
            AccountFilter::CreatedAfter(cutoff) => a.created_date > *cutoff,
        };

        let accounts = state.accounts.values().filter(|a| matches(a)).cloned().collect();
        Ok(newest_accounts_first(accounts))
    }

    async fn count_accounts(&self, account_type: Option<AccountType>) -> StoreResult<i64> {
        Ok(self.state.read().await.accounts_of_type(account_type).count() as i64)
    }

    async fn total_balance(&self, account_type: Option<AccountType>) -> StoreResult<Decimal> {
        let state = self.state.read().await;
        Ok(state
            .accounts_of_type(account_type)
            .map(|a| a.account_balance.value())
            .sum())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_active_user(&self, username: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(username).filter(|u| u.is_active).cloned())
    }

    async fn user_exists(&self, username: &str) -> StoreResult<bool> {
        Ok(self.state.read().await.users.contains_key(username))
    }

    async fn insert_user(&self, user: &NewUser, created_date: DateTime<Utc>) -> StoreResult<User> {
        let mut state = self.state.write().await;
        state.next_user_id += 1;
        let stored = User {
            id: state.next_user_id,
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role.clone(),
            is_active: true,
            created_date,
        };
        state.users.insert(stored.username.clone(), stored.clone());

        Ok(stored)
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(self.state.read().await.users.len() as i64)
    }
}
