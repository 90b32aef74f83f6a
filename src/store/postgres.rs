//! PostgreSQL store
//!
//! Balance mutations are single conditional UPDATE statements, so concurrent
//! deposits and withdrawals on one account cannot lose updates. Account
//! insertion uses `ON CONFLICT DO NOTHING` on the primary key so the
//! allocator sees a concurrent winner as an ordinary collision.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::{Account, AccountType, Amount, Balance, Customer, CustomerDraft, NewUser, User};

use super::{
    AccountFilter, AccountStore, CustomerFilter, CustomerStore, Debit, StoreError, StoreResult,
    UserStore,
};

const CUSTOMER_COLUMNS: &str =
    "customer_id, name, email, mobile_number, address, created_date, updated_date";

const ACCOUNT_COLUMNS: &str = "account_no, account_holder_name, account_balance, account_type, \
     customer_id, created_date, updated_date";

const USER_COLUMNS: &str = "id, username, password_hash, role, is_active, created_date";

/// SQLSTATE numeric_value_out_of_range
const NUMERIC_OUT_OF_RANGE: &str = "22003";

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    customer_id: i64,
    name: String,
    email: String,
    mobile_number: String,
    address: String,
    created_date: DateTime<Utc>,
    updated_date: Option<DateTime<Utc>>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            customer_id: row.customer_id,
            name: row.name,
            email: row.email,
            mobile_number: row.mobile_number,
            address: row.address,
            created_date: row.created_date,
            updated_date: row.updated_date,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    account_no: String,
    account_holder_name: String,
    account_balance: Decimal,
    account_type: String,
    customer_id: i64,
    created_date: DateTime<Utc>,
    updated_date: Option<DateTime<Utc>>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        // Legacy rows may still say SAVING
        let account_type = AccountType::normalize(&row.account_type)
            .map_err(|e| StoreError::Corrupt(format!("account {}: {}", row.account_no, e)))?;
        let account_balance = Balance::new(row.account_balance)
            .map_err(|e| StoreError::Corrupt(format!("account {}: {}", row.account_no, e)))?;

        Ok(Account {
            account_no: row.account_no,
            account_holder_name: row.account_holder_name,
            account_balance,
            account_type,
            customer_id: row.customer_id,
            created_date: row.created_date,
            updated_date: row.updated_date,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    role: String,
    is_active: bool,
    created_date: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role: row.role,
            is_active: row.is_active,
            created_date: row.created_date,
        }
    }
}

fn into_accounts(rows: Vec<AccountRow>) -> StoreResult<Vec<Account>> {
    rows.into_iter().map(Account::try_from).collect()
}

fn type_literals(account_type: AccountType) -> Vec<String> {
    account_type
        .stored_literals()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn is_out_of_range(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE))
}

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgStore {
    async fn insert_customer(
        &self,
        draft: &CustomerDraft,
        created_date: DateTime<Utc>,
    ) -> StoreResult<Customer> {
        let sql = format!(
            r#"
            INSERT INTO customers (name, email, mobile_number, address, created_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CUSTOMER_COLUMNS}
            "#
        );

        let row: CustomerRow = sqlx::query_as(&sql)
            .bind(&draft.name)
            .bind(&draft.email)
            .bind(&draft.mobile_number)
            .bind(&draft.address)
            .bind(created_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateEmail(draft.email.clone())
                } else {
                    e.into()
                }
            })?;

        Ok(row.into())
    }

    async fn find_customer(&self, customer_id: i64) -> StoreResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE customer_id = $1");

        let row: Option<CustomerRow> = sqlx::query_as(&sql)
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Customer::from))
    }

    async fn find_customer_by_email(&self, email: &str) -> StoreResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE email = $1");

        let row: Option<CustomerRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Customer::from))
    }

    async fn email_taken(&self, email: &str, except: Option<i64>) -> StoreResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM customers
                WHERE email = $1 AND ($2::BIGINT IS NULL OR customer_id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn update_customer(
        &self,
        customer_id: i64,
        draft: &CustomerDraft,
        updated_date: DateTime<Utc>,
    ) -> StoreResult<Option<Customer>> {
        let sql = format!(
            r#"
            UPDATE customers
            SET name = $2, email = $3, mobile_number = $4, address = $5, updated_date = $6
            WHERE customer_id = $1
            RETURNING {CUSTOMER_COLUMNS}
            "#
        );

        let row: Option<CustomerRow> = sqlx::query_as(&sql)
            .bind(customer_id)
            .bind(&draft.name)
            .bind(&draft.email)
            .bind(&draft.mobile_number)
            .bind(&draft.address)
            .bind(updated_date)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateEmail(draft.email.clone())
                } else {
                    e.into()
                }
            })?;

        Ok(row.map(Customer::from))
    }

    async fn delete_customer(&self, customer_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE customer_id = $1")
            .bind(customer_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::CustomerInUse(customer_id)
                } else {
                    e.into()
                }
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_customers(&self, filter: CustomerFilter) -> StoreResult<Vec<Customer>> {
        let order = "ORDER BY created_date DESC, customer_id DESC";

        let rows: Vec<CustomerRow> = match filter {
            CustomerFilter::All => {
                sqlx::query_as(&format!("SELECT {CUSTOMER_COLUMNS} FROM customers {order}"))
                    .fetch_all(&self.pool)
                    .await?
            }
            CustomerFilter::NameContains(pattern) => {
                // strpos avoids treating % and _ in the pattern as wildcards
                sqlx::query_as(&format!(
                    "SELECT {CUSTOMER_COLUMNS} FROM customers \
                     WHERE strpos(lower(name), lower($1)) > 0 {order}"
                ))
                .bind(pattern)
                .fetch_all(&self.pool)
                .await?
            }
            CustomerFilter::WithAccounts => {
                sqlx::query_as(&format!(
                    "SELECT {CUSTOMER_COLUMNS} FROM customers c WHERE EXISTS \
                     (SELECT 1 FROM accounts a WHERE a.customer_id = c.customer_id) {order}"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            CustomerFilter::WithoutAccounts => {
                sqlx::query_as(&format!(
                    "SELECT {CUSTOMER_COLUMNS} FROM customers c WHERE NOT EXISTS \
                     (SELECT 1 FROM accounts a WHERE a.customer_id = c.customer_id) {order}"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            CustomerFilter::CreatedAfter(cutoff) => {
                sqlx::query_as(&format!(
                    "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE created_date > $1 {order}"
                ))
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    async fn count_customers(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn insert_account(&self, account: &Account) -> StoreResult<Option<Account>> {
        let sql = format!(
            r#"
            INSERT INTO accounts
                (account_no, account_holder_name, account_balance, account_type, customer_id, created_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (account_no) DO NOTHING
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(&account.account_no)
            .bind(&account.account_holder_name)
            .bind(account.account_balance.value())
            .bind(account.account_type.as_str())
            .bind(account.customer_id)
            .bind(account.created_date)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::MissingCustomer(account.customer_id)
                } else {
                    e.into()
                }
            })?;

        row.map(Account::try_from).transpose()
    }

    async fn account_no_exists(&self, account_no: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE account_no = $1)")
                .bind(account_no)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn find_account(&self, account_no: &str) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_no = $1");

        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(account_no)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Account::try_from).transpose()
    }

    async fn delete_account(&self, account_no: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE account_no = $1")
            .bind(account_no)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn credit_account(
        &self,
        account_no: &str,
        amount: Amount,
        updated_date: DateTime<Utc>,
    ) -> StoreResult<Option<Account>> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET account_balance = account_balance + $2, updated_date = $3
            WHERE account_no = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(account_no)
            .bind(amount.value())
            .bind(updated_date)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_out_of_range(&e) {
                    StoreError::OutOfRange(format!("balance of {} after deposit", account_no))
                } else {
                    e.into()
                }
            })?;

        row.map(Account::try_from).transpose()
    }

    async fn debit_account(
        &self,
        account_no: &str,
        amount: Amount,
        updated_date: DateTime<Utc>,
    ) -> StoreResult<Debit> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET account_balance = account_balance - $2, updated_date = $3
            WHERE account_no = $1 AND account_balance >= $2
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(account_no)
            .bind(amount.value())
            .bind(updated_date)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Ok(Debit::Applied(row.try_into()?));
        }

        // No row updated: either absent or not enough funds
        Ok(match self.find_account(account_no).await? {
            Some(account) => Debit::Insufficient(account),
            None => Debit::NotFound,
        })
    }

    async fn list_accounts(&self, filter: AccountFilter) -> StoreResult<Vec<Account>> {
        let order = "ORDER BY created_date DESC, account_no DESC";

        let rows: Vec<AccountRow> = match filter {
            AccountFilter::All => {
                sqlx::query_as(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts {order}"))
                    .fetch_all(&self.pool)
                    .await?
            }
            AccountFilter::Customer(customer_id) => {
                sqlx::query_as(&format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE customer_id = $1 {order}"
                ))
                .bind(customer_id)
                .fetch_all(&self.pool)
                .await?
            }
            AccountFilter::Type(account_type) => {
                sqlx::query_as(&format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_type = ANY($1) {order}"
                ))
                .bind(type_literals(account_type))
                .fetch_all(&self.pool)
                .await?
            }
            AccountFilter::BalanceAbove(min) => {
                sqlx::query_as(&format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_balance > $1 {order}"
                ))
                .bind(min)
                .fetch_all(&self.pool)
                .await?
            }
            AccountFilter::CreatedAfter(cutoff) => {
                sqlx::query_as(&format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE created_date > $1 {order}"
                ))
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await?
            }
        };

        into_accounts(rows)
    }

    async fn count_accounts(&self, account_type: Option<AccountType>) -> StoreResult<i64> {
        let count: i64 = match account_type {
            Some(account_type) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE account_type = ANY($1)")
                    .bind(type_literals(account_type))
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(count)
    }

    async fn total_balance(&self, account_type: Option<AccountType>) -> StoreResult<Decimal> {
        let total: Decimal = match account_type {
            Some(account_type) => {
                sqlx::query_scalar(
                    "SELECT COALESCE(SUM(account_balance), 0) FROM accounts WHERE account_type = ANY($1)",
                )
                .bind(type_literals(account_type))
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT COALESCE(SUM(account_balance), 0) FROM accounts")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(total)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_active_user(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND is_active = true");

        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn user_exists(&self, username: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn insert_user(&self, user: &NewUser, created_date: DateTime<Utc>) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (username, password_hash, role, is_active, created_date)
            VALUES ($1, $2, $3, true, $4)
            RETURNING {USER_COLUMNS}
            "#
        );

        let row: UserRow = sqlx::query_as(&sql)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.role)
            .bind(created_date)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn count_users(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
