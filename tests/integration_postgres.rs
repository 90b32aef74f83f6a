//! PostgreSQL store tests
//!
//! Need a disposable database; every test truncates the tables:
//! `DATABASE_URL=... cargo test --test integration_postgres -- --ignored --test-threads=1`

use std::sync::Arc;

use chrono::Utc;
use rust_decimal_macros::dec;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use banking_admin::db;
use banking_admin::domain::{AccountDraft, AccountType, Amount, CustomerDraft};
use banking_admin::store::{
    AccountFilter, AccountStore, CustomerFilter, CustomerStore, Debit, PgStore, StoreError,
};
use banking_admin::AppState;

/// Migrate and empty the tables
async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    db::run_migrations(&pool).await.expect("Failed to migrate");
    assert!(db::check_schema(&pool).await.unwrap());

    sqlx::query("TRUNCATE TABLE accounts, customers, users RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    pool
}

fn draft(email: &str) -> CustomerDraft {
    CustomerDraft::new("Ann Lee", email, "+1-555", "10 Main St, City, ST 00000")
}

async fn customer_with_account(store: &PgStore, balance: rust_decimal::Decimal) -> i64 {
    let customer = store.insert_customer(&draft("ann@x.com"), Utc::now()).await.unwrap();
    let account = AccountDraft::new("Ann Lee", balance, AccountType::Savings, customer.customer_id)
        .unwrap()
        .into_account("ACC000001".to_string(), Utc::now());
    store.insert_account(&account).await.unwrap().unwrap();
    customer.customer_id
}

#[tokio::test]
#[ignore]
async fn test_duplicate_email_and_account_collision() {
    let store = PgStore::new(setup_test_db().await);
    let customer_id = customer_with_account(&store, dec!(10)).await;

    let err = store.insert_customer(&draft("ann@x.com"), Utc::now()).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateEmail(_)));

    let clash = AccountDraft::new("Ann Lee", dec!(1), AccountType::Current, customer_id)
        .unwrap()
        .into_account("ACC000001".to_string(), Utc::now());
    assert!(store.insert_account(&clash).await.unwrap().is_none());

    let orphan = AccountDraft::new("Ghost", dec!(1), AccountType::Current, 4242)
        .unwrap()
        .into_account("ACC000002".to_string(), Utc::now());
    assert!(matches!(
        store.insert_account(&orphan).await,
        Err(StoreError::MissingCustomer(4242))
    ));
}

#[tokio::test]
#[ignore]
async fn test_conditional_debit() {
    let store = PgStore::new(setup_test_db().await);
    customer_with_account(&store, dec!(100.00)).await;
    let amount = |v| Amount::new(v).unwrap();

    let outcome = store.debit_account("ACC000001", amount(dec!(150)), Utc::now()).await.unwrap();
    assert!(matches!(outcome, Debit::Insufficient(ref a) if a.account_balance.value() == dec!(100)));

    let credited = store
        .credit_account("ACC000001", amount(dec!(50)), Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(credited.account_balance.to_string(), "150.00");

    let outcome = store.debit_account("ACC000001", amount(dec!(150)), Utc::now()).await.unwrap();
    assert!(matches!(outcome, Debit::Applied(ref a) if a.account_balance.value() == dec!(0)));

    let outcome = store.debit_account("ACC404404", amount(dec!(1)), Utc::now()).await.unwrap();
    assert!(matches!(outcome, Debit::NotFound));
}

#[tokio::test]
#[ignore]
async fn test_concurrent_withdrawals_never_overdraw() {
    let store = Arc::new(PgStore::new(setup_test_db().await));
    customer_with_account(&store, dec!(100)).await;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store
                .debit_account("ACC000001", Amount::new(dec!(30)).unwrap(), Utc::now())
                .await
                .unwrap()
        }));
    }

    let mut applied = 0;
    for task in tasks {
        if matches!(task.await.unwrap(), Debit::Applied(_)) {
            applied += 1;
        }
    }

    assert_eq!(applied, 3);
    let account = store.find_account("ACC000001").await.unwrap().unwrap();
    assert_eq!(account.account_balance.value(), dec!(10));
}

#[tokio::test]
#[ignore]
async fn test_customer_delete_restricted_by_accounts() {
    let store = PgStore::new(setup_test_db().await);
    let customer_id = customer_with_account(&store, dec!(1)).await;

    assert!(matches!(
        store.delete_customer(customer_id).await,
        Err(StoreError::CustomerInUse(_))
    ));

    assert!(store.delete_account("ACC000001").await.unwrap());
    assert!(store.delete_customer(customer_id).await.unwrap());
    assert!(!store.delete_customer(customer_id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_legacy_saving_literal_is_read_as_savings() {
    let pool = setup_test_db().await;
    let store = PgStore::new(pool.clone());
    let customer = store.insert_customer(&draft("ann@x.com"), Utc::now()).await.unwrap();

    sqlx::query(
        r#"
        INSERT INTO accounts (account_no, account_holder_name, account_balance, account_type, customer_id)
        VALUES ('ACC000001', 'Ann Lee', 12.50, 'SAVING', $1)
        "#,
    )
    .bind(customer.customer_id)
    .execute(&pool)
    .await
    .unwrap();

    let account = store.find_account("ACC000001").await.unwrap().unwrap();
    assert_eq!(account.account_type, AccountType::Savings);

    let savings = store
        .list_accounts(AccountFilter::Type(AccountType::Savings))
        .await
        .unwrap();
    assert_eq!(savings.len(), 1);
    assert_eq!(store.count_accounts(Some(AccountType::Savings)).await.unwrap(), 1);
    assert_eq!(store.total_balance(Some(AccountType::Savings)).await.unwrap(), dec!(12.50));

    let with_accounts = store.list_customers(CustomerFilter::WithAccounts).await.unwrap();
    assert_eq!(with_accounts.len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_seeding_against_postgres() {
    let pool = setup_test_db().await;
    let state = AppState::new(Arc::new(PgStore::new(pool)), "pg-secret", 1);

    db::seed_users(&state.auth).await.unwrap();
    assert!(db::seed_sample_data(&state.customers, &state.accounts).await.unwrap());

    assert_eq!(state.accounts.count().await.unwrap(), 8);
    assert_eq!(state.accounts.total_balance().await.unwrap(), dec!(95451.50));
    assert!(state.auth.login("admin", "password").await.is_ok());
}
