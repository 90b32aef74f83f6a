//! Database module
//!
//! Connection checks, migrations and start-up data.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::user::DEFAULT_ROLE;
use crate::domain::{AccountType, CustomerDraft, OperationContext};
use crate::error::AppResult;
use crate::services::{AccountService, AuthService, CustomerService};

/// Tables the store expects
const REQUIRED_TABLES: [&str; 3] = ["users", "customers", "accounts"];

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the SQL files in migrations/
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}

// =========================================================================
// Start-up data
// =========================================================================

const DEFAULT_USERS: [(&str, &str); 2] = [("admin", "password"), ("manager", "manager123")];

/// name, email, mobile number, address
const SAMPLE_CUSTOMERS: [(&str, &str, &str, &str); 6] = [
    (
        "John Smith",
        "john.smith@email.com",
        "+1-555-0123",
        "123 Main Street, Springfield, IL 62701, USA",
    ),
    (
        "Sarah Johnson",
        "sarah.johnson@email.com",
        "+1-555-0124",
        "456 Oak Avenue, Madison, WI 53703, USA",
    ),
    (
        "Michael Brown",
        "michael.brown@email.com",
        "+1-555-0125",
        "789 Pine Road, Austin, TX 78701, USA",
    ),
    (
        "Emily Davis",
        "emily.davis@email.com",
        "+1-555-0126",
        "321 Elm Street, Denver, CO 80202, USA",
    ),
    (
        "David Wilson",
        "david.wilson@email.com",
        "+1-555-0127",
        "654 Maple Drive, Seattle, WA 98101, USA",
    ),
    (
        "Lisa Anderson",
        "lisa.anderson@email.com",
        "+1-555-0128",
        "987 Cedar Lane, Miami, FL 33101, USA",
    ),
];

/// Owner index into SAMPLE_CUSTOMERS, balance in cents, type
const SAMPLE_ACCOUNTS: [(usize, i64, AccountType); 8] = [
    (0, 1_500_000, AccountType::Savings),
    (1, 850_000, AccountType::Current),
    (2, 2_500_000, AccountType::Current),
    (3, 1_275_050, AccountType::Savings),
    (4, 550_075, AccountType::Current),
    (0, 320_000, AccountType::Savings),
    (5, 1_800_025, AccountType::Savings),
    (5, 750_000, AccountType::Current),
];

/// Create the default administrators if they are missing
pub async fn seed_users(auth: &AuthService) -> AppResult<()> {
    for (username, password) in DEFAULT_USERS {
        auth.ensure_user(username, password, DEFAULT_ROLE).await?;
    }
    Ok(())
}

/// Insert demo customers and accounts, but only into an empty store.
/// Returns whether anything was inserted.
pub async fn seed_sample_data(
    customers: &CustomerService,
    accounts: &AccountService,
) -> AppResult<bool> {
    if customers.count().await? > 0 || accounts.count().await? > 0 {
        tracing::info!("Existing customer data found, sample data not inserted");
        return Ok(false);
    }

    let context = OperationContext::system();

    let mut created = Vec::with_capacity(SAMPLE_CUSTOMERS.len());
    for (name, email, mobile_number, address) in SAMPLE_CUSTOMERS {
        let draft = CustomerDraft::new(name, email, mobile_number, address);
        created.push(customers.create(draft, &context).await?);
    }

    for (owner, cents, account_type) in SAMPLE_ACCOUNTS {
        let customer = &created[owner];
        accounts
            .create(
                customer.name.clone(),
                Decimal::new(cents, 2),
                account_type,
                customer.customer_id,
                &context,
            )
            .await?;
    }

    tracing::info!(
        customers = SAMPLE_CUSTOMERS.len(),
        accounts = SAMPLE_ACCOUNTS.len(),
        "Sample customers and accounts created"
    );
    Ok(true)
}
