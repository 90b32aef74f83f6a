//! API Routes
//!
//! HTTP endpoint definitions.

use std::sync::Arc;

use axum::{
    extract::{Extension, FromRequest, FromRequestParts, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money::format_total;
use crate::domain::{Account, AccountType, Customer, CustomerDraft, DomainError, OperationContext};
use crate::error::{AppError, AppResult};
use crate::services::{AccountService, AuthService, CustomerService};
use crate::store::Store;

use super::middleware::bearer_token;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub customers: CustomerService,
    pub accounts: AccountService,
    pub auth: AuthService,
}

impl AppState {
    /// Wire all services to one store
    pub fn new(
        store: Arc<dyn Store>,
        jwt_secret: impl Into<String>,
        jwt_expiration_hours: i64,
    ) -> Self {
        Self {
            customers: CustomerService::new(store.clone()),
            accounts: AccountService::new(store.clone()),
            auth: AuthService::new(store, jwt_secret, jwt_expiration_hours),
        }
    }
}

/// JSON body extractor whose rejections use the API error format
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections use the API error format
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query-string extractor whose rejections use the API error format
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub username: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub account_holder_name: String,
    pub account_balance: Option<Decimal>,
    /// Normalized case-insensitively; `SAVING` is accepted
    pub account_type: Option<String>,
    pub customer_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct HighBalanceQuery {
    pub min: Decimal,
}

// =========================================================================
// API Router
// =========================================================================

/// Routes that need a bearer token
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Customers
        .route("/customers", get(list_customers).post(create_customer))
        .route("/customers/count", get(count_customers))
        .route("/customers/search", get(search_customers))
        .route("/customers/with-accounts", get(customers_with_accounts))
        .route("/customers/without-accounts", get(customers_without_accounts))
        .route("/customers/recent", get(recent_customers))
        .route("/customers/exists/:id", get(customer_exists))
        .route("/customers/email/:email", get(get_customer_by_email))
        .route(
            "/customers/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        // Accounts
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/count", get(count_accounts))
        .route("/accounts/total-balance", get(total_balance))
        .route("/accounts/high-balance", get(high_balance_accounts))
        .route("/accounts/recent", get(recent_accounts))
        .route("/accounts/customer/:customer_id", get(accounts_by_customer))
        .route("/accounts/type/:account_type", get(accounts_by_type))
        .route("/accounts/type/:account_type/count", get(count_accounts_by_type))
        .route(
            "/accounts/type/:account_type/total-balance",
            get(total_balance_by_type),
        )
        .route("/accounts/:account_no", get(get_account).delete(delete_account))
        .route("/accounts/:account_no/deposit", post(deposit))
        .route("/accounts/:account_no/withdraw", post(withdraw))
}

/// Login and token validation, open to anonymous callers
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/validate", post(validate_token))
}

// =========================================================================
// Auth
// =========================================================================

async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let issued = state.auth.login(&request.username, &request.password).await?;

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer",
        username: issued.username,
        role: issued.role,
        expires_at: issued.expires_at,
    }))
}

async fn validate_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ValidateResponse>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::MissingHeader("Authorization".to_string()))?;
    let claims = state.auth.validate(token)?;

    Ok(Json(ValidateResponse {
        valid: true,
        username: claims.sub,
    }))
}

// =========================================================================
// Customers
// =========================================================================

async fn list_customers(State(state): State<AppState>) -> AppResult<Json<Vec<Customer>>> {
    Ok(Json(state.customers.list().await?))
}

async fn get_customer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Customer>> {
    Ok(Json(state.customers.get_by_id(id).await?))
}

async fn get_customer_by_email(
    State(state): State<AppState>,
    ApiPath(email): ApiPath<String>,
) -> AppResult<Json<Customer>> {
    Ok(Json(state.customers.get_by_email(&email).await?))
}

async fn create_customer(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiJson(draft): ApiJson<CustomerDraft>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    let customer = state.customers.create(draft, &context).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn update_customer(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(draft): ApiJson<CustomerDraft>,
) -> AppResult<Json<Customer>> {
    Ok(Json(state.customers.update(id, draft, &context).await?))
}

async fn delete_customer(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    state.customers.delete(id, &context).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn count_customers(State(state): State<AppState>) -> AppResult<Json<i64>> {
    Ok(Json(state.customers.count().await?))
}

async fn search_customers(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> AppResult<Json<Vec<Customer>>> {
    Ok(Json(state.customers.search(&query.name).await?))
}

async fn customer_exists(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(state.customers.exists(id).await?))
}

async fn customers_with_accounts(State(state): State<AppState>) -> AppResult<Json<Vec<Customer>>> {
    Ok(Json(state.customers.list_with_accounts().await?))
}

async fn customers_without_accounts(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Customer>>> {
    Ok(Json(state.customers.list_without_accounts().await?))
}

async fn recent_customers(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> AppResult<Json<Vec<Customer>>> {
    Ok(Json(state.customers.list_recent(query.days).await?))
}

// =========================================================================
// Accounts
// =========================================================================

async fn list_accounts(State(state): State<AppState>) -> AppResult<Json<Vec<Account>>> {
    Ok(Json(state.accounts.list().await?))
}

async fn get_account(
    State(state): State<AppState>,
    ApiPath(account_no): ApiPath<String>,
) -> AppResult<Json<Account>> {
    Ok(Json(state.accounts.get_by_number(&account_no).await?))
}

async fn create_account(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiJson(request): ApiJson<CreateAccountRequest>,
) -> AppResult<(StatusCode, Json<Account>)> {
    let customer_id = request
        .customer_id
        .ok_or_else(|| DomainError::validation("Customer ID is required"))?;
    let balance = request
        .account_balance
        .ok_or_else(|| DomainError::validation("Account balance is required"))?;
    let account_type = request
        .account_type
        .as_deref()
        .ok_or_else(|| DomainError::validation("Account type is required"))
        .and_then(AccountType::normalize)?;

    let account = state
        .accounts
        .create(
            request.account_holder_name,
            balance,
            account_type,
            customer_id,
            &context,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

async fn delete_account(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(account_no): ApiPath<String>,
) -> AppResult<Json<MessageResponse>> {
    state.accounts.delete(&account_no, &context).await?;
    Ok(Json(MessageResponse {
        message: "Account deleted successfully".to_string(),
    }))
}

async fn deposit(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(account_no): ApiPath<String>,
    ApiJson(request): ApiJson<AmountRequest>,
) -> AppResult<Json<Account>> {
    Ok(Json(
        state
            .accounts
            .deposit(&account_no, request.amount, &context)
            .await?,
    ))
}

async fn withdraw(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(account_no): ApiPath<String>,
    ApiJson(request): ApiJson<AmountRequest>,
) -> AppResult<Json<Account>> {
    let withdrawal = state
        .accounts
        .withdraw(&account_no, request.amount, &context)
        .await?;

    if !withdrawal.succeeded {
        return Err(AppError::WithdrawalRejected { account_no });
    }

    Ok(Json(withdrawal.account))
}

async fn count_accounts(State(state): State<AppState>) -> AppResult<Json<i64>> {
    Ok(Json(state.accounts.count().await?))
}

async fn total_balance(State(state): State<AppState>) -> AppResult<Json<String>> {
    Ok(Json(format_total(state.accounts.total_balance().await?)))
}

async fn accounts_by_customer(
    State(state): State<AppState>,
    ApiPath(customer_id): ApiPath<i64>,
) -> AppResult<Json<Vec<Account>>> {
    Ok(Json(state.accounts.list_by_customer(customer_id).await?))
}

async fn accounts_by_type(
    State(state): State<AppState>,
    ApiPath(account_type): ApiPath<String>,
) -> AppResult<Json<Vec<Account>>> {
    let account_type: AccountType = account_type.parse()?;
    Ok(Json(state.accounts.list_by_type(account_type).await?))
}

async fn count_accounts_by_type(
    State(state): State<AppState>,
    ApiPath(account_type): ApiPath<String>,
) -> AppResult<Json<i64>> {
    let account_type: AccountType = account_type.parse()?;
    Ok(Json(state.accounts.count_by_type(account_type).await?))
}

async fn total_balance_by_type(
    State(state): State<AppState>,
    ApiPath(account_type): ApiPath<String>,
) -> AppResult<Json<String>> {
    let account_type: AccountType = account_type.parse()?;
    Ok(Json(format_total(
        state.accounts.total_balance_by_type(account_type).await?,
    )))
}

async fn high_balance_accounts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HighBalanceQuery>,
) -> AppResult<Json<Vec<Account>>> {
    Ok(Json(state.accounts.list_with_balance_above(query.min).await?))
}

async fn recent_accounts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> AppResult<Json<Vec<Account>>> {
    Ok(Json(state.accounts.list_recent(query.days).await?))
}
