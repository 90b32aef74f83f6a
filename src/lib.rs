//! Banking administration back office
//!
//! Customer and account records behind a token-authenticated JSON API.
//! Re-exports modules for the binary and for integration testing.

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod services;
pub mod store;

pub use api::AppState;
pub use config::Config;
pub use domain::{Account, AccountType, Customer, CustomerDraft, DomainError, OperationContext};
pub use error::{AppError, AppResult, ErrorResponse};

/// Build the application router
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    // Only matched routes are authenticated; unknown paths stay 404
    let protected_routes = api::create_router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        api::middleware::auth_middleware,
    ));

    Router::new()
        // Health check (no auth)
        .route("/health", get(health_check))
        .nest("/api/auth", api::auth_router())
        .nest("/api", protected_routes)
        .layer(middleware::from_fn(api::middleware::logging_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
