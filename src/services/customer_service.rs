//! Customer Service
//!
//! Record manager for customers: field validation, email uniqueness,
//! timestamps and the "no delete while accounts exist" rule.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::domain::{Customer, CustomerDraft, DomainError, OperationContext};
use crate::error::AppResult;
use crate::store::{AccountFilter, CustomerFilter, Store, StoreError};

#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn Store>,
}

impl CustomerService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a customer; the id is assigned by the store
    pub async fn create(
        &self,
        draft: CustomerDraft,
        context: &OperationContext,
    ) -> AppResult<Customer> {
        let draft = draft.validate()?;

        if self.store.email_taken(&draft.email, None).await? {
            return Err(DomainError::duplicate_email(&draft.email).into());
        }

        // A concurrent insert of the same email still fails on the unique index
        let customer = self
            .store
            .insert_customer(&draft, Utc::now())
            .await
            .map_err(duplicate_email_as_validation)?;

        tracing::info!(
            customer_id = customer.customer_id,
            actor = context.actor(),
            "Customer created"
        );

        Ok(customer)
    }

    pub async fn get_by_id(&self, customer_id: i64) -> AppResult<Customer> {
        self.store
            .find_customer(customer_id)
            .await?
            .ok_or_else(|| DomainError::customer_not_found(customer_id).into())
    }

    pub async fn get_by_email(&self, email: &str) -> AppResult<Customer> {
        self.store
            .find_customer_by_email(email)
            .await?
            .ok_or_else(|| DomainError::customer_not_found(email).into())
    }

    /// Whether a customer with this id exists; never fails for absent ids
    pub async fn exists(&self, customer_id: i64) -> AppResult<bool> {
        Ok(self.store.find_customer(customer_id).await?.is_some())
    }

    /// Overwrite name, email, mobile number and address. The id is taken
    /// from the caller's path, never from the payload.
    pub async fn update(
        &self,
        customer_id: i64,
        draft: CustomerDraft,
        context: &OperationContext,
    ) -> AppResult<Customer> {
        self.get_by_id(customer_id).await?;

        let draft = draft.validate()?;

        if self.store.email_taken(&draft.email, Some(customer_id)).await? {
            return Err(DomainError::duplicate_email(&draft.email).into());
        }

        let customer = self
            .store
            .update_customer(customer_id, &draft, Utc::now())
            .await
            .map_err(duplicate_email_as_validation)?
            .ok_or_else(|| DomainError::customer_not_found(customer_id))?;

        tracing::info!(customer_id, actor = context.actor(), "Customer updated");

        Ok(customer)
    }

    /// Delete a customer that owns no accounts
    pub async fn delete(&self, customer_id: i64, context: &OperationContext) -> AppResult<()> {
        self.get_by_id(customer_id).await?;

        let owned = self
            .store
            .list_accounts(AccountFilter::Customer(customer_id))
            .await?;
        if !owned.is_empty() {
            return Err(owns_accounts(customer_id).into());
        }

        let deleted = match self.store.delete_customer(customer_id).await {
            Ok(deleted) => deleted,
            // An account was opened between the check and the delete
            Err(StoreError::CustomerInUse(_)) => return Err(owns_accounts(customer_id).into()),
            Err(e) => return Err(e.into()),
        };
        if !deleted {
            return Err(DomainError::customer_not_found(customer_id).into());
        }

        tracing::info!(customer_id, actor = context.actor(), "Customer deleted");

        Ok(())
    }

    /// All customers, newest first
    pub async fn list(&self) -> AppResult<Vec<Customer>> {
        Ok(self.store.list_customers(CustomerFilter::All).await?)
    }

    /// Customers whose name contains `pattern`, case-insensitive
    pub async fn search(&self, pattern: &str) -> AppResult<Vec<Customer>> {
        Ok(self
            .store
            .list_customers(CustomerFilter::NameContains(pattern.to_string()))
            .await?)
    }

    pub async fn list_with_accounts(&self) -> AppResult<Vec<Customer>> {
        Ok(self.store.list_customers(CustomerFilter::WithAccounts).await?)
    }

    pub async fn list_without_accounts(&self) -> AppResult<Vec<Customer>> {
        Ok(self.store.list_customers(CustomerFilter::WithoutAccounts).await?)
    }

    /// Customers created within the last `days` days
    pub async fn list_recent(&self, days: i64) -> AppResult<Vec<Customer>> {
        let cutoff = Utc::now() - recent_window(days)?;
        Ok(self
            .store
            .list_customers(CustomerFilter::CreatedAfter(cutoff))
            .await?)
    }

    pub async fn count(&self) -> AppResult<i64> {
        Ok(self.store.count_customers().await?)
    }
}

fn owns_accounts(customer_id: i64) -> DomainError {
    DomainError::Conflict(format!(
        "Cannot delete customer {} with existing accounts",
        customer_id
    ))
}

fn duplicate_email_as_validation(err: StoreError) -> crate::error::AppError {
    match err {
        StoreError::DuplicateEmail(email) => DomainError::duplicate_email(&email).into(),
        other => other.into(),
    }
}

/// Look-back window for "recent" listings
pub(crate) fn recent_window(days: i64) -> Result<Duration, DomainError> {
    if !(0..=36_500).contains(&days) {
        return Err(DomainError::validation(format!(
            "days must be between 0 and 36500 (got {})",
            days
        )));
    }
    Ok(Duration::days(days))
}
