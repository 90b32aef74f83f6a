//! Operation Context
//!
//! Contains metadata about the current operation for logging and tracing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for an operation, attached to every mutating call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationContext {
    /// Authenticated administrator, taken from the bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl OperationContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self {
            username: None,
            correlation_id: None,
        }
    }

    /// Context for start-up work that runs without a request
    pub fn system() -> Self {
        Self::new().with_username("system")
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Generate a new correlation ID if not present
    pub fn ensure_correlation_id(&mut self) -> Uuid {
        *self.correlation_id.get_or_insert_with(Uuid::new_v4)
    }

    /// Name used in log lines
    pub fn actor(&self) -> &str {
        self.username.as_deref().unwrap_or("anonymous")
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let correlation_id = Uuid::new_v4();

        let context = OperationContext::new()
            .with_username("admin")
            .with_correlation_id(correlation_id);

        assert_eq!(context.username.as_deref(), Some("admin"));
        assert_eq!(context.correlation_id, Some(correlation_id));
        assert_eq!(context.actor(), "admin");
    }

    #[test]
    fn test_ensure_correlation_id() {
        let mut context = OperationContext::new();
        assert!(context.correlation_id.is_none());

        let id = context.ensure_correlation_id();
        assert_eq!(context.correlation_id, Some(id));

        // Calling again should return the same ID
        assert_eq!(context.ensure_correlation_id(), id);
    }

    #[test]
    fn test_anonymous_actor() {
        assert_eq!(OperationContext::new().actor(), "anonymous");
        assert_eq!(OperationContext::system().actor(), "system");
    }
}
