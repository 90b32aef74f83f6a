//! Customer record
//!
//! A customer owns zero or more accounts. Ownership is one-directional:
//! accounts hold the customer id, and a customer's accounts are found by
//! query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DomainError;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const EMAIL_MAX: usize = 150;
const MOBILE_MAX: usize = 20;
const ADDRESS_MIN: usize = 10;
const ADDRESS_MAX: usize = 500;

/// Stored customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub customer_id: i64,
    pub name: String,
    pub email: String,
    pub mobile_number: String,
    pub address: String,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

/// Mutable customer fields, as supplied on create and update.
///
/// Any `customerId` in the payload is ignored: the identifier is assigned
/// by the store on insert and never overwritten. Absent fields default to
/// empty and are reported by `validate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerDraft {
    pub name: String,
    pub email: String,
    pub mobile_number: String,
    pub address: String,
}

impl CustomerDraft {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        mobile_number: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            mobile_number: mobile_number.into(),
            address: address.into(),
        }
    }

    /// Check field constraints and return the draft with surrounding
    /// whitespace trimmed. Email comparison stays case-sensitive.
    pub fn validate(self) -> Result<Self, DomainError> {
        let draft = Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            mobile_number: self.mobile_number.trim().to_string(),
            address: self.address.trim().to_string(),
        };

        check_length("Name", &draft.name, NAME_MIN, NAME_MAX)?;
        check_length("Email", &draft.email, 1, EMAIL_MAX)?;
        check_length("Mobile number", &draft.mobile_number, 1, MOBILE_MAX)?;
        check_length("Address", &draft.address, ADDRESS_MIN, ADDRESS_MAX)?;

        if !is_plausible_email(&draft.email) {
            return Err(DomainError::validation(format!(
                "Please provide a valid email address: {}",
                draft.email
            )));
        }

        Ok(draft)
    }
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), DomainError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(DomainError::validation(format!("{} is required", field)));
    }
    if len < min || len > max {
        return Err(DomainError::validation(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann() -> CustomerDraft {
        CustomerDraft::new("Ann Lee", "ann@x.com", "+1-555", "10 Main St, City, ST 00000")
    }

    #[test]
    fn test_valid_draft_passes() {
        assert_eq!(ann().validate().unwrap(), ann());
    }

    #[test]
    fn test_fields_are_trimmed() {
        let mut draft = ann();
        draft.name = "  Ann Lee ".to_string();

        assert_eq!(draft.validate().unwrap().name, "Ann Lee");
    }

    #[test]
    fn test_name_bounds() {
        let mut draft = ann();
        draft.name = "A".to_string();
        assert!(draft.clone().validate().is_err());

        draft.name = "A".repeat(101);
        assert!(draft.clone().validate().is_err());

        draft.name = "A".repeat(100);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_address_bounds() {
        let mut draft = ann();
        draft.address = "short".to_string();
        assert!(draft.clone().validate().is_err());

        draft.address = "x".repeat(501);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_empty_mobile_is_required() {
        let mut draft = ann();
        draft.mobile_number = "   ".to_string();

        let err = draft.validate().unwrap_err();
        assert_eq!(err, DomainError::validation("Mobile number is required"));
    }

    #[test]
    fn test_email_shape() {
        for bad in ["ann.x.com", "@x.com", "ann@", "ann @x.com", "a@b@c"] {
            let mut draft = ann();
            draft.email = bad.to_string();
            assert!(draft.validate().is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_draft_ignores_customer_id_in_payload() {
        let json = r#"{
            "customerId": 99,
            "name": "Ann Lee",
            "email": "ann@x.com",
            "mobileNumber": "+1-555",
            "address": "10 Main St, City, ST 00000"
        }"#;

        let draft: CustomerDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft, ann());
    }
}
