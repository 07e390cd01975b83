//! Patient record domain model
//!
//! A deliberately small slice of the clinical schema: enough to exercise
//! tenant scoping and field encryption end to end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Patient record entity
///
/// `patient_name` and `registration_no` are encrypted at the repository
/// boundary; in memory they are always plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: i64,
    /// Owning institution; stamped from the caller's context when absent
    pub tenant_code: Option<String>,
    pub patient_name: String,
    pub registration_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a patient record
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRecordInput {
    #[validate(length(min = 1, max = 255))]
    pub patient_name: String,
    #[validate(length(min = 1, max = 64))]
    pub registration_no: String,
    #[validate(custom(function = "validate_tenant_code_opt"))]
    pub tenant_code: Option<String>,
    #[validate(length(max = 4000))]
    pub note: Option<String>,
}

/// Input for updating a patient record
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRecordInput {
    #[validate(length(min = 1, max = 255))]
    pub patient_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub registration_no: Option<String>,
    #[validate(length(max = 4000))]
    pub note: Option<String>,
}

/// Validate institution code format (uppercase alphanumeric)
fn validate_tenant_code_opt(code: &str) -> Result<(), validator::ValidationError> {
    if TENANT_CODE_REGEX.is_match(code) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_tenant_code"))
    }
}

// Regex for institution code validation
lazy_static::lazy_static! {
    pub static ref TENANT_CODE_REGEX: regex::Regex = regex::Regex::new(r"^[A-Z0-9]{1,12}$").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_code_regex() {
        assert!(TENANT_CODE_REGEX.is_match("H1"));
        assert!(TENANT_CODE_REGEX.is_match("TOKYO03"));
        assert!(!TENANT_CODE_REGEX.is_match("h1"));
        assert!(!TENANT_CODE_REGEX.is_match("H 1"));
        assert!(!TENANT_CODE_REGEX.is_match(""));
    }

    #[test]
    fn test_create_record_input_validation() {
        let input = CreateRecordInput {
            patient_name: "Yamada Hanako".to_string(),
            registration_no: "R-2024-0042".to_string(),
            tenant_code: Some("h1".to_string()),
            note: None,
        };
        assert!(input.validate().is_err());

        let valid_input = CreateRecordInput {
            patient_name: "Yamada Hanako".to_string(),
            registration_no: "R-2024-0042".to_string(),
            tenant_code: Some("H1".to_string()),
            note: Some("first visit".to_string()),
        };
        assert!(valid_input.validate().is_ok());
    }

    #[test]
    fn test_update_record_input_all_optional() {
        let input = UpdateRecordInput {
            patient_name: None,
            registration_no: None,
            note: None,
        };
        assert!(input.validate().is_ok());
    }
}
