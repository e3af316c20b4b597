//! Input validation module

use crate::models::{ApplicationType, CreateApplication, ReturnRequest, WorkflowActionRequest};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' is too long (max {max} characters)")]
    TooLong { field: String, max: usize },

    #[error("Field '{field}' is invalid")]
    Invalid { field: String },
}

const MAX_NAME_LEN: usize = 255;
const MAX_ADDRESS_LEN: usize = 500;
const MAX_REMARKS_LEN: usize = 2000;

fn required(field: &str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ValidationError::Required {
            field: field.to_string(),
        }),
    }
}

fn max_len(field: &str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    if value.map(str::len).unwrap_or(0) > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validate a new application. Individual applications need the applicant's
/// name; company applications need the company name and its representative.
pub fn validate_create_application(input: &CreateApplication) -> Result<(), ValidationError> {
    if input.transaction_type.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "transaction_type".to_string(),
        });
    }
    max_len("transaction_type", Some(&input.transaction_type), MAX_NAME_LEN)?;
    max_len("classification", input.classification.as_deref(), MAX_NAME_LEN)?;

    match input.application_type {
        ApplicationType::Individual => {
            required("applicant_lastname", input.applicant_lastname.as_deref())?;
            required("applicant_firstname", input.applicant_firstname.as_deref())?;
        }
        ApplicationType::Company => {
            required("company_name", input.company_name.as_deref())?;
            required(
                "authorized_representative",
                input.authorized_representative.as_deref(),
            )?;
        }
    }

    max_len("applicant_lastname", input.applicant_lastname.as_deref(), MAX_NAME_LEN)?;
    max_len("applicant_firstname", input.applicant_firstname.as_deref(), MAX_NAME_LEN)?;
    max_len("applicant_middlename", input.applicant_middlename.as_deref(), MAX_NAME_LEN)?;
    max_len("company_name", input.company_name.as_deref(), MAX_NAME_LEN)?;
    max_len(
        "authorized_representative",
        input.authorized_representative.as_deref(),
        MAX_NAME_LEN,
    )?;
    max_len(
        "applicant_complete_address",
        input.applicant_complete_address.as_deref(),
        MAX_ADDRESS_LEN,
    )?;
    max_len("company_address", input.company_address.as_deref(), MAX_ADDRESS_LEN)?;

    for (field, value) in [
        ("applicant_province_c", input.applicant_province_c.as_deref()),
        ("applicant_city_mun_c", input.applicant_city_mun_c.as_deref()),
        ("company_c_province", input.company_c_province.as_deref()),
    ] {
        if let Some(code) = value {
            if !code.trim().is_empty() && !is_valid_geo_code(code) {
                return Err(ValidationError::Invalid {
                    field: field.to_string(),
                });
            }
        }
    }

    Ok(())
}

/// A workflow action body must name the application it acts on.
pub fn validate_workflow_action(input: &WorkflowActionRequest) -> Result<i64, ValidationError> {
    input.id.ok_or(ValidationError::Required {
        field: "id".to_string(),
    })
}

/// A return must name the application, the destination role, and carry
/// non-empty remarks for the compliance trail.
pub fn validate_return_request(input: &ReturnRequest) -> Result<(i64, i32, String), ValidationError> {
    let id = input.id.ok_or(ValidationError::Required {
        field: "id".to_string(),
    })?;
    let return_to = input.return_to.ok_or(ValidationError::Required {
        field: "returnTo".to_string(),
    })?;
    let remarks = input
        .remarks
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or(ValidationError::Required {
            field: "remarks".to_string(),
        })?;
    if remarks.len() > MAX_REMARKS_LEN {
        return Err(ValidationError::TooLong {
            field: "remarks".to_string(),
            max: MAX_REMARKS_LEN,
        });
    }
    Ok((id, return_to, remarks.to_string()))
}

/// PSGC-style numeric geographic code, at most 10 digits.
fn is_valid_geo_code(code: &str) -> bool {
    let trimmed = code.trim();
    !trimmed.is_empty() && trimmed.len() <= 10 && trimmed.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn individual() -> CreateApplication {
        CreateApplication {
            application_type: ApplicationType::Individual,
            transaction_type: "New".to_string(),
            classification: None,
            applicant_lastname: Some("Dela Cruz".to_string()),
            applicant_firstname: Some("Juan".to_string()),
            applicant_middlename: None,
            applicant_province_c: Some("34".to_string()),
            applicant_city_mun_c: Some("3406".to_string()),
            applicant_complete_address: Some("Brgy. Poblacion, Santa Cruz".to_string()),
            company_name: None,
            company_address: None,
            authorized_representative: None,
            company_c_province: None,
        }
    }

    fn company() -> CreateApplication {
        CreateApplication {
            application_type: ApplicationType::Company,
            transaction_type: "New".to_string(),
            classification: Some("Private".to_string()),
            applicant_lastname: None,
            applicant_firstname: None,
            applicant_middlename: None,
            applicant_province_c: None,
            applicant_city_mun_c: None,
            applicant_complete_address: None,
            company_name: Some("Laguna Timber Corp".to_string()),
            company_address: Some("Calamba City".to_string()),
            authorized_representative: Some("Maria Santos".to_string()),
            company_c_province: Some("34".to_string()),
        }
    }

    #[test]
    fn test_valid_individual_application() {
        assert!(validate_create_application(&individual()).is_ok());
    }

    #[test]
    fn test_valid_company_application() {
        assert!(validate_create_application(&company()).is_ok());
    }

    #[test]
    fn test_individual_requires_name() {
        let mut input = individual();
        input.applicant_lastname = Some("   ".to_string());
        assert!(matches!(
            validate_create_application(&input),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_company_requires_representative() {
        let mut input = company();
        input.authorized_representative = None;
        assert!(matches!(
            validate_create_application(&input),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_transaction_type_required() {
        let mut input = individual();
        input.transaction_type = "".to_string();
        assert!(matches!(
            validate_create_application(&input),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_rejects_non_numeric_province_code() {
        let mut input = individual();
        input.applicant_province_c = Some("Laguna".to_string());
        assert!(matches!(
            validate_create_application(&input),
            Err(ValidationError::Invalid { .. })
        ));
    }

    #[test]
    fn test_rejects_overlong_name() {
        let mut input = individual();
        input.applicant_lastname = Some("x".repeat(300));
        assert!(matches!(
            validate_create_application(&input),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_classification_optional_but_capped() {
        let mut input = individual();
        input.classification = Some("Private".to_string());
        assert!(validate_create_application(&input).is_ok());

        input.classification = Some("x".repeat(300));
        assert!(matches!(
            validate_create_application(&input),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_workflow_action_requires_id() {
        assert!(validate_workflow_action(&WorkflowActionRequest { id: None }).is_err());
        assert_eq!(
            validate_workflow_action(&WorkflowActionRequest { id: Some(42) }).unwrap(),
            42
        );
    }

    #[test]
    fn test_return_request_complete() {
        let input = ReturnRequest {
            id: Some(42),
            return_to: Some(8),
            remarks: Some("Incomplete requirements".to_string()),
        };
        let (id, return_to, remarks) = validate_return_request(&input).unwrap();
        assert_eq!(id, 42);
        assert_eq!(return_to, 8);
        assert_eq!(remarks, "Incomplete requirements");
    }

    #[test]
    fn test_return_request_requires_remarks() {
        let input = ReturnRequest {
            id: Some(42),
            return_to: Some(8),
            remarks: Some("   ".to_string()),
        };
        assert!(matches!(
            validate_return_request(&input),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_return_request_requires_destination() {
        let input = ReturnRequest {
            id: Some(42),
            return_to: None,
            remarks: Some("remarks".to_string()),
        };
        assert!(matches!(
            validate_return_request(&input),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_geo_code_validation() {
        assert!(is_valid_geo_code("34"));
        assert!(is_valid_geo_code(" 3406 "));
        assert!(!is_valid_geo_code("34A"));
        assert!(!is_valid_geo_code(""));
        assert!(!is_valid_geo_code("12345678901"));
    }
}
