//! Workflow fault taxonomy
//!
//! Every fault is recovered at the operation boundary: the transaction is
//! rolled back and the fault is converted into a stable machine code plus a
//! human message for the API response. Nothing here is fatal; all faults
//! are safe to retry once the underlying cause is fixed.

use crate::workflow::{Operation, Role};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Application {application_id} not found")]
    NotFound { application_id: i64 },

    #[error("Routing not defined for office {office_id}")]
    RoutingNotDefined { office_id: i32 },

    #[error("No eligible receiver with role {role} in office {office_id}")]
    NoEligibleReceiver { office_id: i32, role: Role },

    #[error("Invalid return destination: role {role_id}")]
    InvalidReturnDestination { role_id: i32 },

    #[error("Permit number already generated for application {application_id}")]
    AlreadyIssued { application_id: i64 },

    #[error("Cannot {operation} as {role} while the application is '{status_label}'")]
    InvalidTransition {
        status: i32,
        status_label: &'static str,
        role: Role,
        operation: Operation,
    },

    #[error("User role {role_id} is not a reviewing role")]
    UnknownRole { role_id: i32 },

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl WorkflowError {
    /// Stable machine-readable code, independent of the display message.
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::NotFound { .. } => "not_found",
            WorkflowError::RoutingNotDefined { .. } => "routing_not_defined",
            WorkflowError::NoEligibleReceiver { .. } => "no_eligible_receiver",
            WorkflowError::InvalidReturnDestination { .. } => "invalid_return_destination",
            WorkflowError::AlreadyIssued { .. } => "already_issued",
            WorkflowError::InvalidTransition { .. } => "invalid_transition",
            WorkflowError::UnknownRole { .. } => "unknown_role",
            WorkflowError::Database(_) => "database_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            WorkflowError::NotFound { application_id: 1 }.code(),
            "not_found"
        );
        assert_eq!(
            WorkflowError::RoutingNotDefined { office_id: 99 }.code(),
            "routing_not_defined"
        );
        assert_eq!(
            WorkflowError::AlreadyIssued { application_id: 1 }.code(),
            "already_issued"
        );
    }

    #[test]
    fn test_messages_do_not_leak_sql() {
        let err = WorkflowError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.to_string(), "Database error");
    }
}
