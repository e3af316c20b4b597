//! Workflow action handlers
//!
//! One endpoint per operation: receive, endorse, return, resubmit. The
//! handlers validate the body, hand off to the workflow engine, and map
//! engine faults to HTTP statuses with stable error codes.

use crate::models::*;
use crate::validation::{validate_return_request, validate_workflow_action, ValidationError};
use crate::workflow::{self, Actor, WorkflowError, WorkflowOutcome};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};

use super::AppState;

fn actor_for(user: &User) -> Actor {
    Actor {
        id: user.id,
        office_id: user.office_id,
        role_id: user.role_id,
    }
}

fn outcome_response(outcome: WorkflowOutcome) -> (StatusCode, Json<ApiResponse<WorkflowResponse>>) {
    let response = WorkflowResponse {
        application_id: outcome.application_id,
        current_status: outcome.status.code(),
        status_label: outcome.status.label(),
        message: outcome.action,
        permit_no: outcome.permit_no,
    };
    (StatusCode::OK, Json(ApiResponse::success(response)))
}

fn fault_response(err: WorkflowError) -> (StatusCode, Json<ApiResponse<WorkflowResponse>>) {
    let status = match &err {
        WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
        WorkflowError::InvalidTransition { .. } | WorkflowError::AlreadyIssued { .. } => {
            StatusCode::CONFLICT
        }
        WorkflowError::RoutingNotDefined { .. } | WorkflowError::NoEligibleReceiver { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WorkflowError::InvalidReturnDestination { .. } | WorkflowError::UnknownRole { .. } => {
            StatusCode::BAD_REQUEST
        }
        WorkflowError::Database(e) => {
            tracing::error!("Workflow database error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ApiResponse::fault(err.code(), err.to_string())))
}

fn validation_response(err: ValidationError) -> (StatusCode, Json<ApiResponse<WorkflowResponse>>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::fault("validation_error", err.to_string())),
    )
}

// =============================================================================
// Endpoints
// =============================================================================

/// Mark an application as received at the officer's stage
pub async fn receive_application(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<WorkflowActionRequest>,
) -> impl IntoResponse {
    let id = match validate_workflow_action(&input) {
        Ok(id) => id,
        Err(e) => return validation_response(e),
    };

    match workflow::receive(&state.pool, id, &actor_for(&user)).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => fault_response(e),
    }
}

/// Endorse an application to the next stage
pub async fn endorse_application(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<WorkflowActionRequest>,
) -> impl IntoResponse {
    let id = match validate_workflow_action(&input) {
        Ok(id) => id,
        Err(e) => return validation_response(e),
    };

    match workflow::endorse(&state.pool, id, &actor_for(&user)).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => fault_response(e),
    }
}

/// Return an application to an earlier stage for compliance
pub async fn return_application(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<ReturnRequest>,
) -> impl IntoResponse {
    let (id, return_to, remarks) = match validate_return_request(&input) {
        Ok(parts) => parts,
        Err(e) => return validation_response(e),
    };

    match workflow::return_application(&state.pool, id, &actor_for(&user), return_to, &remarks)
        .await
    {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => fault_response(e),
    }
}

/// Resubmit a returned application for review
pub async fn resubmit_application(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<WorkflowActionRequest>,
) -> impl IntoResponse {
    let id = match validate_workflow_action(&input) {
        Ok(id) => id,
        Err(e) => return validation_response(e),
    };

    match workflow::resubmit(&state.pool, id, &actor_for(&user)).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => fault_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Operation, Role};

    #[test]
    fn test_fault_status_mapping() {
        let (status, _) = fault_response(WorkflowError::NotFound { application_id: 1 });
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = fault_response(WorkflowError::AlreadyIssued { application_id: 1 });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = fault_response(WorkflowError::InvalidTransition {
            status: 1,
            status_label: "Draft",
            role: Role::TechnicalStaff,
            operation: Operation::Endorse,
        });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = fault_response(WorkflowError::RoutingNotDefined { office_id: 99 });
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = fault_response(WorkflowError::InvalidReturnDestination { role_id: 5 });
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_fault_body_carries_code() {
        let (_, Json(body)) = fault_response(WorkflowError::AlreadyIssued { application_id: 7 });
        assert!(!body.success);
        assert_eq!(body.error_code, Some("already_issued"));
    }
}
