//! Workflow engine
//!
//! The per-role `receive`, `endorse`, `return`, and `resubmit` operations.
//! Every operation loads the application under a row lock, validates the
//! actor against an explicit transition table, and commits the application
//! mutation together with its routing-log entry in one transaction. Any
//! fault rolls the whole unit back; no partial state is ever visible.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::Application;
use crate::workflow::error::WorkflowError;
use crate::workflow::permit;
use crate::workflow::routing;
use crate::workflow::status::{label_for, ApplicationStatus};
use crate::workflow::{Actor, Operation, Role};

/// Result of a committed workflow operation.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub application_id: i64,
    pub status: ApplicationStatus,
    pub action: String,
    pub receiver_id: Option<i64>,
    pub permit_no: Option<String>,
}

// =============================================================================
// Transition Table
// =============================================================================

/// Next status for `(current, role, operation)`, or `None` when the
/// combination is not a legal move. Return transitions are validated with
/// `can_return` because their target depends on the destination role.
pub fn transition(current: i32, role: Role, operation: Operation) -> Option<ApplicationStatus> {
    use ApplicationStatus as S;
    let current = S::from_code(current)?;
    match (current, role, operation) {
        (S::ForReviewEvaluation, Role::TechnicalStaff, Operation::Endorse) => {
            Some(S::EndorsedToRpsChief)
        }
        (S::EndorsedToRpsChief, Role::ChiefRps, Operation::Receive) => Some(S::ReceivedByRpsChief),
        (S::ReceivedByRpsChief, Role::ChiefRps, Operation::Endorse) => Some(S::EndorsedToTsdChief),
        (S::EndorsedToTsdChief, Role::ChiefTsd, Operation::Receive) => Some(S::ReceivedByTsdChief),
        (S::ReceivedByTsdChief, Role::ChiefTsd, Operation::Endorse) => Some(S::EndorsedToPenro),
        (S::EndorsedToPenro, Role::Penro, Operation::Receive) => Some(S::ReceivedByPenro),
        (S::ReceivedByPenro, Role::Penro, Operation::Endorse) => Some(S::EndorsedToFus),
        (S::EndorsedToFus, Role::Fus, Operation::Receive) => Some(S::ReceivedByFus),
        (S::ReceivedByFus, Role::Fus, Operation::Endorse) => Some(S::EndorsedToArdTs),
        (S::EndorsedToArdTs, Role::ArdTs, Operation::Receive) => Some(S::ReceivedByArdTs),
        (S::ReceivedByArdTs, Role::ArdTs, Operation::Endorse) => Some(S::EndorsedToRed),
        (S::EndorsedToRed, Role::Red, Operation::Receive) => Some(S::ApprovedByRed),
        (current, _, Operation::Resubmit) if current.is_return() => Some(S::ForReviewEvaluation),
        _ => None,
    }
}

/// A return is legal from any in-review state: not draft, not already
/// returned, not terminal.
pub fn can_return(current: i32) -> bool {
    match ApplicationStatus::from_code(current) {
        Some(ApplicationStatus::Draft) => false,
        Some(s) => !s.is_return() && !s.is_terminal(),
        None => false,
    }
}

// =============================================================================
// Stage Plans
// =============================================================================

/// Where an endorsement's receiver sits. Same-office escalations (technical
/// staff to the section chiefs) stay in the actor's office; cross-office
/// handoffs follow the office routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReceiverAt {
    ActorOffice,
    RoutedOffice,
}

struct ReceivePlan {
    action: &'static str,
    remarks: &'static str,
    flag_column: &'static str,
    date_column: &'static str,
    receiver_role: Role,
}

struct EndorsePlan {
    action: &'static str,
    remarks: &'static str,
    date_column: &'static str,
    receiver_role: Role,
    receiver_at: ReceiverAt,
}

fn receive_plan(role: Role) -> Option<ReceivePlan> {
    let plan = match role {
        Role::ChiefRps => ReceivePlan {
            action: "Received by the Chief RPS",
            remarks: "For review and endorsement to the Chief TSD",
            flag_column: "is_rps_chief_received",
            date_column: "date_received_rps_chief",
            receiver_role: Role::ChiefRps,
        },
        Role::ChiefTsd => ReceivePlan {
            action: "Received by the Chief TSD",
            remarks: "For evaluation of PENRO",
            flag_column: "is_tsd_chief_received",
            date_column: "date_received_tsd_chief",
            receiver_role: Role::ChiefTsd,
        },
        Role::Penro => ReceivePlan {
            action: "Received by the PENRO",
            remarks: "Approve recommendation and sign endorsement to the Regional Office",
            flag_column: "is_penro_chief_received",
            date_column: "date_received_penro_chief",
            receiver_role: Role::Penro,
        },
        Role::Fus => ReceivePlan {
            action: "Received by the LPDD/FUS",
            remarks: "For evaluation of LPDD/FUS",
            flag_column: "is_fus_received",
            date_column: "date_received_fus",
            receiver_role: Role::Fus,
        },
        Role::ArdTs => ReceivePlan {
            action: "Received by the ARD TS",
            remarks: "For approval of the Regional Executive Director",
            flag_column: "is_ardts_received",
            date_column: "date_received_ardts",
            receiver_role: Role::ArdTs,
        },
        Role::Red => ReceivePlan {
            action: "Received and approved by the Regional Executive Director",
            remarks: "", // replaced by the generated permit number
            flag_column: "is_red_received",
            date_column: "date_received_red",
            receiver_role: Role::Red,
        },
        _ => return None,
    };
    Some(plan)
}

fn endorse_plan(role: Role) -> Option<EndorsePlan> {
    let plan = match role {
        Role::TechnicalStaff => EndorsePlan {
            action: "Endorsed to RPS Chief",
            remarks: "Waiting to be received by the Chief RPS",
            date_column: "date_endorsed_rps_chief",
            receiver_role: Role::ChiefRps,
            receiver_at: ReceiverAt::ActorOffice,
        },
        Role::ChiefRps => EndorsePlan {
            action: "Endorsed to Chief TSD",
            remarks: "Waiting to be received by the Chief TSD",
            date_column: "date_endorsed_tsd_chief",
            receiver_role: Role::ChiefTsd,
            receiver_at: ReceiverAt::ActorOffice,
        },
        Role::ChiefTsd => EndorsePlan {
            action: "Endorsed to PENRO Chief",
            remarks: "Waiting to be received by PENRO",
            date_column: "date_endorsed_penro",
            receiver_role: Role::Penro,
            receiver_at: ReceiverAt::RoutedOffice,
        },
        Role::Penro => EndorsePlan {
            action: "Endorsed to LPDD/FUS",
            remarks: "Waiting to be received by LPDD/FUS",
            date_column: "date_endorsed_fus",
            receiver_role: Role::Fus,
            receiver_at: ReceiverAt::RoutedOffice,
        },
        Role::Fus => EndorsePlan {
            action: "Endorsed to Assistant Regional Director for Technical Services",
            remarks: "Waiting to be received by the Assistant Regional Director for Technical Services",
            date_column: "date_endorsed_ardts",
            receiver_role: Role::ArdTs,
            receiver_at: ReceiverAt::RoutedOffice,
        },
        Role::ArdTs => EndorsePlan {
            action: "Endorsed to Regional Executive Director",
            remarks: "Waiting to be approved by the Regional Executive Director",
            date_column: "date_endorsed_red",
            receiver_role: Role::Red,
            receiver_at: ReceiverAt::RoutedOffice,
        },
        _ => return None,
    };
    Some(plan)
}

// =============================================================================
// Operations
// =============================================================================

/// Mark the application as received by the actor's stage.
///
/// The Regional Executive Director's receive is the terminal approval: it
/// additionally claims a permit number, guarded against re-issuance.
pub async fn receive(
    pool: &PgPool,
    application_id: i64,
    actor: &Actor,
) -> Result<WorkflowOutcome, WorkflowError> {
    let role = resolve_role(actor)?;
    let mut tx = pool.begin().await?;
    let app = lock_application(&mut tx, application_id).await?;

    // Idempotency guard ahead of the transition check so a repeated final
    // approval reports the real cause.
    if role == Role::Red {
        check_not_issued(application_id, app.permit_no.as_deref())?;
    }

    let plan = receive_plan(role)
        .ok_or_else(|| invalid_transition(app.application_status, role, Operation::Receive))?;
    let next = transition(app.application_status, role, Operation::Receive)
        .ok_or_else(|| invalid_transition(app.application_status, role, Operation::Receive))?;

    let permit_no = if next == ApplicationStatus::ApprovedByRed {
        let issued = permit::issue_permit_no(
            &mut tx,
            Utc::now().date_naive(),
            app.permit_province_code(),
        )
        .await?;
        Some(issued)
    } else {
        None
    };

    let receiver_id = find_user(&mut tx, actor.office_id, plan.receiver_role).await?;

    // Column names come from the static stage plan, never from input.
    let update = format!(
        "UPDATE applications SET application_status = $1, {} = TRUE, {} = NOW(), \
         permit_no = COALESCE($2, permit_no), updated_at = NOW() WHERE id = $3",
        plan.flag_column, plan.date_column,
    );
    sqlx::query(&update)
        .bind(next.code())
        .bind(&permit_no)
        .bind(application_id)
        .execute(&mut *tx)
        .await?;

    let remarks = match &permit_no {
        Some(no) => format!("Permit No generated: {}", no),
        None => plan.remarks.to_string(),
    };
    let order = next_route_order(&mut tx, application_id).await?;
    append_log(
        &mut tx,
        application_id,
        actor.id,
        Some(receiver_id),
        plan.action,
        Some(&remarks),
        None,
        true,
        order,
    )
    .await?;

    tx.commit().await?;
    tracing::info!(
        application_id,
        status = next.code(),
        role = %role,
        "application received"
    );

    Ok(WorkflowOutcome {
        application_id,
        status: next,
        action: plan.action.to_string(),
        receiver_id: Some(receiver_id),
        permit_no,
    })
}

/// Advance the application to the next stage and hand it to the receiving
/// user, resolving the target office through the routing table.
pub async fn endorse(
    pool: &PgPool,
    application_id: i64,
    actor: &Actor,
) -> Result<WorkflowOutcome, WorkflowError> {
    let role = resolve_role(actor)?;
    let mut tx = pool.begin().await?;
    let app = lock_application(&mut tx, application_id).await?;

    let plan = endorse_plan(role)
        .ok_or_else(|| invalid_transition(app.application_status, role, Operation::Endorse))?;
    let next = transition(app.application_status, role, Operation::Endorse)
        .ok_or_else(|| invalid_transition(app.application_status, role, Operation::Endorse))?;

    // Fail fast on an unmapped office before any mutation.
    let routed_office = routing::next_office(actor.office_id)?;
    let receiver_office = match plan.receiver_at {
        ReceiverAt::ActorOffice => actor.office_id,
        ReceiverAt::RoutedOffice => routed_office,
    };
    let receiver_id = find_user(&mut tx, receiver_office, plan.receiver_role).await?;

    let update = format!(
        "UPDATE applications SET application_status = $1, {} = NOW(), updated_at = NOW() \
         WHERE id = $2",
        plan.date_column,
    );
    sqlx::query(&update)
        .bind(next.code())
        .bind(application_id)
        .execute(&mut *tx)
        .await?;

    let order = next_route_order(&mut tx, application_id).await?;
    append_log(
        &mut tx,
        application_id,
        actor.id,
        Some(receiver_id),
        plan.action,
        Some(plan.remarks),
        None,
        false,
        order,
    )
    .await?;

    tx.commit().await?;
    tracing::info!(
        application_id,
        status = next.code(),
        role = %role,
        receiver_office,
        "application endorsed"
    );

    Ok(WorkflowOutcome {
        application_id,
        status: next,
        action: plan.action.to_string(),
        receiver_id: Some(receiver_id),
        permit_no: None,
    })
}

/// Send the application back to an earlier stage for compliance.
///
/// Return entries are out-of-band: they carry `route_order = 0` and do not
/// advance the forward sequence.
pub async fn return_application(
    pool: &PgPool,
    application_id: i64,
    actor: &Actor,
    return_to: i32,
    remarks: &str,
) -> Result<WorkflowOutcome, WorkflowError> {
    let role = resolve_role(actor)?;
    let destination = Role::from_id(return_to)
        .ok_or(WorkflowError::InvalidReturnDestination { role_id: return_to })?;
    let status = routing::return_status(destination);

    let mut tx = pool.begin().await?;
    let app = lock_application(&mut tx, application_id).await?;
    if !can_return(app.application_status) {
        return Err(invalid_transition(
            app.application_status,
            role,
            Operation::Return,
        ));
    }

    sqlx::query(
        "UPDATE applications SET application_status = $1, return_reason = $2, \
         date_returned = NOW(), updated_at = NOW() WHERE id = $3",
    )
    .bind(status.code())
    .bind(remarks)
    .bind(application_id)
    .execute(&mut *tx)
    .await?;

    let action = format!("Returned by {}", role.title());
    append_log(
        &mut tx,
        application_id,
        actor.id,
        None,
        &action,
        None,
        Some(remarks),
        false,
        0,
    )
    .await?;

    tx.commit().await?;
    tracing::info!(
        application_id,
        status = status.code(),
        role = %role,
        return_to,
        "application returned"
    );

    Ok(WorkflowOutcome {
        application_id,
        status,
        action,
        receiver_id: None,
        permit_no: None,
    })
}

/// Re-enter the review chain after a return, at the technical-staff
/// evaluation stage.
pub async fn resubmit(
    pool: &PgPool,
    application_id: i64,
    actor: &Actor,
) -> Result<WorkflowOutcome, WorkflowError> {
    let role = resolve_role(actor)?;
    let mut tx = pool.begin().await?;
    let app = lock_application(&mut tx, application_id).await?;

    let next = transition(app.application_status, role, Operation::Resubmit)
        .ok_or_else(|| invalid_transition(app.application_status, role, Operation::Resubmit))?;

    sqlx::query(
        "UPDATE applications SET application_status = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(next.code())
    .bind(application_id)
    .execute(&mut *tx)
    .await?;

    append_log(
        &mut tx,
        application_id,
        actor.id,
        None,
        "Resubmitted after compliance",
        Some("For review / evaluation by the technical staff"),
        None,
        false,
        0,
    )
    .await?;

    tx.commit().await?;
    tracing::info!(application_id, status = next.code(), "application resubmitted");

    Ok(WorkflowOutcome {
        application_id,
        status: next,
        action: "Resubmitted after compliance".to_string(),
        receiver_id: None,
        permit_no: None,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

fn resolve_role(actor: &Actor) -> Result<Role, WorkflowError> {
    Role::from_id(actor.role_id).ok_or(WorkflowError::UnknownRole {
        role_id: actor.role_id,
    })
}

fn invalid_transition(status: i32, role: Role, operation: Operation) -> WorkflowError {
    WorkflowError::InvalidTransition {
        status,
        status_label: label_for(status),
        role,
        operation,
    }
}

/// Final approval is one-shot: an application that already carries a permit
/// number cannot be issued a second one.
fn check_not_issued(application_id: i64, permit_no: Option<&str>) -> Result<(), WorkflowError> {
    match permit_no {
        Some(_) => Err(WorkflowError::AlreadyIssued { application_id }),
        None => Ok(()),
    }
}

async fn lock_application(
    tx: &mut Transaction<'_, Postgres>,
    application_id: i64,
) -> Result<Application, WorkflowError> {
    sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1 FOR UPDATE")
        .bind(application_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(WorkflowError::NotFound { application_id })
}

/// Lowest-id active user matching `(office, role)`, as the receiver of a
/// handoff. The source system picked receivers the same way.
async fn find_user(
    tx: &mut Transaction<'_, Postgres>,
    office_id: i32,
    role: Role,
) -> Result<i64, WorkflowError> {
    let id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM users WHERE office_id = $1 AND role_id = $2 AND is_active = TRUE \
         ORDER BY id ASC LIMIT 1",
    )
    .bind(office_id)
    .bind(role.id())
    .fetch_optional(&mut **tx)
    .await?;
    id.ok_or(WorkflowError::NoEligibleReceiver { office_id, role })
}

/// Next forward position in the routing log. Return entries sit at 0, so
/// they never disturb the forward sequence.
async fn next_route_order(
    tx: &mut Transaction<'_, Postgres>,
    application_id: i64,
) -> Result<i32, WorkflowError> {
    let order: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(route_order), 0) + 1 FROM application_routing WHERE application_id = $1",
    )
    .bind(application_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(order)
}

#[allow(clippy::too_many_arguments)]
async fn append_log(
    tx: &mut Transaction<'_, Postgres>,
    application_id: i64,
    sender_id: i64,
    receiver_id: Option<i64>,
    action: &str,
    remarks: Option<&str>,
    comments: Option<&str>,
    is_read: bool,
    route_order: i32,
) -> Result<(), WorkflowError> {
    sqlx::query(
        "INSERT INTO application_routing \
         (application_id, sender_id, receiver_id, action, remarks, comments, is_read, route_order) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(application_id)
    .bind(sender_id)
    .bind(receiver_id)
    .bind(action)
    .bind(remarks)
    .bind(comments)
    .bind(is_read)
    .bind(route_order)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus as S;

    const CHAIN: &[(S, Role, Operation, S)] = &[
        (S::ForReviewEvaluation, Role::TechnicalStaff, Operation::Endorse, S::EndorsedToRpsChief),
        (S::EndorsedToRpsChief, Role::ChiefRps, Operation::Receive, S::ReceivedByRpsChief),
        (S::ReceivedByRpsChief, Role::ChiefRps, Operation::Endorse, S::EndorsedToTsdChief),
        (S::EndorsedToTsdChief, Role::ChiefTsd, Operation::Receive, S::ReceivedByTsdChief),
        (S::ReceivedByTsdChief, Role::ChiefTsd, Operation::Endorse, S::EndorsedToPenro),
        (S::EndorsedToPenro, Role::Penro, Operation::Receive, S::ReceivedByPenro),
        (S::ReceivedByPenro, Role::Penro, Operation::Endorse, S::EndorsedToFus),
        (S::EndorsedToFus, Role::Fus, Operation::Receive, S::ReceivedByFus),
        (S::ReceivedByFus, Role::Fus, Operation::Endorse, S::EndorsedToArdTs),
        (S::EndorsedToArdTs, Role::ArdTs, Operation::Receive, S::ReceivedByArdTs),
        (S::ReceivedByArdTs, Role::ArdTs, Operation::Endorse, S::EndorsedToRed),
        (S::EndorsedToRed, Role::Red, Operation::Receive, S::ApprovedByRed),
    ];

    #[test]
    fn test_full_forward_chain() {
        for (current, role, op, expected) in CHAIN {
            assert_eq!(
                transition(current.code(), *role, *op),
                Some(*expected),
                "{:?} {:?} {:?}",
                current,
                role,
                op
            );
        }
    }

    #[test]
    fn test_issuance_guard_allows_first_approval() {
        assert!(check_not_issued(42, None).is_ok());
    }

    #[test]
    fn test_issuance_guard_rejects_second_approval() {
        let err = check_not_issued(42, Some("DENR-IV-A-01082025-01L"))
            .expect_err("issued application must be rejected");
        assert!(matches!(
            err,
            WorkflowError::AlreadyIssued { application_id: 42 }
        ));
        assert_eq!(err.code(), "already_issued");
    }

    #[test]
    fn test_chain_is_monotonic_in_route_position() {
        // Each step's source state is the previous step's target state.
        for pair in CHAIN.windows(2) {
            assert_eq!(pair[0].3, pair[1].0);
        }
    }

    #[test]
    fn test_wrong_role_is_rejected() {
        // TSD Chief cannot act on an application endorsed to the RPS Chief.
        assert_eq!(
            transition(S::EndorsedToRpsChief.code(), Role::ChiefTsd, Operation::Receive),
            None
        );
        // RED cannot receive before the ARD-TS endorsement.
        assert_eq!(
            transition(S::EndorsedToArdTs.code(), Role::Red, Operation::Receive),
            None
        );
    }

    #[test]
    fn test_wrong_operation_is_rejected() {
        assert_eq!(
            transition(S::EndorsedToRpsChief.code(), Role::ChiefRps, Operation::Endorse),
            None
        );
        assert_eq!(
            transition(S::ReceivedByRpsChief.code(), Role::ChiefRps, Operation::Receive),
            None
        );
    }

    #[test]
    fn test_terminal_state_admits_nothing() {
        for role in [Role::TechnicalStaff, Role::Red, Role::ChiefRps] {
            for op in [Operation::Receive, Operation::Endorse, Operation::Resubmit] {
                assert_eq!(transition(S::ApprovedByRed.code(), role, op), None);
            }
        }
        assert!(!can_return(S::ApprovedByRed.code()));
    }

    #[test]
    fn test_resubmit_from_any_return_state() {
        for status in crate::workflow::status::RETURN_STATUSES {
            assert_eq!(
                transition(status.code(), Role::TechnicalStaff, Operation::Resubmit),
                Some(S::ForReviewEvaluation)
            );
        }
    }

    #[test]
    fn test_resubmit_requires_return_state() {
        assert_eq!(
            transition(S::ForReviewEvaluation.code(), Role::TechnicalStaff, Operation::Resubmit),
            None
        );
        assert_eq!(
            transition(S::EndorsedToPenro.code(), Role::Penro, Operation::Resubmit),
            None
        );
    }

    #[test]
    fn test_can_return_matrix() {
        assert!(can_return(S::EndorsedToRpsChief.code()));
        assert!(can_return(S::ReceivedByTsdChief.code()));
        assert!(can_return(S::EndorsedToRed.code()));
        assert!(!can_return(S::Draft.code()));
        assert!(!can_return(S::ReturnToRpsChief.code()));
        assert!(!can_return(S::ApprovedByRed.code()));
        assert!(!can_return(0));
        assert!(!can_return(99));
    }

    #[test]
    fn test_unknown_status_code_has_no_transitions() {
        assert_eq!(transition(0, Role::TechnicalStaff, Operation::Endorse), None);
        assert_eq!(transition(99, Role::Red, Operation::Receive), None);
    }

    #[test]
    fn test_technical_staff_endorse_plan() {
        let plan = endorse_plan(Role::TechnicalStaff).unwrap();
        assert_eq!(plan.action, "Endorsed to RPS Chief");
        assert_eq!(plan.receiver_role, Role::ChiefRps);
        assert_eq!(plan.receiver_at, ReceiverAt::ActorOffice);
    }

    #[test]
    fn test_tsd_chief_endorse_crosses_offices() {
        let plan = endorse_plan(Role::ChiefTsd).unwrap();
        assert_eq!(plan.receiver_role, Role::Penro);
        assert_eq!(plan.receiver_at, ReceiverAt::RoutedOffice);
    }

    #[test]
    fn test_red_has_no_endorse_stage() {
        assert!(endorse_plan(Role::Red).is_none());
        assert!(endorse_plan(Role::CenroChief).is_none());
    }

    #[test]
    fn test_technical_staff_has_no_receive_stage() {
        assert!(receive_plan(Role::TechnicalStaff).is_none());
    }

    #[test]
    fn test_every_receiving_role_has_a_plan() {
        for role in [Role::ChiefRps, Role::ChiefTsd, Role::Penro, Role::Fus, Role::ArdTs, Role::Red]
        {
            assert!(receive_plan(role).is_some(), "{:?}", role);
        }
    }
}
