//! Routing history handlers
//!
//! Read side of the audit trail: the complete routing history in
//! `route_order` sequence, and a filtered view of the return/compliance
//! comments recorded at the `route_order = 0` sentinel.

use crate::models::*;
use crate::workflow::status::label_for;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};

use super::AppState;

/// Every log entry for the application: the `route_order = 0` compliance
/// entries sort first, then the forward handoffs in sequence.
const ROUTING_HISTORY_SQL: &str = r#"
    SELECT ar.id, a.application_no, ar.route_order,
           s.name AS sender, sr.title AS sender_role,
           r.name AS receiver, rr.title AS receiver_role,
           ar.action, ar.remarks, ar.comments, ar.created_at
    FROM application_routing ar
    JOIN applications a ON a.id = ar.application_id
    LEFT JOIN users s ON s.id = ar.sender_id
    LEFT JOIN roles sr ON sr.id = s.role_id
    LEFT JOIN users r ON r.id = ar.receiver_id
    LEFT JOIN roles rr ON rr.id = r.role_id
    WHERE ar.application_id = $1
    ORDER BY ar.route_order ASC, ar.created_at ASC
"#;

/// Full routing history for one application, in route order
pub async fn get_routing_history(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM applications WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .unwrap_or(None);
    if exists.is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::fault("not_found", "Application not found")),
        );
    }

    let rows = sqlx::query_as::<_, RoutingHistoryRow>(ROUTING_HISTORY_SQL)
        .bind(id)
        .fetch_all(&state.pool)
        .await;

    match rows {
        Ok(history) => (StatusCode::OK, Json(ApiResponse::success(history))),
        Err(e) => {
            tracing::error!("Failed to load routing history: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error")),
            )
        }
    }
}

/// Return/compliance comments for one application, most recent first
pub async fn get_return_comments(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let rows = sqlx::query_as::<_, ReturnCommentRow>(
        r#"
        SELECT ar.id, a.application_no,
               s.name AS action_officer, sr.title AS sender_role,
               ar.action, ar.comments, a.application_status, a.date_returned, ar.created_at
        FROM application_routing ar
        JOIN applications a ON a.id = ar.application_id
        LEFT JOIN users s ON s.id = ar.sender_id
        LEFT JOIN roles sr ON sr.id = s.role_id
        WHERE ar.application_id = $1 AND ar.route_order = 0
        ORDER BY ar.created_at DESC
        "#,
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await;

    match rows {
        Ok(comments) => {
            let comments: Vec<ReturnCommentResponse> = comments
                .into_iter()
                .map(|row| ReturnCommentResponse {
                    id: row.id,
                    application_no: row.application_no,
                    action_officer: row.action_officer,
                    sender_role: row.sender_role,
                    action: row.action,
                    comments: row.comments,
                    application_status: row.application_status,
                    status_label: label_for(row.application_status),
                    date_returned: row.date_returned,
                    created_at: row.created_at,
                })
                .collect();
            (StatusCode::OK, Json(ApiResponse::success(comments)))
        }
        Err(e) => {
            tracing::error!("Failed to load return comments: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error")),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The history view is the full audit trail: return and compliance
    // entries (route_order = 0) must not be filtered out.
    #[test]
    fn test_history_query_keeps_compliance_entries() {
        assert!(!ROUTING_HISTORY_SQL.contains("route_order >"));
        assert!(!ROUTING_HISTORY_SQL.contains("route_order !="));
        assert!(ROUTING_HISTORY_SQL.contains("WHERE ar.application_id = $1"));
    }

    #[test]
    fn test_history_query_orders_by_route_order() {
        assert!(ROUTING_HISTORY_SQL.contains("ORDER BY ar.route_order ASC, ar.created_at ASC"));
    }
}
