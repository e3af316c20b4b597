//! Application intake and listing handlers

use crate::models::*;
use crate::validation::validate_create_application;
use crate::workflow::status::{label_for, ApplicationStatus, ALL_STATUSES};
use crate::workflow::permit;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::AppState;

// =============================================================================
// Query Parameters
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListApplicationsQuery {
    /// Comma-separated status codes, e.g. `?status=4,11`
    pub status: Option<String>,
}

fn parse_status_filter(raw: Option<&str>) -> Vec<i32> {
    raw.map(|s| {
        s.split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect()
    })
    .unwrap_or_default()
}

// =============================================================================
// Intake Endpoints
// =============================================================================

/// Create a draft application and assign its application number
pub async fn create_application(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<CreateApplication>,
) -> impl IntoResponse {
    if let Err(e) = validate_create_application(&input) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::fault("validation_error", e.to_string())),
        );
    }

    let mut tx = match state.pool.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            tracing::error!("Failed to open transaction: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error")),
            );
        }
    };

    let application_no = match permit::next_application_no(&mut tx, Utc::now().date_naive()).await {
        Ok(no) => no,
        Err(e) => {
            tracing::error!("Failed to claim application number: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to generate application number")),
            );
        }
    };

    let inserted = sqlx::query_as::<_, Application>(
        r#"
        INSERT INTO applications (
            application_no, application_status, application_type, transaction_type,
            classification, encoded_by, applicant_lastname, applicant_firstname,
            applicant_middlename, applicant_province_c, applicant_city_mun_c,
            applicant_complete_address, company_name, company_address,
            authorized_representative, company_c_province
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING *
        "#,
    )
    .bind(&application_no)
    .bind(ApplicationStatus::Draft.code())
    .bind(input.application_type)
    .bind(&input.transaction_type)
    .bind(&input.classification)
    .bind(user.id)
    .bind(&input.applicant_lastname)
    .bind(&input.applicant_firstname)
    .bind(&input.applicant_middlename)
    .bind(&input.applicant_province_c)
    .bind(&input.applicant_city_mun_c)
    .bind(&input.applicant_complete_address)
    .bind(&input.company_name)
    .bind(&input.company_address)
    .bind(&input.authorized_representative)
    .bind(&input.company_c_province)
    .fetch_one(&mut *tx)
    .await;

    let application = match inserted {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("Failed to insert application: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to create application")),
            );
        }
    };

    if let Err(e) = tx.commit().await {
        tracing::error!("Failed to commit application: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Failed to create application")),
        );
    }

    tracing::info!(
        application_id = application.id,
        application_no = %application.application_no,
        encoded_by = user.id,
        "application created"
    );

    (StatusCode::CREATED, Json(ApiResponse::success(application)))
}

/// Move a draft into review, stamping the application date
pub async fn submit_application(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let result = sqlx::query_as::<_, Application>(
        r#"
        UPDATE applications
        SET application_status = $1, date_applied = NOW(), updated_at = NOW()
        WHERE id = $2 AND application_status = $3
        RETURNING *
        "#,
    )
    .bind(ApplicationStatus::ForReviewEvaluation.code())
    .bind(id)
    .bind(ApplicationStatus::Draft.code())
    .fetch_optional(&state.pool)
    .await;

    match result {
        Ok(Some(application)) => {
            tracing::info!(application_id = id, user_id = user.id, "application submitted");
            (StatusCode::OK, Json(ApiResponse::success(application)))
        }
        Ok(None) => (
            StatusCode::CONFLICT,
            Json(ApiResponse::fault(
                "invalid_transition",
                "Application not found or not in draft",
            )),
        ),
        Err(e) => {
            tracing::error!("Failed to submit application: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to submit application")),
            )
        }
    }
}

// =============================================================================
// Read Endpoints
// =============================================================================

/// List applications filtered by status, with a per-status summary
pub async fn list_applications(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Query(query): Query<ListApplicationsQuery>,
) -> impl IntoResponse {
    let statuses = parse_status_filter(query.status.as_deref());

    let applications = if statuses.is_empty() {
        sqlx::query_as::<_, Application>(
            "SELECT * FROM applications ORDER BY created_at DESC",
        )
        .fetch_all(&state.pool)
        .await
    } else {
        sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE application_status = ANY($1) ORDER BY created_at DESC",
        )
        .bind(&statuses)
        .fetch_all(&state.pool)
        .await
    };

    let applications = match applications {
        Ok(apps) => apps,
        Err(e) => {
            tracing::error!("Failed to list applications: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error")),
            );
        }
    };

    let mut summary: Vec<StatusCount> = Vec::new();
    for app in &applications {
        match summary
            .iter_mut()
            .find(|c| c.status_code == app.application_status)
        {
            Some(entry) => entry.count += 1,
            None => summary.push(StatusCount {
                status_code: app.application_status,
                // Unknown codes render as "Unknown Status" rather than failing
                status_label: label_for(app.application_status),
                count: 1,
            }),
        }
    }
    summary.sort_by_key(|c| c.status_code);

    let response = ApplicationListResponse {
        status_labels: statuses.iter().map(|s| label_for(*s)).collect(),
        status: statuses,
        total_count: applications.len(),
        status_summary: summary,
        data: applications,
    };

    (StatusCode::OK, Json(ApiResponse::success(response)))
}

/// Get one application
pub async fn get_application(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let application =
        sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.pool)
            .await;

    match application {
        Ok(Some(app)) => (StatusCode::OK, Json(ApiResponse::success(app))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::fault("not_found", "Application not found")),
        ),
        Err(e) => {
            tracing::error!("Database error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error")),
            )
        }
    }
}

/// Counts per status across all applications
pub async fn get_dashboard_stats(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
) -> impl IntoResponse {
    let stats = sqlx::query_as::<_, (i32, i64)>(
        r#"
        SELECT application_status, COUNT(*) as count
        FROM applications
        GROUP BY application_status
        ORDER BY application_status
        "#,
    )
    .fetch_all(&state.pool)
    .await;

    let stats = match stats {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to load status counts: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error")),
            );
        }
    };

    let permits_issued: i64 = match sqlx::query_scalar(
        "SELECT COUNT(*) FROM applications WHERE permit_no IS NOT NULL",
    )
    .fetch_one(&state.pool)
    .await
    {
        Ok(count) => count,
        Err(e) => {
            tracing::error!("Failed to count issued permits: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error")),
            );
        }
    };

    let by_status = merge_status_counts(stats);

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "applications_by_status": by_status,
            "permits_issued": permits_issued
        }))),
    )
}

/// Fill the per-status counts over the full registry so zero-count stages
/// still appear; codes outside the registry are appended with the
/// "Unknown Status" label rather than dropped.
fn merge_status_counts(stats: Vec<(i32, i64)>) -> Vec<StatusCount> {
    let mut by_status: Vec<StatusCount> = ALL_STATUSES
        .iter()
        .map(|s| StatusCount {
            status_code: s.code(),
            status_label: s.label(),
            count: 0,
        })
        .collect();
    for (code, count) in stats {
        match by_status.iter_mut().find(|c| c.status_code == code) {
            Some(entry) => entry.count = count,
            None => by_status.push(StatusCount {
                status_code: code,
                status_label: label_for(code),
                count,
            }),
        }
    }
    by_status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_filter() {
        assert_eq!(parse_status_filter(Some("4,11")), vec![4, 11]);
        assert_eq!(parse_status_filter(Some(" 2 ")), vec![2]);
        assert_eq!(parse_status_filter(Some("2,bogus,3")), vec![2, 3]);
        assert!(parse_status_filter(None).is_empty());
        assert!(parse_status_filter(Some("")).is_empty());
    }

    #[test]
    fn test_merge_status_counts_covers_full_registry() {
        let merged = merge_status_counts(vec![]);
        assert_eq!(merged.len(), ALL_STATUSES.len());
        assert!(merged.iter().all(|c| c.count == 0));
    }

    #[test]
    fn test_merge_status_counts_overrides_counted_codes() {
        let merged = merge_status_counts(vec![(2, 5), (9, 1)]);
        let review = merged.iter().find(|c| c.status_code == 2).unwrap();
        assert_eq!(review.count, 5);
        assert_eq!(review.status_label, "For Review / Evaluation");
        let approved = merged.iter().find(|c| c.status_code == 9).unwrap();
        assert_eq!(approved.count, 1);
    }

    #[test]
    fn test_merge_status_counts_keeps_unknown_codes() {
        let merged = merge_status_counts(vec![(99, 3)]);
        let unknown = merged.iter().find(|c| c.status_code == 99).unwrap();
        assert_eq!(unknown.count, 3);
        assert_eq!(unknown.status_label, "Unknown Status");
    }
}
