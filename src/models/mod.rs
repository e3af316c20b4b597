//! Data models for the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    Individual,
    Company,
}

// =============================================================================
// Application
// =============================================================================

/// One permit application. Status codes come from the workflow status
/// registry and are stored as plain integers; the per-stage flags and
/// timestamps are stamped by the workflow engine only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: i64,
    pub application_no: String,
    pub permit_no: Option<String>,
    pub application_status: i32,
    pub application_type: ApplicationType,
    pub transaction_type: String,
    pub classification: Option<String>,
    pub encoded_by: Option<i64>,

    pub applicant_lastname: Option<String>,
    pub applicant_firstname: Option<String>,
    pub applicant_middlename: Option<String>,
    pub applicant_province_c: Option<String>,
    pub applicant_city_mun_c: Option<String>,
    pub applicant_complete_address: Option<String>,

    pub company_name: Option<String>,
    pub company_address: Option<String>,
    pub authorized_representative: Option<String>,
    pub company_c_province: Option<String>,

    pub date_endorsed_rps_chief: Option<DateTime<Utc>>,
    pub is_rps_chief_received: bool,
    pub date_received_rps_chief: Option<DateTime<Utc>>,
    pub date_endorsed_tsd_chief: Option<DateTime<Utc>>,
    pub is_tsd_chief_received: bool,
    pub date_received_tsd_chief: Option<DateTime<Utc>>,
    pub date_endorsed_penro: Option<DateTime<Utc>>,
    pub is_penro_chief_received: bool,
    pub date_received_penro_chief: Option<DateTime<Utc>>,
    pub date_endorsed_fus: Option<DateTime<Utc>>,
    pub is_fus_received: bool,
    pub date_received_fus: Option<DateTime<Utc>>,
    pub date_endorsed_ardts: Option<DateTime<Utc>>,
    pub is_ardts_received: bool,
    pub date_received_ardts: Option<DateTime<Utc>>,
    pub date_endorsed_red: Option<DateTime<Utc>>,
    pub is_red_received: bool,
    pub date_received_red: Option<DateTime<Utc>>,

    pub return_reason: Option<String>,
    pub date_returned: Option<DateTime<Utc>>,

    pub date_applied: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Province code used for the permit-number suffix: the company's
    /// province for company applications, the applicant's otherwise.
    pub fn permit_province_code(&self) -> Option<&str> {
        self.company_c_province
            .as_deref()
            .or(self.applicant_province_c.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateApplication {
    pub application_type: ApplicationType,
    pub transaction_type: String,
    pub classification: Option<String>,
    pub applicant_lastname: Option<String>,
    pub applicant_firstname: Option<String>,
    pub applicant_middlename: Option<String>,
    pub applicant_province_c: Option<String>,
    pub applicant_city_mun_c: Option<String>,
    pub applicant_complete_address: Option<String>,
    pub company_name: Option<String>,
    pub company_address: Option<String>,
    pub authorized_representative: Option<String>,
    pub company_c_province: Option<String>,
}

// =============================================================================
// Routing Log
// =============================================================================

/// One handoff in an application's audit trail. Created once, never
/// edited. `route_order` is strictly increasing for forward progress;
/// return and resubmission entries carry the sentinel 0.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoutingLogEntry {
    pub id: i64,
    pub application_id: i64,
    pub sender_id: i64,
    pub receiver_id: Option<i64>,
    pub action: String,
    pub remarks: Option<String>,
    pub comments: Option<String>,
    pub is_read: bool,
    pub route_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Routing history row joined with sender/receiver names and role titles.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RoutingHistoryRow {
    pub id: i64,
    pub application_no: String,
    pub route_order: i32,
    pub sender: Option<String>,
    pub sender_role: Option<String>,
    pub receiver: Option<String>,
    pub receiver_role: Option<String>,
    pub action: String,
    pub remarks: Option<String>,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Return/compliance comment row (`route_order = 0` entries).
#[derive(Debug, Clone, FromRow)]
pub struct ReturnCommentRow {
    pub id: i64,
    pub application_no: String,
    pub action_officer: Option<String>,
    pub sender_role: Option<String>,
    pub action: String,
    pub comments: Option<String>,
    pub application_status: i32,
    pub date_returned: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Return comment with the application's status label resolved.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnCommentResponse {
    pub id: i64,
    pub application_no: String,
    pub action_officer: Option<String>,
    pub sender_role: Option<String>,
    pub action: String,
    pub comments: Option<String>,
    pub application_status: i32,
    pub status_label: &'static str,
    pub date_returned: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// User & Session
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub office_id: i32,
    pub role_id: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub office_id: i32,
    pub role_id: i32,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
            office_id: user.office_id,
            role_id: user.role_id,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

// =============================================================================
// Workflow Requests & Responses
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowActionRequest {
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnRequest {
    pub id: Option<i64>,
    #[serde(alias = "returnTo")]
    pub return_to: Option<i32>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResponse {
    pub application_id: i64,
    pub current_status: i32,
    pub status_label: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permit_no: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status_code: i32,
    pub status_label: &'static str,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationListResponse {
    pub status: Vec<i32>,
    pub status_labels: Vec<&'static str>,
    pub total_count: usize,
    pub status_summary: Vec<StatusCount>,
    pub data: Vec<Application>,
}

// =============================================================================
// API Responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            error_code: None,
        }
    }

    /// Error carrying a stable machine code alongside the human message.
    pub fn fault(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            error_code: Some(code),
        }
    }
}
