//! HTTP request handlers

pub mod applications;
pub mod auth;
pub mod middleware;
pub mod routing;
pub mod workflow;

pub use applications::*;
pub use auth::*;
pub use routing::*;
pub use workflow::*;

use sqlx::PgPool;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub session_expiry_hours: i64,
    pub is_production: bool,
}
