//! Chainsaw Permit Portal
//!
//! Tracking service for chainsaw purchase permit applications in DENR
//! Region IV-A. Applications are encoded at a CENRO, then move through the
//! multi-office review chain (RPS Chief, TSD Chief, PENRO, LPDD/FUS,
//! ARD-TS) up to the Regional Executive Director, who issues the permit
//! number. Every handoff is recorded in a routing log.

mod config;
mod db;
mod handlers;
mod models;
mod validation;
mod workflow;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use handlers::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chainsaw_permit_portal=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Starting Chainsaw Permit Portal");
    tracing::info!("Environment: {:?}", config.environment);

    // Create database pool
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    // Create application state
    let state = AppState {
        pool: pool.clone(),
        session_expiry_hours: config.session_expiry_hours,
        is_production: config.is_production(),
    };

    // Build CORS layer
    let cors = if config.is_production() {
        CorsLayer::new()
            .allow_origin(
                config
                    .cors_origins
                    .iter()
                    .filter_map(|o| o.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_credentials(true)
    } else {
        CorsLayer::permissive()
    };

    // Routes behind the session middleware
    let protected_routes = Router::new()
        // Application intake
        .route("/applications", post(handlers::create_application))
        .route("/applications", get(handlers::list_applications))
        .route("/applications/:id", get(handlers::get_application))
        .route(
            "/applications/:id/submit",
            post(handlers::submit_application),
        )
        // Routing history
        .route(
            "/applications/:id/routing",
            get(handlers::get_routing_history),
        )
        .route(
            "/applications/:id/return-comments",
            get(handlers::get_return_comments),
        )
        // Workflow actions
        .route("/workflow/receive", post(handlers::receive_application))
        .route("/workflow/endorse", post(handlers::endorse_application))
        .route("/workflow/return", post(handlers::return_application))
        .route("/workflow/resubmit", post(handlers::resubmit_application))
        // Dashboard
        .route("/dashboard", get(handlers::get_dashboard_stats))
        .route_layer(from_fn_with_state(
            state.clone(),
            handlers::middleware::require_user,
        ));

    let api_routes = Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::get_current_user))
        .merge(protected_routes);

    // Build main router
    let app = Router::new()
        .nest("/api", api_routes)
        .layer(from_fn_with_state(
            state.clone(),
            handlers::middleware::security_headers,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Start server
    let addr = config.server_addr();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
