//! PackTrack Backend
//!
//! REST backend for cub scout pack membership management: families,
//! persons, scouts, adult leaders, access roles, and compliance
//! expiration tracking, persisted in SQLite.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PackTrack Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (PACKTRACK_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Families
        .route("/families", get(api::families::list_families))
        .route("/families", post(api::families::create_family))
        .route("/families/merge", post(api::families::merge_families))
        .route("/families/{id}", get(api::families::get_family))
        .route("/families/{id}", put(api::families::update_family))
        .route("/families/{id}", delete(api::families::delete_family))
        // Persons
        .route("/persons", get(api::persons::list_persons))
        .route("/persons", post(api::persons::create_person))
        .route("/persons/merge", post(api::persons::merge_persons))
        .route("/persons/orphaned/search", get(api::persons::search_orphaned))
        .route("/persons/{id}", get(api::persons::get_person))
        .route("/persons/{id}", put(api::persons::update_person))
        .route("/persons/{id}", delete(api::persons::delete_person))
        // Scouts
        .route("/scouts", get(api::scouts::list_scouts))
        .route("/scouts", post(api::scouts::create_scout))
        .route("/scouts/expiring/list", get(api::scouts::expiring_scouts))
        .route("/scouts/den/{den}", get(api::scouts::scouts_by_den))
        .route("/scouts/{id}", get(api::scouts::get_scout))
        .route("/scouts/{id}", put(api::scouts::update_scout))
        .route("/scouts/{id}", delete(api::scouts::delete_scout))
        // Adult leaders
        .route("/leaders", get(api::leaders::list_leaders))
        .route("/leaders", post(api::leaders::create_leader))
        .route("/leaders/expiring/soon", get(api::leaders::expiring_leaders))
        .route("/leaders/{id}", get(api::leaders::get_leader))
        .route("/leaders/{id}", put(api::leaders::update_leader))
        .route("/leaders/{id}", delete(api::leaders::delete_leader))
        .route("/leaders/{id}/positions", post(api::leaders::add_position))
        .route("/leaders/{id}/positions", delete(api::leaders::remove_position))
        // Permissions
        .route("/permissions", get(api::permissions::list_permissions))
        .route("/permissions", post(api::permissions::create_permission))
        .route(
            "/permissions/admins/list",
            get(api::permissions::admin_permissions),
        )
        .route(
            "/permissions/role/{role}",
            get(api::permissions::permissions_by_role),
        )
        .route(
            "/permissions/wordpress/{wordpress_user_id}",
            get(api::permissions::permission_by_wordpress_user),
        )
        .route("/permissions/{id}", get(api::permissions::get_permission))
        .route("/permissions/{id}", put(api::permissions::update_permission))
        .route("/permissions/{id}", delete(api::permissions::delete_permission))
        // Dashboard
        .route("/dashboard/statistics", get(api::dashboard::statistics))
        .route("/dashboard/activity", get(api::dashboard::recent_activity))
        .route("/dashboard/expiring", get(api::dashboard::expiring_records))
        .route("/dashboard/orphaned", get(api::dashboard::orphaned_persons))
        .route("/dashboard/sync-status", get(api::dashboard::sync_status))
        .route("/dashboard/sync-history", get(api::dashboard::sync_history))
        .route("/dashboard/sync-history", post(api::dashboard::record_sync))
        .route(
            "/dashboard/family/{family_id}",
            get(api::dashboard::family_members),
        )
        .route("/dashboard/dens", get(api::dashboard::den_membership))
        .route("/dashboard/ranks", get(api::dashboard::rank_distribution))
        // Settings
        .route("/settings/{key}", get(api::settings::get_setting))
        .route("/settings/{key}", put(api::settings::put_setting))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
