//! HTTP API for the scheduler management console.
//!
//! JSON endpoints for creating, inspecting, modifying and driving the
//! lifecycle of scheduler instances through the container.

mod errors;
mod handlers;
mod responses;

pub use errors::ApiError;
pub use handlers::ApiState;
pub use responses::*;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::container::SchedulerContainer;

/// Build the API router with all endpoints.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(handlers::health))
        // Registry
        .route(
            "/api/schedulers",
            get(handlers::list_schedulers).post(handlers::create_scheduler),
        )
        .route(
            "/api/schedulers/{config_id}",
            get(handlers::get_scheduler).delete(handlers::delete_scheduler),
        )
        .route(
            "/api/schedulers/{config_id}/config",
            get(handlers::get_scheduler_config).put(handlers::modify_scheduler),
        )
        // Lifecycle
        .route(
            "/api/schedulers/{config_id}/init",
            post(handlers::init_scheduler),
        )
        .route(
            "/api/schedulers/{config_id}/start",
            post(handlers::start_scheduler),
        )
        .route(
            "/api/schedulers/{config_id}/standby",
            post(handlers::standby_scheduler),
        )
        .route(
            "/api/schedulers/{config_id}/shutdown",
            post(handlers::shutdown_scheduler),
        )
        // Inspection
        .route(
            "/api/schedulers/{config_id}/summary",
            get(handlers::get_summary),
        )
        .route("/api/schedulers/{config_id}/jobs", get(handlers::list_jobs))
        .route(
            "/api/schedulers/{config_id}/listeners",
            get(handlers::list_listeners),
        )
        // Triggers
        .route(
            "/api/schedulers/{config_id}/triggers/pause-all",
            post(handlers::pause_all_triggers),
        )
        .route(
            "/api/schedulers/{config_id}/triggers/resume-all",
            post(handlers::resume_all_triggers),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Create the API state over a container.
pub fn create_api_state(container: Arc<SchedulerContainer>) -> ApiState {
    ApiState { container }
}

/// Start the API server.
///
/// Spawns the server and returns a handle to the task. The server runs
/// until the task is aborted or the process exits.
pub async fn start_server(
    addr: SocketAddr,
    state: ApiState,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let router = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("console API listening on http://{}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(handle)
}
