use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Interview queries
        .route("/interview/status", get(handlers::get_status))
        // Candidate actions
        .route("/interview/start", post(handlers::start_interview))
        .route("/interview/stop", post(handlers::stop_recording))
        .route("/interview/retry", post(handlers::retry_interview))
        .route("/interview/leave", post(handlers::leave_interview))
        .layer(
            ServiceBuilder::new()
                // Add tracing middleware for request logging
                .layer(TraceLayer::new_for_http())
                // The candidate UI is served from another origin
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
