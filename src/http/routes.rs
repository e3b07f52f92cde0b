use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control
        .route("/sessions/start", post(handlers::start_session))
        .route("/sessions/:session_id/stop", post(handlers::stop_session))
        .route("/sessions/:session_id/mic", post(handlers::set_mic))
        .route(
            "/sessions/:session_id/repeat",
            post(handlers::request_repeat),
        )
        // Session queries
        .route("/sessions/:session_id/status", get(handlers::get_status))
        .route("/sessions/:session_id/turns", get(handlers::get_turns))
        .route("/sessions/:session_id/actions", get(handlers::get_actions))
        // Action confirmation
        .route(
            "/sessions/:session_id/actions/:action_id/confirm",
            post(handlers::confirm_action),
        )
        .route(
            "/sessions/:session_id/actions/:action_id/cancel",
            post(handlers::cancel_action),
        )
        // Wrap-up
        .route(
            "/sessions/:session_id/finalize",
            post(handlers::finalize_session),
        )
        .route(
            "/conversations/:conversation_id",
            get(handlers::get_conversation),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
