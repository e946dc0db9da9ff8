use super::handlers;
use super::state::AppState;
use super::ws;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Call lifecycle
        .route(
            "/calls",
            post(handlers::create_call).get(handlers::list_calls),
        )
        .route("/calls/:call_id", get(handlers::get_call))
        .route(
            "/calls/:call_id/transcript",
            get(handlers::get_call_transcript),
        )
        .route("/calls/:call_id/stop", post(handlers::stop_call))
        // Streaming synthesis
        .route("/ws/tts", get(ws::tts_ws_handler))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
