//! HTTP API server: call lifecycle control plus the TTS websocket bridge

pub mod handlers;
pub mod routes;
pub mod state;
pub mod ws;

pub use routes::create_router;
pub use state::AppState;
