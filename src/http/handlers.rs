use super::state::AppState;
use crate::audio::open_device;
use crate::provider::SttSessionRequest;
use crate::session::{CallRecord, CallSession};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// POST /calls
/// Create a call session and start streaming to the STT provider
pub async fn create_call(State(state): State<AppState>) -> impl IntoResponse {
    let session = Arc::new(CallSession::new(state.config.call_config()));
    info!("creating call: {}", session.id());

    let capture = state.config.capture_config();
    let init_request = SttSessionRequest {
        sample_rate: capture.sample_rate,
        channels: capture.channels,
        ..SttSessionRequest::default()
    };

    // Provider session setup failures surface synchronously; the call is
    // recorded as failed so later queries still find it
    let channel = match state.stt.initialize_session(&init_request).await {
        Ok(descriptor) => match state.stt.connect(&descriptor).await {
            Ok(channel) => channel,
            Err(e) => {
                error!("STT websocket connect failed: {e:#}");
                session.mark_failed().await;
                state.registry.insert(Arc::clone(&session)).await;
                return (
                    StatusCode::BAD_GATEWAY,
                    Json(ErrorResponse {
                        error: format!("Failed to connect STT session: {e:#}"),
                    }),
                )
                    .into_response();
            }
        },
        Err(e) => {
            error!("STT session init failed: {e:#}");
            session.mark_failed().await;
            state.registry.insert(Arc::clone(&session)).await;
            return (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("Failed to initialize STT session: {e:#}"),
                }),
            )
                .into_response();
        }
    };

    let device = match open_device(&capture) {
        Ok(device) => device,
        Err(e) => {
            error!("audio device open failed: {e}");
            session.mark_failed().await;
            state.registry.insert(Arc::clone(&session)).await;
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to open audio device: {e}"),
                }),
            )
                .into_response();
        }
    };

    session.start(device, Box::new(channel)).await;
    state.registry.insert(Arc::clone(&session)).await;

    info!("call started: {}", session.id());
    (StatusCode::OK, Json(session.record().await)).into_response()
}

/// GET /calls
/// List all known call sessions
pub async fn list_calls(State(state): State<AppState>) -> impl IntoResponse {
    let mut records: Vec<CallRecord> = Vec::new();
    for session in state.registry.list().await {
        records.push(session.record().await);
    }
    (StatusCode::OK, Json(records)).into_response()
}

/// GET /calls/:call_id
pub async fn get_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    match state.registry.get(&call_id).await {
        Some(session) => (StatusCode::OK, Json(session.record().await)).into_response(),
        None => not_found(&call_id),
    }
}

/// GET /calls/:call_id/transcript
pub async fn get_call_transcript(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    match state.registry.get(&call_id).await {
        Some(session) => (StatusCode::OK, Json(session.transcript().await)).into_response(),
        None => not_found(&call_id),
    }
}

/// POST /calls/:call_id/stop
/// Stop a call; idempotent on already-terminal calls
pub async fn stop_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = state.registry.get(&call_id).await else {
        error!("call {} not found", call_id);
        return not_found(&call_id);
    };

    match session.stop().await {
        Ok(record) => {
            info!("call stopped: {}", call_id);
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(e) => {
            error!("failed to stop call {}: {e:#}", call_id);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to stop call: {e:#}"),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn not_found(call_id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Call {} not found", call_id),
        }),
    )
        .into_response()
}
