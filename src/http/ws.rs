use super::state::AppState;
use crate::relay::{RelayEngine, RelayItem, SynthesisFilter};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Optional per-connection overrides sent as the first client message
#[derive(Debug, Default, Deserialize)]
struct TtsSocketConfig {
    voice_id: Option<String>,
    model_id: Option<String>,
}

/// GET /ws/tts
/// Websocket bridge: text fragments and control directives in, synthesized
/// audio chunks plus a terminal status message out
pub async fn tts_ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_tts_socket(socket, state))
}

async fn handle_tts_socket(mut socket: WebSocket, state: AppState) {
    // First message configures the connection
    let config = match socket.recv().await {
        Some(Ok(Message::Text(text))) => {
            serde_json::from_str::<TtsSocketConfig>(&text).unwrap_or_default()
        }
        _ => {
            info!("TTS websocket closed before configuration");
            return;
        }
    };

    let voice_id = config
        .voice_id
        .unwrap_or_else(|| state.config.tts.voice_id.clone());
    let model_id = config
        .model_id
        .unwrap_or_else(|| state.config.tts.model_id.clone());

    if socket
        .send(Message::Text(r#"{"status": "ready"}"#.to_string()))
        .await
        .is_err()
    {
        return;
    }

    info!("TTS websocket session started (voice={voice_id}, model={model_id})");

    let (inbound_tx, inbound_rx) = mpsc::channel::<RelayItem>(64);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<RelayItem>(64);

    let provider = crate::provider::TtsChannel::new((*state.tts).clone());
    let engine = RelayEngine::new(
        Box::new(provider),
        inbound_rx,
        outbound_tx,
        SynthesisFilter::new(voice_id, model_id),
    );
    let relay = tokio::spawn(engine.run());

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Relay output → client socket
    let writer = tokio::spawn(async move {
        while let Some(item) = outbound_rx.recv().await {
            let message = match item {
                RelayItem::Binary(bytes) => Message::Binary(bytes),
                RelayItem::Text(text) => Message::Text(text),
            };
            if ws_tx.send(message).await.is_err() {
                break;
            }
        }
        ws_tx.close().await.ok();
    });

    // Client socket → relay input
    while let Some(Ok(message)) = ws_rx.next().await {
        let item = match message {
            Message::Text(text) => RelayItem::Text(text),
            Message::Binary(bytes) => RelayItem::Binary(bytes),
            Message::Close(_) => break,
            _ => continue,
        };
        if inbound_tx.send(item).await.is_err() {
            break;
        }
    }

    // Closing the inbound path lets the relay flush residual text and emit
    // the terminal status before tearing down
    drop(inbound_tx);

    if let Err(e) = relay.await {
        error!("TTS relay task panicked: {e}");
    }
    if let Err(e) = writer.await {
        error!("TTS socket writer panicked: {e}");
    }

    info!("TTS websocket session ended");
}
