use crate::relay::{ChannelError, ChannelEvent, RelayChannel, RelayItem};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::info;

/// Audio format parameters sent when requesting an STT session
#[derive(Debug, Clone, Serialize)]
pub struct SttSessionRequest {
    pub encoding: String,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub channels: u16,
}

impl Default for SttSessionRequest {
    fn default() -> Self {
        Self {
            encoding: "wav/pcm".to_string(),
            sample_rate: 16000,
            bit_depth: 16,
            channels: 1,
        }
    }
}

/// Provider response to a session init request
#[derive(Debug, Clone, Deserialize)]
pub struct SttSessionDescriptor {
    /// Provider-side session id
    pub id: String,
    /// Websocket URL carrying the live session
    pub url: String,
}

/// Client for the STT provider's session API
#[derive(Clone)]
pub struct SttClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl SttClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            http: reqwest::Client::new(),
        }
    }

    /// Request a new live transcription session
    ///
    /// Failures here are setup failures: they propagate synchronously and the
    /// call never goes active.
    pub async fn initialize_session(
        &self,
        request: &SttSessionRequest,
    ) -> Result<SttSessionDescriptor> {
        let response = self
            .http
            .post(&self.base_url)
            .header("x-gladia-key", &self.api_key)
            .json(request)
            .send()
            .await
            .context("STT session request failed")?
            .error_for_status()
            .context("STT provider rejected session init")?;

        let descriptor: SttSessionDescriptor = response
            .json()
            .await
            .context("Failed to parse STT session descriptor")?;

        info!("STT session initialized: {}", descriptor.id);
        Ok(descriptor)
    }

    /// Open the live websocket described by a session descriptor
    pub async fn connect(&self, descriptor: &SttSessionDescriptor) -> Result<WsChannel> {
        let (ws, _) = connect_async(descriptor.url.as_str())
            .await
            .context("Failed to connect STT websocket")?;

        info!("STT websocket connected for session {}", descriptor.id);
        Ok(WsChannel::new(ws))
    }
}

/// Provider websocket as a relay channel: binary audio in, JSON events out
pub struct WsChannel {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsChannel {
    pub fn new(ws: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self { ws }
    }
}

#[async_trait]
impl RelayChannel for WsChannel {
    async fn send(&mut self, item: RelayItem) -> Result<(), ChannelError> {
        let message = match item {
            RelayItem::Binary(bytes) => Message::Binary(bytes),
            RelayItem::Text(text) => Message::Text(text),
        };
        self.ws
            .send(message)
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<ChannelEvent> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Binary(bytes)) => {
                    return Some(ChannelEvent::Data(RelayItem::Binary(bytes)))
                }
                Ok(Message::Text(text)) => return Some(ChannelEvent::Data(RelayItem::Text(text))),
                Ok(Message::Close(frame)) => {
                    return Some(ChannelEvent::Closed {
                        code: frame.as_ref().map(|f| f.code.into()),
                        reason: frame.map(|f| f.reason.to_string()),
                    })
                }
                // Ping/pong and raw frames are transport noise
                Ok(_) => continue,
                Err(e) => return Some(ChannelEvent::Error(e.to_string())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.ws
            .close(None)
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))
    }
}
