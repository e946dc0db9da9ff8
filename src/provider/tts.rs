use crate::relay::{ChannelError, ChannelEvent, RelayChannel, RelayItem};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One synthesis request, as produced by the TTS inbound filter
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    pub model_id: String,
}

/// Client for the TTS provider's streaming synthesis API
#[derive(Clone)]
pub struct TtsClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl TtsClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            http: reqwest::Client::new(),
        }
    }

    /// Stream synthesized audio for one request
    ///
    /// The returned stream yields raw audio chunks until the provider ends
    /// the response body.
    pub async fn stream_synthesis(
        &self,
        request: &SynthesisRequest,
    ) -> Result<impl Stream<Item = reqwest::Result<Vec<u8>>>> {
        let url = format!("{}/{}/stream", self.base_url, request.voice_id);

        let response = self
            .http
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .query(&[("model_id", request.model_id.as_str())])
            .json(&serde_json::json!({ "text": request.text }))
            .send()
            .await
            .context("TTS synthesis request failed")?
            .error_for_status()
            .context("TTS provider rejected synthesis request")?;

        Ok(response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec())))
    }
}

/// TTS provider as a relay channel: synthesis requests in, audio chunks out
///
/// Each accepted request runs on its own worker task; chunks come back over
/// an internal event channel, so the relay loops never block on the vendor
/// stream.
pub struct TtsChannel {
    client: TtsClient,
    events_tx: mpsc::Sender<ChannelEvent>,
    events_rx: mpsc::Receiver<ChannelEvent>,
}

impl TtsChannel {
    pub fn new(client: TtsClient) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        Self {
            client,
            events_tx,
            events_rx,
        }
    }
}

#[async_trait]
impl RelayChannel for TtsChannel {
    async fn send(&mut self, item: RelayItem) -> Result<(), ChannelError> {
        let RelayItem::Text(text) = item else {
            return Err(ChannelError::Send(
                "TTS channel accepts text requests only".to_string(),
            ));
        };

        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ChannelError::Send(format!("malformed TTS request: {e}")))?;

        // Synthesis requests are self-contained; end_of_stream needs no flush
        if value.get("event").is_some() {
            debug!("TTS channel received control event, nothing to flush");
            return Ok(());
        }

        let request: SynthesisRequest = serde_json::from_value(value)
            .map_err(|e| ChannelError::Send(format!("malformed TTS request: {e}")))?;

        let client = self.client.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            match client.stream_synthesis(&request).await {
                Ok(mut stream) => {
                    while let Some(chunk) = stream.next().await {
                        let event = match chunk {
                            Ok(bytes) => ChannelEvent::Data(RelayItem::Binary(bytes)),
                            Err(e) => {
                                warn!("TTS stream error: {e}");
                                ChannelEvent::Error(e.to_string())
                            }
                        };
                        let failed = matches!(event, ChannelEvent::Error(_));
                        if events.send(event).await.is_err() || failed {
                            break;
                        }
                    }
                }
                Err(e) => {
                    events.send(ChannelEvent::Error(e.to_string())).await.ok();
                }
            }
        });

        Ok(())
    }

    async fn recv(&mut self) -> Option<ChannelEvent> {
        self.events_rx.recv().await
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }
}
