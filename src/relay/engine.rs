use super::buffer::TranscriptionBuffer;
use super::channel::{end_of_stream_message, ChannelEvent, RelayChannel, RelayItem};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Timeouts governing the relay loops
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How long to wait for provider output between forwarded sends
    pub recv_poll: Duration,
    /// How long to wait for trailing provider output after end-of-stream
    pub drain_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            recv_poll: Duration::from_millis(10),
            drain_timeout: Duration::from_secs(1),
        }
    }
}

/// Counters accumulated over the lifetime of one relay
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayStats {
    /// Items successfully sent to the provider
    pub sent_to_provider: usize,
    /// Items successfully forwarded to the client sink
    pub sent_to_client: usize,
    /// Binary audio chunks among the items forwarded to the client
    pub audio_chunks_to_client: usize,
}

/// Why the relay ended
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    /// The client side closed; trailing provider output was drained
    ClientClosed,
    /// The provider closed the connection before the client did
    ProviderClosed {
        code: Option<u16>,
        reason: Option<String>,
    },
}

/// Final report handed back when the relay task finishes
#[derive(Debug, Clone)]
pub struct RelayReport {
    pub outcome: RelayOutcome,
    pub stats: RelayStats,
    /// True if the provider side was detached after a mid-stream send failure
    pub provider_detached: bool,
}

/// Shapes client items into provider requests before they are forwarded
pub trait InboundFilter: Send {
    /// Transform one inbound item into zero or more provider items
    fn ingest(&mut self, item: RelayItem) -> Vec<RelayItem>;

    /// Residual items to forward when the client side closes
    fn finish(&mut self) -> Vec<RelayItem> {
        Vec::new()
    }

    /// Terminal message for the client sink, sent at teardown
    fn end_message(&self, _stats: &RelayStats) -> Option<RelayItem> {
        None
    }
}

/// STT shaping: audio frames go to the provider unmodified
pub struct PassThrough;

impl InboundFilter for PassThrough {
    fn ingest(&mut self, item: RelayItem) -> Vec<RelayItem> {
        vec![item]
    }
}

/// TTS shaping: fragments run through the sentence buffer, control directives
/// bypass it, and emitted units become provider synthesis requests
pub struct SynthesisFilter {
    buffer: TranscriptionBuffer,
    voice_id: String,
    model_id: String,
}

impl SynthesisFilter {
    pub fn new(voice_id: String, model_id: String) -> Self {
        Self {
            buffer: TranscriptionBuffer::new(),
            voice_id,
            model_id,
        }
    }

    fn request(&self, text: &str) -> RelayItem {
        RelayItem::Text(
            json!({
                "text": text,
                "voice_id": self.voice_id,
                "model_id": self.model_id,
            })
            .to_string(),
        )
    }
}

impl InboundFilter for SynthesisFilter {
    fn ingest(&mut self, item: RelayItem) -> Vec<RelayItem> {
        let RelayItem::Text(text) = item else {
            // Binary input has no meaning on the text-to-speech inbound path
            warn!("dropping binary item on TTS inbound path");
            return Vec::new();
        };

        // Control directives arrive as JSON with a "command" field
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
            if let Some(command) = value.get("command").and_then(|c| c.as_str()) {
                return match command {
                    "flush" => self
                        .buffer
                        .flush()
                        .map(|unit| self.request(&unit))
                        .into_iter()
                        .collect(),
                    "synthesize" => value
                        .get("text")
                        .and_then(|t| t.as_str())
                        .map(|t| self.request(t))
                        .into_iter()
                        .collect(),
                    other => {
                        warn!("unknown TTS command: {other}");
                        Vec::new()
                    }
                };
            }
        }

        self.buffer
            .ingest(&text)
            .map(|unit| self.request(&unit))
            .into_iter()
            .collect()
    }

    fn finish(&mut self) -> Vec<RelayItem> {
        self.buffer
            .flush()
            .map(|unit| self.request(&unit))
            .into_iter()
            .collect()
    }

    fn end_message(&self, stats: &RelayStats) -> Option<RelayItem> {
        Some(RelayItem::Text(
            json!({
                "status": "complete",
                "chunks_sent": stats.audio_chunks_to_client,
            })
            .to_string(),
        ))
    }
}

/// Bidirectional streaming coordinator between a client channel pair and a
/// provider channel
///
/// The relay is a single unit of work: either side ending tears down both.
/// A send failure toward either side detaches only that side — the session
/// keeps recording and relaying to whichever side remains, since the archived
/// artifact is still valuable after the live view is lost.
pub struct RelayEngine<F: InboundFilter> {
    provider: Box<dyn RelayChannel>,
    inbound: mpsc::Receiver<RelayItem>,
    outbound: Option<mpsc::Sender<RelayItem>>,
    filter: F,
    config: RelayConfig,
    stats: RelayStats,
    provider_attached: bool,
}

enum Step {
    Inbound(Option<RelayItem>),
    Provider(Option<ChannelEvent>),
}

impl<F: InboundFilter> RelayEngine<F> {
    pub fn new(
        provider: Box<dyn RelayChannel>,
        inbound: mpsc::Receiver<RelayItem>,
        outbound: mpsc::Sender<RelayItem>,
        filter: F,
    ) -> Self {
        Self::with_config(provider, inbound, outbound, filter, RelayConfig::default())
    }

    pub fn with_config(
        provider: Box<dyn RelayChannel>,
        inbound: mpsc::Receiver<RelayItem>,
        outbound: mpsc::Sender<RelayItem>,
        filter: F,
        config: RelayConfig,
    ) -> Self {
        Self {
            provider,
            inbound,
            outbound: Some(outbound),
            filter,
            config,
            stats: RelayStats::default(),
            provider_attached: true,
        }
    }

    /// Run both relay directions until either side ends, then tear down
    pub async fn run(mut self) -> RelayReport {
        let outcome = self.pump().await;

        // Terminal status for the client, then release the provider side
        if let Some(message) = self.filter.end_message(&self.stats) {
            self.forward_outbound(message).await;
        }
        if self.provider_attached {
            if let Err(e) = self.provider.close().await {
                debug!("provider close failed: {e}");
            }
        }

        info!(
            sent_to_provider = self.stats.sent_to_provider,
            sent_to_client = self.stats.sent_to_client,
            "relay finished: {:?}",
            outcome
        );

        RelayReport {
            outcome,
            stats: self.stats,
            provider_detached: !self.provider_attached,
        }
    }

    async fn pump(&mut self) -> RelayOutcome {
        loop {
            if !self.provider_attached {
                // Provider side lost: keep consuming inbound items so that
                // producers never block, and drop them
                match self.inbound.recv().await {
                    Some(_) => continue,
                    None => return RelayOutcome::ClientClosed,
                }
            }

            let step = tokio::select! {
                item = self.inbound.recv() => Step::Inbound(item),
                event = self.provider.recv() => Step::Provider(event),
            };

            match step {
                Step::Inbound(Some(item)) => {
                    if let Some(outcome) = self.forward_inbound(item).await {
                        return outcome;
                    }
                }
                Step::Inbound(None) => return self.drain().await,
                Step::Provider(event) => {
                    if let Some(outcome) = self.handle_event(event).await {
                        return outcome;
                    }
                }
            }
        }
    }

    /// Forward one client item to the provider, polling briefly for any
    /// provider output that became ready during the send
    async fn forward_inbound(&mut self, item: RelayItem) -> Option<RelayOutcome> {
        for request in self.filter.ingest(item) {
            if !self.send_to_provider(request).await {
                break;
            }
            if let Ok(event) = timeout(self.config.recv_poll, self.provider.recv()).await {
                if let Some(outcome) = self.handle_event(event).await {
                    return Some(outcome);
                }
            }
        }
        None
    }

    async fn send_to_provider(&mut self, item: RelayItem) -> bool {
        if !self.provider_attached {
            return false;
        }
        match self.provider.send(item).await {
            Ok(()) => {
                self.stats.sent_to_provider += 1;
                true
            }
            Err(e) => {
                warn!("provider send failed, detaching provider side: {e}");
                self.provider_attached = false;
                false
            }
        }
    }

    async fn handle_event(&mut self, event: Option<ChannelEvent>) -> Option<RelayOutcome> {
        match event {
            Some(ChannelEvent::Data(item)) => {
                self.forward_outbound(item).await;
                None
            }
            Some(ChannelEvent::Error(e)) => {
                warn!("provider reported an error, message dropped: {e}");
                None
            }
            Some(ChannelEvent::Closed { code, reason }) => {
                Some(RelayOutcome::ProviderClosed { code, reason })
            }
            None => Some(RelayOutcome::ProviderClosed {
                code: None,
                reason: None,
            }),
        }
    }

    async fn forward_outbound(&mut self, item: RelayItem) {
        let Some(sink) = &self.outbound else {
            return;
        };
        let is_audio = item.is_binary();
        if sink.send(item).await.is_err() {
            warn!("client sink closed, detaching client side");
            self.outbound = None;
        } else {
            self.stats.sent_to_client += 1;
            if is_audio {
                self.stats.audio_chunks_to_client += 1;
            }
        }
    }

    /// Client side closed: flush filter residue, signal end-of-stream, then
    /// wait (bounded) for trailing provider output
    async fn drain(&mut self) -> RelayOutcome {
        for request in self.filter.finish() {
            if !self.send_to_provider(request).await {
                break;
            }
        }

        if self.provider_attached {
            if let Err(e) = self.provider.send(end_of_stream_message()).await {
                warn!("end_of_stream send failed: {e}");
                self.provider_attached = false;
            }
        }

        while self.provider_attached {
            match timeout(self.config.drain_timeout, self.provider.recv()).await {
                Ok(Some(ChannelEvent::Data(item))) => self.forward_outbound(item).await,
                Ok(Some(ChannelEvent::Error(e))) => {
                    warn!("provider reported an error during drain: {e}");
                }
                Ok(Some(ChannelEvent::Closed { .. })) | Ok(None) => break,
                Err(_) => {
                    debug!(
                        "no trailing provider output within {:?}",
                        self.config.drain_timeout
                    );
                    break;
                }
            }
        }

        RelayOutcome::ClientClosed
    }
}
