use async_trait::async_trait;

/// A single item moving through a relay: raw audio bytes or a text/JSON message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayItem {
    /// Binary payload (PCM audio frames, synthesized audio chunks)
    Binary(Vec<u8>),
    /// Text payload (JSON transcript events, control messages, synthesis requests)
    Text(String),
}

impl RelayItem {
    pub fn is_binary(&self) -> bool {
        matches!(self, RelayItem::Binary(_))
    }
}

/// Tagged event received from a provider channel
///
/// Provider callbacks (on-message / on-error / on-close) are expressed as an
/// explicit event stream consumed by a single reader task.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A payload from the provider
    Data(RelayItem),
    /// A transport-level error; the message is lost but the channel may still be usable
    Error(String),
    /// The provider closed the connection
    Closed {
        code: Option<u16>,
        reason: Option<String>,
    },
}

/// Errors raised by a provider channel
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel send failed: {0}")]
    Send(String),

    #[error("channel is closed")]
    Closed,
}

/// Duplex message channel to an external provider
///
/// Two concrete roles exist: the STT channel (binary audio in, JSON transcript
/// events out) and the TTS channel (synthesis requests in, binary audio plus
/// JSON status out). The relay engine only sees this trait.
#[async_trait]
pub trait RelayChannel: Send {
    /// Send one item to the provider
    async fn send(&mut self, item: RelayItem) -> Result<(), ChannelError>;

    /// Receive the next provider event; `None` means the channel is exhausted
    async fn recv(&mut self) -> Option<ChannelEvent>;

    /// Close the channel (best-effort)
    async fn close(&mut self) -> Result<(), ChannelError>;
}

/// Terminal control message flushing trailing provider output before teardown
pub fn end_of_stream_message() -> RelayItem {
    RelayItem::Text(r#"{"event": "end_of_stream"}"#.to_string())
}
