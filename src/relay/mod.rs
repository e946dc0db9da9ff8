pub mod buffer;
pub mod channel;
pub mod engine;

pub use buffer::TranscriptionBuffer;
pub use channel::{end_of_stream_message, ChannelError, ChannelEvent, RelayChannel, RelayItem};
pub use engine::{
    InboundFilter, PassThrough, RelayConfig, RelayEngine, RelayOutcome, RelayReport, RelayStats,
    SynthesisFilter,
};
