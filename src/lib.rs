pub mod audio;
pub mod config;
pub mod http;
pub mod provider;
pub mod relay;
pub mod session;

pub use audio::{
    open_device, AudioCapture, AudioDevice, AudioFrame, CaptureConfig, DeviceError,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use provider::{SttClient, SttSessionRequest, TtsChannel, TtsClient};
pub use relay::{
    ChannelError, ChannelEvent, InboundFilter, PassThrough, RelayChannel, RelayConfig,
    RelayEngine, RelayItem, RelayOutcome, SynthesisFilter, TranscriptionBuffer,
};
pub use session::{CallConfig, CallRecord, CallSession, CallStatus, SessionRegistry};
