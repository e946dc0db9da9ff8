pub mod stt;
pub mod tts;

pub use stt::{SttClient, SttSessionDescriptor, SttSessionRequest, WsChannel};
pub use tts::{SynthesisRequest, TtsChannel, TtsClient};
