use crate::config::Config;
use crate::provider::{SttClient, TtsClient};
use crate::session::SessionRegistry;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live call sessions (call_id → session)
    pub registry: Arc<SessionRegistry>,
    pub config: Arc<Config>,
    pub stt: Arc<SttClient>,
    pub tts: Arc<TtsClient>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let stt = SttClient::new(config.stt.base_url.clone(), config.stt.api_key.clone());
        let tts = TtsClient::new(config.tts.base_url.clone(), config.tts.api_key.clone());
        Self {
            registry: Arc::new(SessionRegistry::new()),
            config: Arc::new(config),
            stt: Arc::new(stt),
            tts: Arc::new(tts),
        }
    }
}
