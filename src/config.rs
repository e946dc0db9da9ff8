use crate::audio::CaptureConfig;
use crate::session::CallConfig;
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub stt: SttProviderConfig,
    pub tts: TtsProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub recordings_path: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SttProviderConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TtsProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub voice_id: String,
    pub model_id: String,
}

impl Config {
    /// Load configuration from an optional file with environment overrides
    /// (`MONSIEUR__STT__API_KEY`, ...)
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "monsieur-voice")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", 8000)?
            .set_default("audio.recordings_path", "calls")?
            .set_default("audio.sample_rate", 16000)?
            .set_default("audio.channels", 1)?
            .set_default("audio.frame_size", 1024)?
            .set_default("stt.base_url", "https://api.gladia.io/v2/live")?
            .set_default("stt.api_key", "")?
            .set_default("tts.base_url", "https://api.elevenlabs.io/v1/text-to-speech")?
            .set_default("tts.api_key", "")?
            .set_default("tts.voice_id", "21m00Tcm4TlvDq8ikWAM")?
            .set_default("tts.model_id", "eleven_multilingual_v2")?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("MONSIEUR").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            frame_size: self.audio.frame_size,
            pacing: Duration::from_millis(10),
            stop_grace: Duration::from_millis(500),
        }
    }

    pub fn call_config(&self) -> CallConfig {
        CallConfig {
            capture: self.capture_config(),
            relay: Default::default(),
            recordings_dir: PathBuf::from(&self.audio.recordings_path),
        }
    }
}
