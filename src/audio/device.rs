use async_trait::async_trait;
use std::time::Duration;

/// Audio input format, set once per session
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Samples read per capture tick
    pub frame_size: usize,
    /// Yield between reads so an idle loop never busy-spins
    pub pacing: Duration,
    /// Grace period for the capture task to exit on stop before force-cancel
    pub stop_grace: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_size: 1024,
            pacing: Duration::from_millis(10),
            stop_grace: Duration::from_millis(500),
        }
    }
}

impl CaptureConfig {
    /// Bytes per frame for 16-bit PCM
    pub fn frame_bytes(&self) -> usize {
        self.frame_size * self.channels as usize * 2
    }
}

/// One fixed-duration chunk of raw PCM bytes, immutable once produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub bytes: Vec<u8>,
}

/// Errors from an audio input device
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Buffer overflow or comparable transient fault; the frame is lost but
    /// the device remains usable
    #[error("transient device read error: {0}")]
    Overflow(String),

    /// The device is gone; capture cannot continue
    #[error("fatal device error: {0}")]
    Fatal(String),
}

/// Source of raw PCM frames
///
/// Real device I/O lives behind this trait; the capture loop only reads
/// frames. The device is owned by the capture task and released when the
/// task exits, on every path.
#[async_trait]
pub trait AudioDevice: Send {
    /// Read the next frame, blocking until one is available
    async fn read_frame(&mut self) -> Result<AudioFrame, DeviceError>;
}

/// Fallback input producing silent frames at the configured cadence
///
/// Used when no hardware device is wired in, so the service stays runnable
/// end-to-end (sessions, relays, artifacts) without an input device.
pub struct SilenceDevice {
    frame_bytes: usize,
    frame_interval: Duration,
}

impl SilenceDevice {
    pub fn new(config: &CaptureConfig) -> Self {
        let frame_ms = config.frame_size as u64 * 1000 / config.sample_rate as u64;
        Self {
            frame_bytes: config.frame_bytes(),
            frame_interval: Duration::from_millis(frame_ms.max(1)),
        }
    }
}

#[async_trait]
impl AudioDevice for SilenceDevice {
    async fn read_frame(&mut self) -> Result<AudioFrame, DeviceError> {
        tokio::time::sleep(self.frame_interval).await;
        Ok(AudioFrame {
            bytes: vec![0u8; self.frame_bytes],
        })
    }
}

/// Open the input device for a session
///
/// Fatal open errors propagate to the caller; nothing is spawned until the
/// device is acquired.
pub fn open_device(config: &CaptureConfig) -> Result<Box<dyn AudioDevice>, DeviceError> {
    Ok(Box::new(SilenceDevice::new(config)))
}
