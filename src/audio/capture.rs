use super::device::{AudioDevice, AudioFrame, CaptureConfig, DeviceError};
use crate::relay::RelayItem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Live audio capture for one call
///
/// While active, every frame read from the device is appended to the archive
/// and, if a relay target is attached, forwarded to it. Forwarding is
/// best-effort: a send failure detaches the target but never stops capture,
/// so the archived audio stays complete even when the live relay is lost.
pub struct AudioCapture {
    config: CaptureConfig,

    /// Whether the capture loop is currently running
    is_recording: Arc<AtomicBool>,

    /// Frames captured so far, in capture order (append-only while active)
    frames: Arc<Mutex<Vec<AudioFrame>>>,

    /// Handle for the capture task
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl AudioCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            is_recording: Arc::new(AtomicBool::new(false)),
            frames: Arc::new(Mutex::new(Vec::new())),
            task_handle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    /// Number of frames archived so far
    pub async fn frames_captured(&self) -> usize {
        self.frames.lock().await.len()
    }

    /// Total PCM bytes archived so far
    pub async fn bytes_captured(&self) -> usize {
        self.frames.lock().await.iter().map(|f| f.bytes.len()).sum()
    }

    /// Begin capturing from `device`, optionally forwarding each frame to a
    /// relay target
    ///
    /// The device is moved into the capture task and released when the task
    /// exits. Calling start while already recording is a no-op.
    pub async fn start(
        &self,
        mut device: Box<dyn AudioDevice>,
        forward: Option<mpsc::Sender<RelayItem>>,
    ) {
        if self.is_recording.swap(true, Ordering::SeqCst) {
            warn!("already recording, ignoring start");
            return;
        }

        let is_recording = Arc::clone(&self.is_recording);
        let frames = Arc::clone(&self.frames);
        let pacing = self.config.pacing;
        let mut target = forward;

        let task = tokio::spawn(async move {
            info!("capture task started");

            while is_recording.load(Ordering::SeqCst) {
                match device.read_frame().await {
                    Ok(frame) => {
                        {
                            let mut archive = frames.lock().await;
                            archive.push(frame.clone());
                        }

                        if let Some(tx) = &target {
                            if tx.send(RelayItem::Binary(frame.bytes)).await.is_err() {
                                warn!("relay target closed, detaching; capture continues");
                                target = None;
                            }
                        }
                    }
                    Err(DeviceError::Overflow(e)) => {
                        // Frame lost, device still usable
                        warn!("transient device read error, frame dropped: {e}");
                    }
                    Err(DeviceError::Fatal(e)) => {
                        error!("fatal device error, capture ends: {e}");
                        is_recording.store(false, Ordering::SeqCst);
                        break;
                    }
                }

                tokio::time::sleep(pacing).await;
            }

            info!("capture task stopped");
        });

        let mut handle = self.task_handle.lock().await;
        *handle = Some(task);
    }

    /// Stop capturing and return all frames captured so far
    ///
    /// Idempotent: stopping while inactive returns the existing archive. The
    /// capture task gets a bounded grace period to exit before it is aborted.
    pub async fn stop(&self) -> Vec<AudioFrame> {
        self.is_recording.store(false, Ordering::SeqCst);

        let task = self.task_handle.lock().await.take();
        if let Some(mut task) = task {
            if timeout(self.config.stop_grace, &mut task).await.is_err() {
                warn!("capture task did not exit within grace period, aborting");
                task.abort();
            }
        }

        let archive = self.frames.lock().await;
        info!("recording stopped, captured {} frames", archive.len());
        archive.clone()
    }
}
