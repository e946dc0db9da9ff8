use super::record::{CallRecord, CallStatus};
use crate::audio::{artifact_path, write_artifact, AudioCapture, AudioDevice, CaptureConfig};
use crate::relay::{PassThrough, RelayChannel, RelayConfig, RelayEngine, RelayItem, RelayOutcome};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Per-call configuration
#[derive(Debug, Clone)]
pub struct CallConfig {
    pub capture: CaptureConfig,
    pub relay: RelayConfig,
    /// Directory receiving one WAV artifact per completed call
    pub recordings_dir: PathBuf,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            relay: RelayConfig::default(),
            recordings_dir: PathBuf::from("calls"),
        }
    }
}

/// Mutable portion of a call, always updated as one record under the lock
struct CallState {
    status: CallStatus,
    completed_at: Option<DateTime<Utc>>,
    artifact_path: Option<PathBuf>,
}

/// One call: audio capture wired into an STT relay, transcript accumulation,
/// and an audio artifact on stop
///
/// Owned by the registry as `Arc<CallSession>`; handlers hold references,
/// never copies.
pub struct CallSession {
    id: String,
    created_at: DateTime<Utc>,
    config: CallConfig,
    capture: Arc<AudioCapture>,
    state: Arc<Mutex<CallState>>,
    transcripts: Arc<Mutex<Vec<serde_json::Value>>>,
    stop_requested: Arc<AtomicBool>,
    /// Serializes the whole stop sequence; late stoppers wait here and then
    /// take the terminal fast path
    stop_lock: Mutex<()>,
    relay_task: Mutex<Option<JoinHandle<()>>>,
    consumer_task: Mutex<Option<JoinHandle<()>>>,
}

impl CallSession {
    pub fn new(config: CallConfig) -> Self {
        let capture = Arc::new(AudioCapture::new(config.capture.clone()));
        Self {
            id: format!("call-{}", uuid::Uuid::new_v4()),
            created_at: Utc::now(),
            config,
            capture,
            state: Arc::new(Mutex::new(CallState {
                status: CallStatus::Starting,
                completed_at: None,
                artifact_path: None,
            })),
            transcripts: Arc::new(Mutex::new(Vec::new())),
            stop_requested: Arc::new(AtomicBool::new(false)),
            stop_lock: Mutex::new(()),
            relay_task: Mutex::new(None),
            consumer_task: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Wire capture into the STT relay and enter `active`
    ///
    /// `provider` is an already-connected STT channel; provider session setup
    /// failures belong to the caller and surface before this point.
    pub async fn start(&self, device: Box<dyn AudioDevice>, provider: Box<dyn RelayChannel>) {
        info!("starting call session: {}", self.id);

        let (inbound_tx, inbound_rx) = mpsc::channel::<RelayItem>(64);
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<RelayItem>(64);

        // Transcript consumer: provider JSON events accumulate in arrival order
        let transcripts = Arc::clone(&self.transcripts);
        let consumer = tokio::spawn(async move {
            while let Some(item) = outbound_rx.recv().await {
                match item {
                    RelayItem::Text(text) => match serde_json::from_str(&text) {
                        Ok(event) => transcripts.lock().await.push(event),
                        Err(e) => warn!("malformed transcript event dropped: {e}"),
                    },
                    RelayItem::Binary(_) => {
                        warn!("unexpected binary payload on transcript channel, dropped")
                    }
                }
            }
        });

        let engine = RelayEngine::with_config(
            provider,
            inbound_rx,
            outbound_tx,
            PassThrough,
            self.config.relay.clone(),
        );

        // Capture forwards every frame into the relay while archiving it;
        // it starts first so the relay watcher below always sees a live
        // capture to halt on failure
        self.capture.start(device, Some(inbound_tx)).await;

        // Run the relay; if it ends with a provider-side close before stop
        // was requested, the call has failed and capture halts
        let state = Arc::clone(&self.state);
        let stop_requested = Arc::clone(&self.stop_requested);
        let capture = Arc::clone(&self.capture);
        let call_id = self.id.clone();
        let relay = tokio::spawn(async move {
            let report = engine.run().await;
            debug!(
                "relay report for {call_id}: {:?} (provider_detached={})",
                report.outcome, report.provider_detached
            );

            if stop_requested.load(Ordering::SeqCst) {
                return;
            }
            if let RelayOutcome::ProviderClosed { code, reason } = report.outcome {
                error!(
                    "relay for {call_id} aborted before stop (code={:?}, reason={:?})",
                    code, reason
                );
                capture.stop().await;
                let mut state = state.lock().await;
                if !state.status.is_terminal() {
                    state.status = CallStatus::Failed;
                    state.completed_at = Some(Utc::now());
                }
            }
        });

        {
            let mut state = self.state.lock().await;
            // The relay watcher may already have failed the call
            if state.status == CallStatus::Starting {
                state.status = CallStatus::Active;
            }
        }

        *self.relay_task.lock().await = Some(relay);
        *self.consumer_task.lock().await = Some(consumer);

        info!("call session active: {}", self.id);
    }

    /// Mark the call failed before it ever went active (provider setup error)
    pub async fn mark_failed(&self) {
        let mut state = self.state.lock().await;
        if !state.status.is_terminal() {
            state.status = CallStatus::Failed;
            state.completed_at = Some(Utc::now());
        }
    }

    /// Stop the call: halt capture, tear down the relay, persist the artifact
    ///
    /// Idempotent from a terminal state: returns the existing record without
    /// a second artifact write. Concurrent stops serialize on an internal
    /// lock, so only the first runs the teardown and later callers observe
    /// the same terminal record.
    pub async fn stop(&self) -> Result<CallRecord> {
        let _stopping = self.stop_lock.lock().await;

        {
            let state = self.state.lock().await;
            if state.status.is_terminal() {
                debug!("stop on terminal call {}, returning record", self.id);
                drop(state);
                return Ok(self.record().await);
            }
        }

        info!("stopping call session: {}", self.id);
        self.stop_requested.store(true, Ordering::SeqCst);

        // Halting capture drops the relay's inbound sender; the relay then
        // flushes end_of_stream and drains trailing transcript events
        let frames = self.capture.stop().await;

        if let Some(task) = self.relay_task.lock().await.take() {
            if let Err(e) = task.await {
                error!("relay task panicked: {e}");
            }
        }
        if let Some(task) = self.consumer_task.lock().await.take() {
            // Consumer ends once the relay drops the outbound sender
            if let Err(e) = task.await {
                error!("transcript consumer panicked: {e}");
            }
        }

        let completed_at = Utc::now();
        let artifact = if frames.is_empty() {
            None
        } else {
            let path = artifact_path(
                &self.config.recordings_dir,
                &self.id,
                completed_at.timestamp(),
            );
            match write_artifact(&path, &frames, self.capture.config()) {
                Ok(path) => Some(path),
                Err(e) => {
                    error!("artifact write failed for {}: {e}", self.id);
                    None
                }
            }
        };

        {
            let mut state = self.state.lock().await;
            // The relay watcher may have marked the call failed already
            if !state.status.is_terminal() {
                state.status = CallStatus::Completed;
            }
            state.completed_at = Some(completed_at);
            state.artifact_path = artifact;
        }

        info!("call session stopped: {}", self.id);
        Ok(self.record().await)
    }

    /// Current snapshot of the call
    pub async fn record(&self) -> CallRecord {
        let (status, completed_at, artifact_path) = {
            let state = self.state.lock().await;
            (
                state.status,
                state.completed_at,
                state
                    .artifact_path
                    .as_ref()
                    .map(|p| p.display().to_string()),
            )
        };

        CallRecord {
            call_id: self.id.clone(),
            status,
            created_at: self.created_at,
            completed_at,
            duration_secs: completed_at.map(|done| {
                (done - self.created_at).num_milliseconds() as f64 / 1000.0
            }),
            frames_captured: self.capture.frames_captured().await,
            audio_bytes: self.capture.bytes_captured().await,
            transcript_events: self.transcripts.lock().await.len(),
            artifact_path,
        }
    }

    /// Transcription events accumulated so far, in arrival order
    pub async fn transcript(&self) -> Vec<serde_json::Value> {
        self.transcripts.lock().await.clone()
    }
}
