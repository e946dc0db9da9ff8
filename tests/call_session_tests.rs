// Integration tests for the call lifecycle
//
// A scripted audio device and an in-memory STT channel replace the real
// microphone and provider websocket, so session state transitions, artifact
// writes, and degradation under provider failure can be verified end to end.

use anyhow::Result;
use async_trait::async_trait;
use monsieur_voice::audio::{AudioCapture, AudioDevice, AudioFrame, CaptureConfig, DeviceError};
use monsieur_voice::relay::{ChannelError, ChannelEvent, RelayChannel, RelayConfig, RelayItem};
use monsieur_voice::session::{CallConfig, CallSession, CallStatus, SessionRegistry};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Plays back a fixed frame sequence, then reports transient underruns
struct ScriptedDevice {
    frames: VecDeque<Vec<u8>>,
}

impl ScriptedDevice {
    fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

#[async_trait]
impl AudioDevice for ScriptedDevice {
    async fn read_frame(&mut self) -> Result<AudioFrame, DeviceError> {
        match self.frames.pop_front() {
            Some(bytes) => Ok(AudioFrame { bytes }),
            None => {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Err(DeviceError::Overflow("no data".to_string()))
            }
        }
    }
}

/// In-memory STT channel: optionally refuses sends, plays back fixed events,
/// then idles like an open connection
struct ScriptedSttChannel {
    accept_sends: bool,
    events: VecDeque<ChannelEvent>,
}

impl ScriptedSttChannel {
    fn with_events(events: Vec<ChannelEvent>) -> Self {
        Self {
            accept_sends: true,
            events: events.into(),
        }
    }

    fn unreachable() -> Self {
        Self {
            accept_sends: false,
            events: VecDeque::new(),
        }
    }
}

#[async_trait]
impl RelayChannel for ScriptedSttChannel {
    async fn send(&mut self, _item: RelayItem) -> Result<(), ChannelError> {
        if self.accept_sends {
            Ok(())
        } else {
            Err(ChannelError::Send("connection refused".to_string()))
        }
    }

    async fn recv(&mut self) -> Option<ChannelEvent> {
        match self.events.pop_front() {
            Some(event) => Some(event),
            None => futures::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }
}

fn test_config(recordings_dir: &TempDir) -> CallConfig {
    CallConfig {
        capture: CaptureConfig {
            sample_rate: 16000,
            channels: 1,
            frame_size: 5,
            pacing: Duration::from_millis(1),
            stop_grace: Duration::from_millis(200),
        },
        relay: RelayConfig {
            recv_poll: Duration::from_millis(2),
            drain_timeout: Duration::from_millis(30),
        },
        recordings_dir: recordings_dir.path().to_path_buf(),
    }
}

/// Poll a session until a condition holds or the deadline passes
async fn wait_for<F, Fut>(mut check: F, what: &str)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn test_capture_survives_unreachable_stt_channel() -> Result<()> {
    // 5 frames of 10 bytes while every provider send fails: the call must
    // still record everything and complete, not fail
    let temp_dir = TempDir::new()?;
    let session = Arc::new(CallSession::new(test_config(&temp_dir)));

    let device = Box::new(ScriptedDevice::new(vec![vec![7u8; 10]; 5]));
    let provider = Box::new(ScriptedSttChannel::unreachable());

    session.start(device, provider).await;

    let probe = Arc::clone(&session);
    wait_for(
        move || {
            let session = Arc::clone(&probe);
            async move { session.record().await.frames_captured >= 5 }
        },
        "5 frames captured",
    )
    .await;

    let record = session.stop().await?;

    assert_eq!(record.status, CallStatus::Completed);
    assert_eq!(record.frames_captured, 5);
    assert_eq!(record.audio_bytes, 50);
    assert_eq!(record.transcript_events, 0);
    assert!(record.duration_secs.unwrap() >= 0.0);

    // The artifact holds the exact 50 bytes of PCM (25 16-bit samples)
    let artifact = record.artifact_path.expect("artifact written");
    let reader = hound::WavReader::open(&artifact)?;
    assert_eq!(reader.spec().sample_rate, 16000);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len(), 25);

    Ok(())
}

#[tokio::test]
async fn test_transcript_events_accumulate_in_order() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let session = Arc::new(CallSession::new(test_config(&temp_dir)));

    let events = vec![
        ChannelEvent::Data(RelayItem::Text(
            r#"{"type":"transcript","text":"first"}"#.to_string(),
        )),
        ChannelEvent::Data(RelayItem::Text("not json at all".to_string())),
        ChannelEvent::Data(RelayItem::Text(
            r#"{"type":"transcript","text":"second"}"#.to_string(),
        )),
    ];

    let device = Box::new(ScriptedDevice::new(vec![vec![0u8; 10]; 3]));
    let provider = Box::new(ScriptedSttChannel::with_events(events));

    session.start(device, provider).await;

    let probe = Arc::clone(&session);
    wait_for(
        move || {
            let session = Arc::clone(&probe);
            async move { session.record().await.transcript_events >= 2 }
        },
        "2 transcript events",
    )
    .await;

    let record = session.stop().await?;
    assert_eq!(record.status, CallStatus::Completed);

    // The malformed payload was dropped; order of the rest is preserved
    let transcript = session.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0]["text"], "first");
    assert_eq!(transcript[1]["text"], "second");

    Ok(())
}

#[tokio::test]
async fn test_stop_is_idempotent() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let session = Arc::new(CallSession::new(test_config(&temp_dir)));

    let device = Box::new(ScriptedDevice::new(vec![vec![1u8; 10]; 2]));
    let provider = Box::new(ScriptedSttChannel::with_events(Vec::new()));

    session.start(device, provider).await;

    let probe = Arc::clone(&session);
    wait_for(
        move || {
            let session = Arc::clone(&probe);
            async move { session.record().await.frames_captured >= 2 }
        },
        "2 frames captured",
    )
    .await;

    let first = session.stop().await?;
    let second = session.stop().await?;

    assert_eq!(first.status, CallStatus::Completed);
    assert_eq!(second.status, CallStatus::Completed);
    assert_eq!(second.completed_at, first.completed_at);
    assert_eq!(second.artifact_path, first.artifact_path);

    // No second artifact write
    let wav_files = std::fs::read_dir(temp_dir.path())?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "wav"))
        .count();
    assert_eq!(wav_files, 1);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_stops_return_the_same_terminal_record() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let session = Arc::new(CallSession::new(test_config(&temp_dir)));

    let device = Box::new(ScriptedDevice::new(vec![vec![4u8; 10]; 3]));
    let provider = Box::new(ScriptedSttChannel::with_events(Vec::new()));

    session.start(device, provider).await;

    let probe = Arc::clone(&session);
    wait_for(
        move || {
            let session = Arc::clone(&probe);
            async move { session.record().await.frames_captured >= 3 }
        },
        "3 frames captured",
    )
    .await;

    // Two stops racing on an active session: only one may run the teardown,
    // the other must observe the identical terminal record
    let (first, second) = tokio::join!(session.stop(), session.stop());
    let first = first?;
    let second = second?;

    assert_eq!(first.status, CallStatus::Completed);
    assert_eq!(second.status, CallStatus::Completed);
    assert_eq!(
        second.completed_at, first.completed_at,
        "concurrent stops must return the same terminal record"
    );
    assert_eq!(second.artifact_path, first.artifact_path);

    // Exactly one artifact write happened
    let wav_files = std::fs::read_dir(temp_dir.path())?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "wav"))
        .count();
    assert_eq!(wav_files, 1);

    Ok(())
}

#[tokio::test]
async fn test_capture_reports_recording_state_across_start_and_stop() -> Result<()> {
    let config = CaptureConfig {
        sample_rate: 16000,
        channels: 1,
        frame_size: 5,
        pacing: Duration::from_millis(1),
        stop_grace: Duration::from_millis(200),
    };
    let capture = AudioCapture::new(config);
    assert!(!capture.is_recording());

    let device = Box::new(ScriptedDevice::new(vec![vec![5u8; 10]; 2]));
    capture.start(device, None).await;
    assert!(capture.is_recording());

    for _ in 0..200 {
        if capture.frames_captured().await >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let frames = capture.stop().await;
    assert!(!capture.is_recording());
    assert_eq!(frames.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_provider_close_before_stop_fails_the_call() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let session = Arc::new(CallSession::new(test_config(&temp_dir)));

    let device = Box::new(ScriptedDevice::new(vec![vec![2u8; 10]; 2]));
    let provider = Box::new(ScriptedSttChannel::with_events(vec![
        ChannelEvent::Closed {
            code: Some(1006),
            reason: Some("abnormal closure".to_string()),
        },
    ]));

    session.start(device, provider).await;

    let probe = Arc::clone(&session);
    wait_for(
        move || {
            let session = Arc::clone(&probe);
            async move { session.record().await.status == CallStatus::Failed }
        },
        "failed status",
    )
    .await;

    // Stop on a failed call returns the terminal record without an artifact
    let record = session.stop().await?;
    assert_eq!(record.status, CallStatus::Failed);
    assert!(record.artifact_path.is_none());
    assert!(record.completed_at.is_some());

    Ok(())
}

#[tokio::test]
async fn test_duration_is_non_negative_and_audio_append_only() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let session = Arc::new(CallSession::new(test_config(&temp_dir)));

    let device = Box::new(ScriptedDevice::new(vec![vec![3u8; 10]; 4]));
    let provider = Box::new(ScriptedSttChannel::with_events(Vec::new()));

    session.start(device, provider).await;

    let mut last_seen = 0;
    for _ in 0..50 {
        let frames = session.record().await.frames_captured;
        assert!(frames >= last_seen, "captured audio must be append-only");
        last_seen = frames;
        if frames >= 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(last_seen, 4);

    let record = session.stop().await?;
    assert!(record.duration_secs.unwrap() >= 0.0);
    assert_eq!(record.frames_captured, 4);

    Ok(())
}

#[tokio::test]
async fn test_registry_create_lookup_enumerate_remove() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let registry = SessionRegistry::new();
    assert!(registry.is_empty().await);

    let session = Arc::new(CallSession::new(test_config(&temp_dir)));
    let call_id = session.id().to_string();
    registry.insert(Arc::clone(&session)).await;

    assert_eq!(registry.len().await, 1);
    assert!(registry.get(&call_id).await.is_some());
    assert!(registry.get("call-unknown").await.is_none());
    assert_eq!(registry.list().await.len(), 1);

    let removed = registry.remove(&call_id).await;
    assert!(removed.is_some());
    assert!(registry.is_empty().await);

    Ok(())
}
