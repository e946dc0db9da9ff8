use super::device::{AudioFrame, CaptureConfig};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Deterministic artifact path for a completed call
pub fn artifact_path(output_dir: &Path, call_id: &str, completed_unix_ts: i64) -> PathBuf {
    output_dir.join(format!("{call_id}_{completed_unix_ts}.wav"))
}

/// Serialize captured frames to a WAV file, in capture order
///
/// The data section is the exact concatenation of the frames; trailing odd
/// bytes of a malformed frame are dropped rather than skewing the sample
/// stream.
pub fn write_artifact(
    path: &Path,
    frames: &[AudioFrame],
    config: &CaptureConfig,
) -> Result<PathBuf> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("Failed to create artifact directory")?;
    }

    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    let mut total_bytes = 0usize;
    for frame in frames {
        for pair in frame.bytes.chunks_exact(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }
        total_bytes += frame.bytes.len();
    }

    writer.finalize().context("Failed to finalize WAV file")?;

    info!(
        "call audio saved to {} ({} frames, {} bytes)",
        path.display(),
        frames.len(),
        total_bytes
    );

    Ok(path.to_path_buf())
}
