//! Dynamic-range compression and MP3 encoding for upload.
//!
//! The Whisper API rejects payloads over 25 MiB, so every chunk is
//! compressed and re-encoded at a fixed low bitrate, then checked against
//! the limit before any network call is attempted.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tempfile::Builder;
use thiserror::Error;
use tracing::debug;

use super::waveform::{samples_to_wav_bytes, SAMPLE_RATE};
use crate::pipeline::chunker::Chunk;

/// Maximum byte size the transcription API accepts for one upload (25 MiB)
pub const UPLOAD_LIMIT_BYTES: usize = 25 * 1024 * 1024;

/// Fixed MP3 bitrate for encoded chunks
pub const MP3_BITRATE: &str = "64k";

/// Compression threshold in dBFS
const THRESHOLD_DB: f32 = -20.0;
/// Gain reduction ratio above the threshold
const RATIO: f32 = 4.0;
/// Envelope attack time in milliseconds
const ATTACK_MS: f32 = 5.0;
/// Envelope release time in milliseconds
const RELEASE_MS: f32 = 50.0;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error(
        "compressed chunk is {size} bytes, over the {limit} byte upload limit"
    )]
    SizeLimitExceeded { size: usize, limit: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV serialization failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("ffmpeg encoding failed: {0}")]
    Encode(String),
}

/// Compressed byte payload for one chunk, ready for upload.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    /// Ordinal index of the source chunk
    pub index: usize,
    /// Encoded MP3 bytes
    pub bytes: Vec<u8>,
}

impl EncodedChunk {
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Seam between the pipeline and the concrete ffmpeg encoder.
pub trait ChunkEncoder: Send + Sync {
    fn encode(&self, chunk: &Chunk) -> Result<EncodedChunk, EncodeError>;
}

/// Reject payloads the remote API would refuse. Exactly at the limit is fine.
pub fn ensure_within_upload_limit(size: usize) -> Result<(), EncodeError> {
    if size > UPLOAD_LIMIT_BYTES {
        return Err(EncodeError::SizeLimitExceeded {
            size,
            limit: UPLOAD_LIMIT_BYTES,
        });
    }
    Ok(())
}

/// Applies dynamic-range compression and encodes to 64 kbit/s MP3 via ffmpeg.
pub struct Mp3Compressor {
    ffmpeg_path: PathBuf,
}

impl Mp3Compressor {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl ChunkEncoder for Mp3Compressor {
    fn encode(&self, chunk: &Chunk) -> Result<EncodedChunk, EncodeError> {
        let compressed = compress_dynamic_range(chunk.samples());
        let wav = samples_to_wav_bytes(&compressed)?;

        // The temp file is removed on drop, so the encoded artifact never
        // outlives this chunk's processing, on success or on error.
        let out_file = Builder::new().suffix(".mp3").tempfile()?;

        let mut child = Command::new(&self.ffmpeg_path)
            .args(["-v", "error", "-f", "wav", "-i", "-"])
            .args(["-b:a", MP3_BITRATE, "-f", "mp3", "-y"])
            .arg(out_file.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&wav)?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(EncodeError::Encode(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let bytes = std::fs::read(out_file.path())?;
        ensure_within_upload_limit(bytes.len())?;

        debug!(
            "Encoded chunk {}: {:.1}s -> {} bytes",
            chunk.index,
            chunk.duration_ms() as f64 / 1000.0,
            bytes.len()
        );

        Ok(EncodedChunk {
            index: chunk.index,
            bytes,
        })
    }
}

/// Per-sample compressor with the usual attack/release envelope follower.
/// Signal above the threshold is reduced by the ratio; quiet audio passes
/// through untouched.
fn compress_dynamic_range(samples: &[i16]) -> Vec<i16> {
    let threshold = 10f32.powf(THRESHOLD_DB / 20.0);
    let attack = (-1.0 / (ATTACK_MS / 1000.0 * SAMPLE_RATE as f32)).exp();
    let release = (-1.0 / (RELEASE_MS / 1000.0 * SAMPLE_RATE as f32)).exp();

    let mut envelope = 0.0f32;
    let mut out = Vec::with_capacity(samples.len());

    for &sample in samples {
        let x = sample as f32 / 32768.0;
        let magnitude = x.abs();

        let coeff = if magnitude > envelope { attack } else { release };
        envelope = coeff * envelope + (1.0 - coeff) * magnitude;

        let gain = if envelope > threshold {
            (threshold + (envelope - threshold) / RATIO) / envelope
        } else {
            1.0
        };

        let y = (x * gain * 32767.0).clamp(i16::MIN as f32, i16::MAX as f32);
        out.push(y as i16);
    }

    out
}
