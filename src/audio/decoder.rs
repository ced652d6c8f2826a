//! ffmpeg-backed audio decoding.
//!
//! Any container ffmpeg can read is decoded to 16 kHz mono PCM piped over
//! stdout, so no intermediate file is created for the decode step.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::info;

use super::waveform::Waveform;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to run ffmpeg: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("ffmpeg could not read the input: {0}")]
    Unreadable(String),
    #[error("decoded audio stream was malformed: {0}")]
    Malformed(#[from] hound::Error),
    #[error("input contains no audio")]
    EmptyAudio,
}

/// Decodes an input file into a [`Waveform`] via an ffmpeg subprocess.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, input: &Path) -> Result<Waveform, DecodeError>;
}

pub struct FfmpegDecoder {
    ffmpeg_path: PathBuf,
}

impl FfmpegDecoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl AudioDecoder for FfmpegDecoder {
    fn decode(&self, input: &Path) -> Result<Waveform, DecodeError> {
        let output = Command::new(&self.ffmpeg_path)
            .arg("-nostdin")
            .args(["-v", "error"])
            .arg("-i")
            .arg(input)
            .args(["-f", "wav", "-ar", "16000", "-ac", "1", "-"])
            .output()?;

        if !output.status.success() {
            return Err(DecodeError::Unreadable(stderr_summary(&output.stderr)));
        }

        let mut reader = hound::WavReader::new(Cursor::new(output.stdout))?;
        let samples: Vec<i16> = reader
            .samples::<i16>()
            .collect::<Result<_, _>>()?;

        if samples.is_empty() {
            return Err(DecodeError::EmptyAudio);
        }

        let waveform = Waveform::new(samples);
        info!(
            "Decoded {:?}: {:.1}s at 16kHz mono",
            input.file_name().unwrap_or_default(),
            waveform.duration_ms() as f64 / 1000.0
        );

        Ok(waveform)
    }
}

/// Last non-empty stderr line, so the user sees the actual ffmpeg complaint
/// instead of the whole log.
fn stderr_summary(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("unknown ffmpeg error")
        .trim()
        .to_string()
}
