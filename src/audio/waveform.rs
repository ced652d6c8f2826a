//! Decoded audio representation.
//!
//! Everything downstream of the decoder works on 16 kHz mono PCM, the
//! format the Whisper API handles best and the cheapest to slice by time.

use std::io::Cursor;

/// Sample rate of every decoded waveform
pub const SAMPLE_RATE: u32 = 16_000;

/// Samples per millisecond at 16 kHz
const SAMPLES_PER_MS: u64 = SAMPLE_RATE as u64 / 1000;

/// A decoded audio buffer with known duration, owned by one pipeline run.
#[derive(Debug, Clone)]
pub struct Waveform {
    samples: Vec<i16>,
}

impl Waveform {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total duration in milliseconds, rounded up.
    ///
    /// Rounding up means a trailing partial millisecond still falls inside
    /// the final chunk; `slice_ms` clamps to the real sample count.
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64).div_ceil(SAMPLES_PER_MS)
    }

    /// Extract a contiguous sub-range by time offset.
    ///
    /// The range is clamped to the end of the buffer, so the final partial
    /// chunk of a pipeline run can ask for a full nominal window safely.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> &[i16] {
        let start = ((start_ms * SAMPLES_PER_MS) as usize).min(self.samples.len());
        let end = ((end_ms * SAMPLES_PER_MS) as usize).min(self.samples.len());
        &self.samples[start..end]
    }
}

/// Serialize samples as a 16 kHz mono 16-bit WAV byte stream.
pub fn samples_to_wav_bytes(samples: &[i16]) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
