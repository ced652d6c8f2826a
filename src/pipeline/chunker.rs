//! Fixed-duration chunking of a decoded waveform.

use crate::audio::waveform::Waveform;

/// Nominal chunk duration: 5 minutes
pub const CHUNK_DURATION_MS: u64 = 5 * 60 * 1000;

/// A time-bounded contiguous slice of the source audio.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Ordinal index (0-based, chronological)
    pub index: usize,
    /// Start offset in milliseconds
    pub start_ms: u64,
    /// End offset in milliseconds (exclusive)
    pub end_ms: u64,
    samples: Vec<i16>,
}

impl Chunk {
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Splits a waveform into contiguous fixed-duration chunks.
pub struct Chunker {
    chunk_duration_ms: u64,
}

impl Chunker {
    pub fn new(chunk_duration_ms: u64) -> Self {
        assert!(chunk_duration_ms > 0, "chunk duration must be positive");
        Self { chunk_duration_ms }
    }

    pub fn with_defaults() -> Self {
        Self::new(CHUNK_DURATION_MS)
    }

    /// Produce `ceil(D/N)` ordered chunks covering the full duration.
    ///
    /// Every chunk has the nominal duration except possibly the last, which
    /// carries the remainder. Deterministic for identical input.
    pub fn split(&self, waveform: &Waveform) -> Vec<Chunk> {
        let total_ms = waveform.duration_ms();
        let mut chunks = Vec::new();
        let mut start_ms = 0;

        while start_ms < total_ms {
            let end_ms = (start_ms + self.chunk_duration_ms).min(total_ms);
            chunks.push(Chunk {
                index: chunks.len(),
                start_ms,
                end_ms,
                samples: waveform.slice_ms(start_ms, end_ms).to_vec(),
            });
            start_ms = end_ms;
        }

        chunks
    }
}
