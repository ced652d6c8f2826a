//! Pipeline orchestration: decode, chunk, transcribe, assemble, persist.
//!
//! Chunks are processed strictly one at a time in ordinal order. A failed
//! chunk is logged, recorded, and skipped; only decode and write failures
//! abort the whole invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::audio::compressor::{ChunkEncoder, EncodeError};
use crate::audio::decoder::{AudioDecoder, DecodeError};
use crate::pipeline::chunker::{Chunk, Chunker};
use crate::transcription::client::{RemoteCallError, TranscriptionClient};
use crate::transcription::transcript::{
    assemble, write_transcript, TranscriptFragment, WriteError,
};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Why a single chunk was dropped from the run.
#[derive(Error, Debug)]
pub enum ChunkFailure {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Remote(#[from] RemoteCallError),
}

/// One skipped chunk, kept for observability.
#[derive(Debug)]
pub struct FailedChunk {
    pub index: usize,
    pub reason: ChunkFailure,
}

/// Result of a completed pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Assembled transcript text
    pub transcript: String,
    /// Path the transcript file was written to
    pub saved_path: PathBuf,
    /// Total chunks produced by the chunker
    pub chunk_count: usize,
    /// Chunks that were skipped, with reasons
    pub failures: Vec<FailedChunk>,
}

pub struct TranscriptionPipeline<D, E, C> {
    decoder: Arc<D>,
    chunker: Chunker,
    encoder: Arc<E>,
    client: C,
    save_dir: PathBuf,
}

impl<D, E, C> TranscriptionPipeline<D, E, C>
where
    D: AudioDecoder + 'static,
    E: ChunkEncoder + 'static,
    C: TranscriptionClient,
{
    pub fn new(decoder: D, chunker: Chunker, encoder: E, client: C, save_dir: PathBuf) -> Self {
        Self {
            decoder: Arc::new(decoder),
            chunker,
            encoder: Arc::new(encoder),
            client,
            save_dir,
        }
    }

    /// Run the full pipeline on one input file.
    ///
    /// `original_filename` is the name the user uploaded; the transcript
    /// path is derived from its stem, not from the temp file on disk.
    pub async fn run(
        &self,
        input: &Path,
        original_filename: &str,
    ) -> Result<PipelineOutcome, PipelineError> {
        // ffmpeg decoding blocks for the whole subprocess run, so it goes
        // on the blocking pool instead of pinning a runtime worker.
        let decoder = Arc::clone(&self.decoder);
        let input = input.to_path_buf();
        let waveform = tokio::task::spawn_blocking(move || decoder.decode(&input))
            .await
            .map_err(|e| DecodeError::Spawn(std::io::Error::other(e)))??;
        let chunks = self.chunker.split(&waveform);

        info!(
            "Split {:.1}s of audio into {} chunks",
            waveform.duration_ms() as f64 / 1000.0,
            chunks.len()
        );

        let mut fragments = Vec::new();
        let mut failures = Vec::new();

        for chunk in &chunks {
            info!("Transcribing chunk {} of {}...", chunk.index + 1, chunks.len());

            match self.transcribe_chunk(chunk).await {
                Ok(text) => fragments.push(TranscriptFragment {
                    index: chunk.index,
                    text,
                }),
                Err(reason) => {
                    warn!("Skipping chunk {}: {}", chunk.index + 1, reason);
                    failures.push(FailedChunk {
                        index: chunk.index,
                        reason,
                    });
                }
            }
        }

        let transcript = assemble(fragments);
        let saved_path = write_transcript(&self.save_dir, original_filename, &transcript)?;

        info!(
            "Transcript saved to {:?} ({} of {} chunks transcribed)",
            saved_path,
            chunks.len() - failures.len(),
            chunks.len()
        );

        Ok(PipelineOutcome {
            transcript,
            saved_path,
            chunk_count: chunks.len(),
            failures,
        })
    }

    async fn transcribe_chunk(&self, chunk: &Chunk) -> Result<String, ChunkFailure> {
        let encoder = Arc::clone(&self.encoder);
        let chunk = chunk.clone();
        let encoded = tokio::task::spawn_blocking(move || encoder.encode(&chunk))
            .await
            .map_err(|e| EncodeError::Io(std::io::Error::other(e)))??;
        let text = self.client.transcribe(&encoded).await?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::compressor::{EncodedChunk, UPLOAD_LIMIT_BYTES};
    use crate::audio::waveform::{Waveform, SAMPLE_RATE};
    use crate::pipeline::chunker::CHUNK_DURATION_MS;
    use async_trait::async_trait;

    struct FixedDecoder {
        duration_ms: u64,
    }

    impl AudioDecoder for FixedDecoder {
        fn decode(&self, _input: &Path) -> Result<Waveform, DecodeError> {
            Ok(Waveform::new(vec![
                0i16;
                (self.duration_ms * SAMPLE_RATE as u64 / 1000) as usize
            ]))
        }
    }

    struct FailingDecoder;

    impl AudioDecoder for FailingDecoder {
        fn decode(&self, _input: &Path) -> Result<Waveform, DecodeError> {
            Err(DecodeError::Unreadable("corrupt header".to_string()))
        }
    }

    struct StubEncoder {
        oversized_index: Option<usize>,
    }

    impl ChunkEncoder for StubEncoder {
        fn encode(&self, chunk: &Chunk) -> Result<EncodedChunk, EncodeError> {
            if self.oversized_index == Some(chunk.index) {
                return Err(EncodeError::SizeLimitExceeded {
                    size: UPLOAD_LIMIT_BYTES + 1,
                    limit: UPLOAD_LIMIT_BYTES,
                });
            }
            Ok(EncodedChunk {
                index: chunk.index,
                bytes: vec![0u8; 64],
            })
        }
    }

    struct ScriptedClient {
        texts: Vec<&'static str>,
        failing_index: Option<usize>,
    }

    #[async_trait]
    impl TranscriptionClient for ScriptedClient {
        async fn transcribe(&self, chunk: &EncodedChunk) -> Result<String, RemoteCallError> {
            if self.failing_index == Some(chunk.index) {
                return Err(RemoteCallError::Api {
                    status: 500,
                    message: "server error".to_string(),
                });
            }
            Ok(self.texts[chunk.index].to_string())
        }
    }

    fn pipeline(
        duration_ms: u64,
        texts: Vec<&'static str>,
        failing_index: Option<usize>,
        oversized_index: Option<usize>,
        save_dir: &Path,
    ) -> TranscriptionPipeline<FixedDecoder, StubEncoder, ScriptedClient> {
        TranscriptionPipeline::new(
            FixedDecoder { duration_ms },
            Chunker::with_defaults(),
            StubEncoder { oversized_index },
            ScriptedClient {
                texts,
                failing_index,
            },
            save_dir.to_path_buf(),
        )
    }

    #[tokio::test]
    async fn test_twelve_minute_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            12 * 60 * 1000,
            vec!["A", "B", "C"],
            None,
            None,
            dir.path(),
        );

        let outcome = pipeline.run(Path::new("in.mp3"), "meeting.mp3").await.unwrap();

        assert_eq!(outcome.chunk_count, 3);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.transcript, "A B C");
        assert_eq!(outcome.saved_path, dir.path().join("meeting_transcript.txt"));
        assert_eq!(
            std::fs::read_to_string(&outcome.saved_path).unwrap(),
            "A B C"
        );
    }

    #[tokio::test]
    async fn test_idempotent_runs_write_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            2 * CHUNK_DURATION_MS,
            vec!["first", "second"],
            None,
            None,
            dir.path(),
        );

        let first = pipeline.run(Path::new("in.mp3"), "call.ogg").await.unwrap();
        let first_bytes = std::fs::read(&first.saved_path).unwrap();

        let second = pipeline.run(Path::new("in.mp3"), "call.ogg").await.unwrap();
        let second_bytes = std::fs::read(&second.saved_path).unwrap();

        assert_eq!(first.saved_path, second.saved_path);
        assert_eq!(first_bytes, second_bytes);
    }

    #[tokio::test]
    async fn test_remote_failure_skips_only_that_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            12 * 60 * 1000,
            vec!["hello", "lost", "world"],
            Some(1),
            None,
            dir.path(),
        );

        let outcome = pipeline.run(Path::new("in.mp3"), "meeting.mp3").await.unwrap();

        assert_eq!(outcome.transcript, "hello world");
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert!(matches!(
            outcome.failures[0].reason,
            ChunkFailure::Remote(_)
        ));
    }

    #[tokio::test]
    async fn test_oversized_chunk_is_rejected_before_upload() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            12 * 60 * 1000,
            vec!["never uploaded", "B", "C"],
            None,
            Some(0),
            dir.path(),
        );

        let outcome = pipeline.run(Path::new("in.mp3"), "meeting.mp3").await.unwrap();

        assert_eq!(outcome.transcript, "B C");
        assert!(matches!(
            outcome.failures[0].reason,
            ChunkFailure::Encode(EncodeError::SizeLimitExceeded { .. })
        ));
    }

    #[tokio::test]
    async fn test_decode_failure_produces_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = TranscriptionPipeline::new(
            FailingDecoder,
            Chunker::with_defaults(),
            StubEncoder {
                oversized_index: None,
            },
            ScriptedClient {
                texts: vec![],
                failing_index: None,
            },
            dir.path().to_path_buf(),
        );

        let err = pipeline
            .run(Path::new("in.mp3"), "broken.mp3")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("corrupt header"));
        assert!(!dir.path().join("broken_transcript.txt").exists());
    }
}
