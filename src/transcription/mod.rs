//! Remote transcription and transcript handling.

pub mod client;
pub mod transcript;

pub use client::{RemoteCallError, TranscriptionClient, WhisperApiClient, WHISPER_MODEL};
pub use transcript::{assemble, target_path, write_transcript, TranscriptFragment, WriteError};
