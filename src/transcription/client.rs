//! Remote transcription via the OpenAI Whisper API.
//!
//! One multipart POST per encoded chunk, no streaming. The trait seam lets
//! the pipeline run against a mock client in tests.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::audio::compressor::EncodedChunk;

/// OpenAI transcription endpoint
pub const WHISPER_API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Model used for all transcription requests
pub const WHISPER_MODEL: &str = "whisper-1";

#[derive(Error, Debug)]
pub enum RemoteCallError {
    #[error("transcription request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("transcription API returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Takes bounded-size audio bytes, returns plain text.
#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    async fn transcribe(&self, chunk: &EncodedChunk) -> Result<String, RemoteCallError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// HTTP client for the Whisper transcription API.
pub struct WhisperApiClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl WhisperApiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, WHISPER_API_URL)
    }

    /// Point the client at a different endpoint, e.g. a compatible proxy.
    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TranscriptionClient for WhisperApiClient {
    async fn transcribe(&self, chunk: &EncodedChunk) -> Result<String, RemoteCallError> {
        let part = reqwest::multipart::Part::bytes(chunk.bytes.clone())
            .file_name(format!("chunk_{:04}.mp3", chunk.index))
            .mime_str("audio/mpeg")?;
        let form = reqwest::multipart::Form::new()
            .text("model", WHISPER_MODEL)
            .part("file", part);

        debug!(
            "Uploading chunk {} ({} bytes) to {}",
            chunk.index,
            chunk.size_bytes(),
            self.endpoint
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteCallError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: TranscriptionResponse = response.json().await?;
        Ok(body.text)
    }
}
