//! Web UI: one upload control, one text output.
//!
//! `POST /transcribe` takes a multipart audio upload, runs the pipeline,
//! and answers with a plain-text body holding the save path and transcript,
//! or a descriptive error message. Nothing here panics the server; every
//! failure becomes a message the browser can show.

use std::io::Write;
use std::sync::Arc;

use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, info};

use crate::audio::compressor::Mp3Compressor;
use crate::audio::decoder::FfmpegDecoder;
use crate::config::Config;
use crate::pipeline::chunker::Chunker;
use crate::pipeline::runner::TranscriptionPipeline;
use crate::transcription::client::WhisperApiClient;

/// Uploads larger than this are rejected at the HTTP layer (2 GiB)
const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024 * 1024;

type AppPipeline = TranscriptionPipeline<FfmpegDecoder, Mp3Compressor, WhisperApiClient>;

pub struct AppState {
    pipeline: AppPipeline,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let pipeline = TranscriptionPipeline::new(
            FfmpegDecoder::new(&config.ffmpeg_path),
            Chunker::with_defaults(),
            Mp3Compressor::new(&config.ffmpeg_path),
            WhisperApiClient::new(config.api_key.clone()),
            config.save_dir.clone(),
        );
        Self { pipeline }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/transcribe", post(transcribe))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "ok"})) }),
        )
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Audio Transcription</title></head>
<body>
<h1>Audio Transcription</h1>
<p>Upload an audio file to transcribe it with the Whisper API.
Long files are processed in 5-minute chunks. The transcript is saved
in the configured folder.</p>
<form action="/transcribe" method="post" enctype="multipart/form-data">
  <input type="file" name="audio" accept="audio/*" required>
  <button type="submit">Transcribe</button>
</form>
</body>
</html>
"#;

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn transcribe(State(state): State<Arc<AppState>>, multipart: Multipart) -> String {
    match handle_upload(&state, multipart).await {
        Ok(message) => message,
        Err(err) => {
            error!("Transcription request failed: {err:#}");
            format!("An error occurred: {err}")
        }
    }
}

async fn handle_upload(
    state: &AppState,
    mut multipart: Multipart,
) -> anyhow::Result<String> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("audio") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();

        // Streamed straight to disk: ffmpeg needs a seekable input file and
        // a whole recording must never sit in memory. The temp file is
        // removed on drop, whether the pipeline succeeds or not.
        let (upload, size) = spool_upload(field).await?;
        info!("Received upload {:?} ({} bytes)", filename, size);

        let outcome = state.pipeline.run(upload.path(), &filename).await?;

        let mut message = format!(
            "Transcription saved to: {}\n\nTranscript:\n{}",
            outcome.saved_path.display(),
            outcome.transcript
        );
        if !outcome.failures.is_empty() {
            message.push_str(&format!(
                "\n\nNote: {} of {} chunks could not be transcribed and were skipped.",
                outcome.failures.len(),
                outcome.chunk_count
            ));
        }
        return Ok(message);
    }

    anyhow::bail!("no audio file found in the upload")
}

/// Write a multipart field to a temp file chunk by chunk, returning the
/// file and the total byte count.
async fn spool_upload(
    mut field: Field<'_>,
) -> anyhow::Result<(tempfile::NamedTempFile, usize)> {
    let mut upload = tempfile::NamedTempFile::new()?;
    let mut size = 0usize;

    while let Some(data) = field.chunk().await? {
        size += data.len();
        upload.write_all(&data)?;
    }
    upload.flush()?;

    Ok((upload, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;
    use std::path::PathBuf;

    const BOUNDARY: &str = "test-boundary";

    fn upload_request(field_name: &str, filename: &str, payload: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{filename}\"\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn test_state() -> AppState {
        AppState::new(&Config {
            api_key: "sk-test".to_string(),
            save_dir: PathBuf::from("."),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            listen_addr: "127.0.0.1:0".to_string(),
        })
    }

    #[tokio::test]
    async fn test_spool_upload_streams_field_to_disk() {
        let payload: Vec<u8> = (0..128 * 1024).map(|i| (i % 251) as u8).collect();
        let request = upload_request("audio", "talk.mp3", &payload);

        let mut multipart = Multipart::from_request(request, &()).await.unwrap();
        let field = multipart.next_field().await.unwrap().unwrap();

        let (upload, size) = spool_upload(field).await.unwrap();

        assert_eq!(size, payload.len());
        assert_eq!(std::fs::read(upload.path()).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_upload_without_audio_field_is_rejected() {
        let request = upload_request("attachment", "notes.txt", b"not audio");
        let multipart = Multipart::from_request(request, &()).await.unwrap();

        let err = handle_upload(&test_state(), multipart).await.unwrap_err();

        assert!(err.to_string().contains("no audio file"));
    }
}
