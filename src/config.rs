//! Startup configuration loaded from the process environment.
//!
//! All settings are validated eagerly; every missing or invalid value is
//! reported in a single aggregated error so the operator can fix them in
//! one pass.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Default listen address for the web UI
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:7860";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Resolved runtime configuration, constructed once and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI API key used for the Whisper transcription calls
    pub api_key: String,
    /// Directory transcripts are written to
    pub save_dir: PathBuf,
    /// ffmpeg executable, either an explicit path or a name resolved via PATH
    pub ffmpeg_path: PathBuf,
    /// Address the web UI listens on
    pub listen_addr: String,
}

impl Config {
    /// Load and validate configuration from the environment.
    ///
    /// Required: `OPENAI_API_KEY`, `TRANSCRIPT_SAVE_DIR`.
    /// Optional: `FFMPEG_PATH` (defaults to `ffmpeg` on PATH),
    /// `LISTEN_ADDR` (defaults to 127.0.0.1:7860).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut problems: Vec<String> = Vec::new();

        let api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        if api_key.trim().is_empty() {
            problems.push("OPENAI_API_KEY is not set".to_string());
        }

        let save_dir = env::var("TRANSCRIPT_SAVE_DIR").unwrap_or_default();
        if save_dir.is_empty() {
            problems.push("TRANSCRIPT_SAVE_DIR is not set".to_string());
        } else if !Path::new(&save_dir).is_dir() {
            problems.push(format!(
                "TRANSCRIPT_SAVE_DIR is not an existing directory: {save_dir}"
            ));
        }

        let ffmpeg_path = env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string());
        if let Err(reason) = probe_executable(&ffmpeg_path) {
            problems.push(format!("FFMPEG_PATH is not a runnable ffmpeg: {reason}"));
        }

        let listen_addr =
            env::var("LISTEN_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
        if listen_addr.parse::<std::net::SocketAddr>().is_err() {
            problems.push(format!("LISTEN_ADDR is not a valid socket address: {listen_addr}"));
        }

        if !problems.is_empty() {
            return Err(ConfigError::Invalid(problems.join("; ")));
        }

        Ok(Self {
            api_key,
            save_dir: PathBuf::from(save_dir),
            ffmpeg_path: PathBuf::from(ffmpeg_path),
            listen_addr,
        })
    }
}

/// Spawn `<tool> -version` to confirm the tool exists and is executable.
/// A bare name exercises the same PATH lookup the pipeline will use later,
/// so a machine without ffmpeg fails here instead of on the first upload.
fn probe_executable(path: &str) -> Result<(), String> {
    Command::new(path)
        .arg("-version")
        .output()
        .map(|_| ())
        .map_err(|e| format!("{path}: {e}"))
}
