//! Transcript assembly and persistence.
//!
//! Fragments arrive tagged with their chunk's ordinal index; failed chunks
//! simply have no fragment. Assembly is a sort, a space-join, and a trim.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Transcribed text for one chunk, tagged with the chunk's ordinal index.
#[derive(Debug, Clone)]
pub struct TranscriptFragment {
    pub index: usize,
    pub text: String,
}

/// Join surviving fragments in ordinal order with a single space and trim.
pub fn assemble(mut fragments: Vec<TranscriptFragment>) -> String {
    fragments.sort_by_key(|f| f.index);
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("cannot write transcript to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Deterministic target path: `<save_dir>/<input_filename_stem>_transcript.txt`
pub fn target_path(save_dir: &Path, input_filename: &str) -> PathBuf {
    let stem = Path::new(input_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");
    save_dir.join(format!("{stem}_transcript.txt"))
}

/// Write the transcript as UTF-8, creating or overwriting the target file.
/// Returns the path written.
pub fn write_transcript(
    save_dir: &Path,
    input_filename: &str,
    transcript: &str,
) -> Result<PathBuf, WriteError> {
    let path = target_path(save_dir, input_filename);
    std::fs::write(&path, transcript).map_err(|source| WriteError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
