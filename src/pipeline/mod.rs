pub mod chunker;
pub mod runner;

pub use chunker::{Chunk, Chunker, CHUNK_DURATION_MS};
pub use runner::{
    ChunkFailure, FailedChunk, PipelineError, PipelineOutcome, TranscriptionPipeline,
};
