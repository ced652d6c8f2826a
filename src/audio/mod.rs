pub mod compressor;
pub mod decoder;
pub mod waveform;

pub use compressor::{
    ChunkEncoder, EncodeError, EncodedChunk, Mp3Compressor, MP3_BITRATE, UPLOAD_LIMIT_BYTES,
};
pub use decoder::{AudioDecoder, DecodeError, FfmpegDecoder};
pub use waveform::{Waveform, SAMPLE_RATE};
