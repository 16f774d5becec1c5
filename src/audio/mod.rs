// Audio module - WAV decoding and buffer format mapping

pub mod format;
pub mod wav;

// Re-export commonly used types for convenience
pub use format::{map_format, BufferFormat};
pub use wav::{decode_wav, decode_wav_bytes, DecodedWav, SampleEncoding, WavInfo};
