// Spatial Sound - WAV playback handles over a pluggable audio backend
// Lock-free software mixer with a cpal output on desktop

// Module declarations
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod sound;

// Re-exports for convenience
pub use audio::{BufferFormat, SampleEncoding, WavInfo};
pub use config::AppConfig;
pub use engine::backend::{AudioBackend, MixerBackend, SourceState, StubBackend};
pub use error::{ErrorCode, SoundError, SoundErrorCodes};
pub use sound::{create_spatial_source, Sound, SpatialSource};

pub use glam::Vec3;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_public_surface() {
        let backend: Arc<dyn AudioBackend> = Arc::new(StubBackend::new());
        let err = Sound::load(backend, "missing.wav").unwrap_err();
        assert_eq!(err.code(), SoundErrorCodes::LOAD_FAILED);
    }
}
