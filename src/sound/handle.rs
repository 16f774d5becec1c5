//! Sound - one decoded WAV buffer plus its playback source

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use glam::Vec3;

use super::resource::{BufferResource, SourceParams, SourceResource};
use super::spatial::{create_spatial_source, SpatialSource};
use crate::audio::{decode_wav, decode_wav_bytes, BufferFormat, DecodedWav};
use crate::config::SourceConfig;
use crate::engine::backend::{AudioBackend, BufferId, SourceId, SourceSnapshot, SourceState};
use crate::error::{log_sound_error, SoundError};

/// A loaded sound bound to its own playback source.
///
/// Construction either fully succeeds (buffer uploaded, source bound and
/// parameterized) or fails without leaving anything allocated in the backend.
/// Dropping the sound stops and deletes its source and releases the buffer;
/// spatial sources created from it keep the buffer alive until they are
/// dropped too.
///
/// # Example
/// ```ignore
/// let sound = Sound::load(backend.clone(), "assets/jump.wav")?;
/// sound.play();
/// let echo = sound.spatial(Vec3::new(10.0, 5.0, 0.0))?;
/// echo.play();
/// ```
pub struct Sound {
    source: SourceResource,
    format: BufferFormat,
    sample_rate: u32,
    frames: usize,
    device_id: Option<u32>,
}

impl Sound {
    /// Load a WAV file with the default source parameters.
    ///
    /// # Errors
    /// - `SoundError::LoadFailed` if the file cannot be read or decoded
    /// - `SoundError::UnsupportedFormat` unless it is 8/16-bit mono or stereo
    /// - `SoundError::Backend` if the backend rejects the upload
    pub fn load<P: AsRef<Path>>(
        backend: Arc<dyn AudioBackend>,
        path: P,
    ) -> Result<Self, SoundError> {
        Self::load_with_config(backend, path, &SourceConfig::default())
    }

    /// Load a WAV file, binding the source with `config`.
    pub fn load_with_config<P: AsRef<Path>>(
        backend: Arc<dyn AudioBackend>,
        path: P,
        config: &SourceConfig,
    ) -> Result<Self, SoundError> {
        let decoded = decode_wav(path.as_ref()).inspect_err(|err| {
            log_sound_error(err, "load");
        })?;
        Self::from_decoded(backend, decoded, config)
    }

    /// Load a WAV image already in memory.
    pub fn from_wav_bytes(backend: Arc<dyn AudioBackend>, bytes: &[u8]) -> Result<Self, SoundError> {
        let decoded = decode_wav_bytes(bytes).inspect_err(|err| {
            log_sound_error(err, "load");
        })?;
        Self::from_decoded(backend, decoded, &SourceConfig::default())
    }

    fn from_decoded(
        backend: Arc<dyn AudioBackend>,
        decoded: DecodedWav,
        config: &SourceConfig,
    ) -> Result<Self, SoundError> {
        let format = BufferFormat::from_wav(&decoded.info).inspect_err(|err| {
            log_sound_error(err, "format");
        })?;
        let sample_rate = decoded.info.sample_rate;
        let frames = decoded.frames();

        let buffer = BufferResource::generate(&backend)?;
        let upload = backend.buffer_data(buffer.id(), format, &decoded.data, sample_rate);
        // The backend holds its own copy from here on
        drop(decoded);
        if let Err(err) = upload {
            log_sound_error(&err, "buffer_data");
            return Err(err);
        }

        let params = SourceParams {
            pitch: config.pitch,
            gain: config.gain,
            position: Vec3::from_array(config.position),
            velocity: Vec3::from_array(config.velocity),
        };
        let source = SourceResource::bind(Arc::new(buffer), &params)?;

        log::debug!(
            "[Sound] Loaded {:?} at {} Hz ({} frames) into {} / {}",
            format,
            sample_rate,
            frames,
            source.buffer().id(),
            source.id()
        );

        Ok(Self {
            source,
            format,
            sample_rate,
            frames,
            device_id: backend.device_id(),
        })
    }

    /// Restart from the beginning with looping off.
    pub fn play(&self) {
        self.source.play();
    }

    /// Play repeatedly until stopped or paused.
    pub fn play_looping(&self) {
        self.source.play_looping();
    }

    /// Hold the current position. `play` afterwards restarts from the
    /// beginning; `play_looping` resumes.
    pub fn pause(&self) {
        self.source.pause();
    }

    /// Halt and rewind.
    pub fn stop(&self) {
        self.source.stop();
    }

    /// Release the source and buffer now. Equivalent to dropping the sound.
    pub fn destroy(self) {
        drop(self);
    }

    /// New source at `position` (caller space) sharing this sound's buffer.
    pub fn spatial(&self, position: Vec3) -> Result<SpatialSource, SoundError> {
        create_spatial_source(self, position)
    }

    pub fn set_gain(&self, gain: f32) {
        self.source.set_gain(gain);
    }

    pub fn set_pitch(&self, pitch: f32) {
        self.source.set_pitch(pitch);
    }

    /// Move the sound's own source (backend space, no adaptation).
    pub fn set_position(&self, position: Vec3) {
        self.source.set_position(position);
    }

    pub fn state(&self) -> SourceState {
        self.source.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == SourceState::Playing
    }

    pub fn is_looping(&self) -> bool {
        self.snapshot().looping
    }

    pub fn gain(&self) -> f32 {
        self.snapshot().gain
    }

    pub fn pitch(&self) -> f32 {
        self.snapshot().pitch
    }

    pub fn position(&self) -> Vec3 {
        self.snapshot().position
    }

    pub fn snapshot(&self) -> SourceSnapshot {
        self.source.snapshot()
    }

    pub fn format(&self) -> BufferFormat {
        self.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn device_id(&self) -> Option<u32> {
        self.device_id
    }

    pub fn buffer_id(&self) -> BufferId {
        self.source.buffer().id()
    }

    pub fn source_id(&self) -> SourceId {
        self.source.id()
    }

    pub(crate) fn buffer(&self) -> &Arc<BufferResource> {
        self.source.buffer()
    }
}

impl fmt::Debug for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sound")
            .field("buffer", &self.buffer_id())
            .field("source", &self.source_id())
            .field("format", &self.format)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames)
            .finish()
    }
}
