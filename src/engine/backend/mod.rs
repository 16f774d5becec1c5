//! Backend abstractions for buffer/source audio APIs.
//!
//! An [`AudioBackend`] owns every buffer and source it hands out; callers
//! only hold the opaque ids. The sound layer wraps those ids in
//! resource-owning types so release is never paired by hand.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::audio::BufferFormat;
use crate::error::SoundError;

/// Opaque handle of an uploaded sample buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BufferId(pub u32);

/// Opaque handle of a playback source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u32);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Playback state of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SourceState {
    /// Never played (or rewound)
    #[default]
    Initial,
    Playing,
    Paused,
    Stopped,
}

/// Parameters of a source as seen by the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSnapshot {
    pub buffer: Option<BufferId>,
    pub pitch: f32,
    pub gain: f32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub looping: bool,
    pub state: SourceState,
}

impl Default for SourceSnapshot {
    fn default() -> Self {
        Self {
            buffer: None,
            pitch: 1.0,
            gain: 1.0,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            looping: false,
            state: SourceState::Initial,
        }
    }
}

/// Trait implemented by audio backends.
///
/// Allocation and upload report failures; parameter and transport calls are
/// fire-and-forget, and implementations log a warning for unknown handles.
///
/// Transport follows the usual buffer/source semantics:
/// - `play` on a paused source resumes, on a playing source restarts
/// - `stop` halts and rewinds
/// - `pause` holds the current position
pub trait AudioBackend: Send + Sync {
    fn gen_buffer(&self) -> Result<BufferId, SoundError>;
    fn buffer_data(
        &self,
        buffer: BufferId,
        format: BufferFormat,
        data: &[u8],
        frequency: u32,
    ) -> Result<(), SoundError>;
    fn delete_buffer(&self, buffer: BufferId);

    fn gen_source(&self) -> Result<SourceId, SoundError>;
    fn delete_source(&self, source: SourceId);

    fn set_source_buffer(&self, source: SourceId, buffer: Option<BufferId>);
    fn set_pitch(&self, source: SourceId, pitch: f32);
    fn set_gain(&self, source: SourceId, gain: f32);
    fn set_position(&self, source: SourceId, position: Vec3);
    fn set_velocity(&self, source: SourceId, velocity: Vec3);
    fn set_looping(&self, source: SourceId, looping: bool);

    fn play(&self, source: SourceId);
    fn pause(&self, source: SourceId);
    fn stop(&self, source: SourceId);

    fn source_state(&self, source: SourceId) -> SourceState;
    fn source_snapshot(&self, source: SourceId) -> Option<SourceSnapshot>;

    /// Device the backend renders to, when it knows one.
    fn device_id(&self) -> Option<u32> {
        None
    }
}

/// Validate an upload against the format's frame size.
///
/// Shared by backends so they reject the same inputs with the same codes.
pub(crate) fn validate_upload(
    format: BufferFormat,
    data: &[u8],
    frequency: u32,
) -> Result<(), i32> {
    use crate::error::BackendErrorCode;

    if frequency == 0 || data.len() % format.frame_size() != 0 {
        return Err(BackendErrorCode::INVALID_VALUE);
    }
    Ok(())
}

pub mod mixer;
mod stub;

pub use mixer::{Mixer, MixerBackend, OutputFormat};
pub use stub::{StubBackend, StubCall};
