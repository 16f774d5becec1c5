//! Resource-owning wrappers around backend handles.
//!
//! Acquire on construction, release on drop. A [`SourceResource`] is stopped
//! and deleted when dropped; a [`BufferResource`] is deleted when the last
//! `Arc` to it goes away, so every source that plays it must be dropped first.

use std::sync::Arc;

use glam::Vec3;

use crate::engine::backend::{AudioBackend, BufferId, SourceId, SourceSnapshot, SourceState};
use crate::error::SoundError;

/// Uploaded buffer owned through reference counting
pub(crate) struct BufferResource {
    backend: Arc<dyn AudioBackend>,
    id: BufferId,
}

impl BufferResource {
    pub fn generate(backend: &Arc<dyn AudioBackend>) -> Result<Self, SoundError> {
        let id = backend.gen_buffer()?;
        Ok(Self {
            backend: Arc::clone(backend),
            id,
        })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn backend(&self) -> &Arc<dyn AudioBackend> {
        &self.backend
    }
}

impl Drop for BufferResource {
    fn drop(&mut self) {
        log::trace!("[Sound] Releasing {}", self.id);
        self.backend.delete_buffer(self.id);
    }
}

/// Playback source bound to a shared buffer.
///
/// The source is deleted before the buffer reference it holds is released.
pub(crate) struct SourceResource {
    backend: Arc<dyn AudioBackend>,
    id: SourceId,
    buffer: Arc<BufferResource>,
}

/// Initial parameters for a new source
pub(crate) struct SourceParams {
    pub pitch: f32,
    pub gain: f32,
    pub position: Vec3,
    pub velocity: Vec3,
}

impl SourceResource {
    /// Allocate a source, bind `buffer` and apply `params` with looping off.
    pub fn bind(buffer: Arc<BufferResource>, params: &SourceParams) -> Result<Self, SoundError> {
        let backend = Arc::clone(buffer.backend());
        let id = backend.gen_source()?;
        let source = Self {
            backend,
            id,
            buffer,
        };

        let backend = &source.backend;
        backend.set_source_buffer(id, Some(source.buffer.id()));
        backend.set_pitch(id, params.pitch);
        backend.set_gain(id, params.gain);
        backend.set_position(id, params.position);
        backend.set_velocity(id, params.velocity);
        backend.set_looping(id, false);

        Ok(source)
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn buffer(&self) -> &Arc<BufferResource> {
        &self.buffer
    }

    /// Rewind and play from the first frame, looping off.
    pub fn play(&self) {
        self.backend.set_looping(self.id, false);
        self.backend.stop(self.id);
        self.backend.play(self.id);
    }

    /// Pause, enable looping, play (a paused source resumes where it was).
    pub fn play_looping(&self) {
        self.backend.pause(self.id);
        self.backend.set_looping(self.id, true);
        self.backend.play(self.id);
    }

    pub fn pause(&self) {
        self.backend.pause(self.id);
    }

    pub fn stop(&self) {
        self.backend.stop(self.id);
    }

    pub fn set_gain(&self, gain: f32) {
        self.backend.set_gain(self.id, gain);
    }

    pub fn set_pitch(&self, pitch: f32) {
        self.backend.set_pitch(self.id, pitch);
    }

    pub fn set_position(&self, position: Vec3) {
        self.backend.set_position(self.id, position);
    }

    pub fn state(&self) -> SourceState {
        self.backend.source_state(self.id)
    }

    pub fn snapshot(&self) -> SourceSnapshot {
        self.backend.source_snapshot(self.id).unwrap_or_default()
    }
}

impl Drop for SourceResource {
    fn drop(&mut self) {
        log::trace!("[Sound] Releasing {}", self.id);
        self.backend.stop(self.id);
        self.backend.delete_source(self.id);
    }
}
