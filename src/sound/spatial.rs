//! Spatial sources sharing a loaded sound's buffer.
//!
//! Callers work in 2D screen coordinates where y grows downward. The backend
//! listener sits at the origin looking down -z, so positions are mapped as
//! `(x, -y, depth)` before they reach the backend.

use std::sync::Arc;

use glam::Vec3;

use super::handle::Sound;
use super::resource::{SourceParams, SourceResource};
use crate::config::SpatialConfig;
use crate::engine::backend::{SourceId, SourceSnapshot, SourceState};
use crate::error::SoundError;

/// Map a caller-space position into backend space.
///
/// The caller's z is ignored; every spatial source sits on the plane at
/// `config.depth`.
pub fn to_backend_position(position: Vec3, config: &SpatialConfig) -> Vec3 {
    let y = if config.flip_vertical {
        -position.y
    } else {
        position.y
    };
    Vec3::new(position.x, y, config.depth)
}

/// Create a new source bound to `sound`'s buffer at `position`.
///
/// The source starts with pitch 1, gain 1, zero velocity and looping off.
/// It is independent of the sound's own source and keeps the buffer alive
/// for as long as it exists.
pub fn create_spatial_source(sound: &Sound, position: Vec3) -> Result<SpatialSource, SoundError> {
    create_spatial_source_with_config(sound, position, &SpatialConfig::default())
}

pub fn create_spatial_source_with_config(
    sound: &Sound,
    position: Vec3,
    config: &SpatialConfig,
) -> Result<SpatialSource, SoundError> {
    let params = SourceParams {
        pitch: 1.0,
        gain: 1.0,
        position: to_backend_position(position, config),
        velocity: Vec3::ZERO,
    };
    let source = SourceResource::bind(Arc::clone(sound.buffer()), &params)?;

    log::debug!(
        "[Spatial] {} at {:?} -> {:?}",
        source.id(),
        position,
        params.position
    );

    Ok(SpatialSource { source })
}

/// Independent playback source created by [`create_spatial_source`].
pub struct SpatialSource {
    source: SourceResource,
}

impl SpatialSource {
    pub fn play(&self) {
        self.source.play();
    }

    pub fn play_looping(&self) {
        self.source.play_looping();
    }

    pub fn pause(&self) {
        self.source.pause();
    }

    pub fn stop(&self) {
        self.source.stop();
    }

    pub fn set_gain(&self, gain: f32) {
        self.source.set_gain(gain);
    }

    /// Move to a new caller-space position.
    pub fn set_position(&self, position: Vec3, config: &SpatialConfig) {
        self.source.set_position(to_backend_position(position, config));
    }

    pub fn state(&self) -> SourceState {
        self.source.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == SourceState::Playing
    }

    /// Backend-space position.
    pub fn position(&self) -> Vec3 {
        self.snapshot().position
    }

    pub fn snapshot(&self) -> SourceSnapshot {
        self.source.snapshot()
    }

    pub fn source_id(&self) -> SourceId {
        self.source.id()
    }
}

impl std::fmt::Debug for SpatialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialSource")
            .field("source", &self.source.id())
            .field("buffer", &self.source.buffer().id())
            .finish()
    }
}
