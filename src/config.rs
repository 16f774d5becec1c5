//! Configuration management for the sound layer
//!
//! Runtime configuration loaded from JSON so source defaults, the spatial
//! coordinate adapter and mixer parameters can be tuned without
//! recompilation. Every section has defaults matching the built-in behavior.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub spatial: SpatialConfig,
    #[serde(default)]
    pub mixer: MixerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Parameters applied to the source a `Sound` binds at load time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub pitch: f32,
    pub gain: f32,
    /// Listener-space position, in front of the listener by default
    pub position: [f32; 3],
    pub velocity: [f32; 3],
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            gain: 1.0,
            position: [0.0, 0.0, -2.0],
            velocity: [0.0, 0.0, 0.0],
        }
    }
}

/// Coordinate adapter between caller space and backend listener space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Fixed depth every spatial source is placed at
    pub depth: f32,
    /// Caller space grows downward; backend space grows upward
    pub flip_vertical: bool,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            depth: -1.0,
            flip_vertical: true,
        }
    }
}

/// Software mixer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Capacity of the control → render command queue
    pub command_queue_size: usize,
    /// Capacity of the render → control event queue
    pub event_queue_size: usize,
    /// Number of voices the renderer reserves room for up front
    pub max_voices: usize,
    pub master_gain: f32,
    /// Distance under which no attenuation is applied
    pub reference_distance: f32,
    pub rolloff_factor: f32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            command_queue_size: 1024,
            event_queue_size: 1024,
            max_voices: 64,
            master_gain: 1.0,
            reference_distance: 1.0,
            rolloff_factor: 1.0,
        }
    }
}

/// Output device configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Fixed device buffer size in frames; device default when unset
    #[serde(default)]
    pub buffer_frames: Option<u32>,
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults when the file is missing or
    /// invalid (a warning is logged either way).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
