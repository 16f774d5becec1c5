//! Engine module housing the audio backends.
//!
//! This module exposes the trait-based backend layer (`backend`) and, on
//! desktop, the cpal output that drives the software mixer.

pub mod backend;
#[cfg(not(target_os = "android"))]
pub mod output;

pub use backend::{
    AudioBackend, BufferId, Mixer, MixerBackend, OutputFormat, SourceId, SourceSnapshot,
    SourceState, StubBackend, StubCall,
};
#[cfg(not(target_os = "android"))]
pub use output::CpalOutput;
