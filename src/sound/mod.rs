//! Sound handles and spatial sources built on an [`AudioBackend`].
//!
//! [`AudioBackend`]: crate::engine::backend::AudioBackend

mod handle;
mod resource;
pub mod spatial;

pub use handle::Sound;
pub use spatial::{
    create_spatial_source, create_spatial_source_with_config, to_backend_position, SpatialSource,
};
