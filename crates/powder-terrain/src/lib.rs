//! Powder Terrain - Procedural slope generation and chunk streaming
//!
//! Provides a seeded height function, chunked mesh generation with shading
//! normals and runtime deformation, obstacle scattering, and a chunk store
//! that pages terrain in and out around a focus point. Does not depend on
//! physics: colliders and props are handed to a `TerrainHost`.

pub mod chunk;
pub mod height_field;
pub mod host;
pub mod noise;
pub mod scatter;
pub mod store;

pub use chunk::{ChunkKey, Lod, TerrainChunk};
pub use height_field::{HeightField, HeightFieldParams, ValleyParams};
pub use host::TerrainHost;
pub use scatter::{scatter, PropKind, ScatterConfig, ScatterProp, ScatterRule};
pub use store::{ChunkStore, StampParams, StreamingConfig, UpdateReport};
