//! The seam between terrain streaming and whatever owns colliders and props

use crate::chunk::TerrainChunk;
use crate::scatter::ScatterProp;
use powder_core::{EntityId, Result};

/// Owner of the objects a chunk materializes.
///
/// The chunk store hands every built chunk and every scattered prop to the
/// host and keeps the returned handles so it can release them when the
/// chunk is retired or rebuilt.
pub trait TerrainHost {
    /// Create the ground object (collider, mesh) for a freshly built chunk
    fn attach_chunk(&mut self, chunk: &TerrainChunk) -> Result<EntityId>;

    /// The chunk's vertices changed in place (deformation)
    fn refresh_chunk(&mut self, handle: EntityId, chunk: &TerrainChunk) -> Result<()>;

    /// Create an obstacle scattered on a chunk
    fn attach_prop(&mut self, prop: &ScatterProp) -> Result<EntityId>;

    /// Destroy an object previously returned by `attach_*`
    fn release(&mut self, handle: EntityId) -> Result<()>;
}
