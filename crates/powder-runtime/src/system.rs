//! Runtime system trait

use powder_core::{EntityId, Result};
use powder_ecs::SceneWorld;

/// A system that can be ticked by the game loop
///
/// Every hook has a no-op default so a system only spells out the parts of
/// the lifecycle it cares about. Fixed update runs at a constant rate
/// (physics), while update runs once per rendered frame.
pub trait RuntimeSystem {
    /// Called once before the first frame
    fn initialize(&mut self, _world: &mut SceneWorld) -> Result<()> {
        Ok(())
    }

    /// Called at a fixed rate (e.g. 60Hz) for deterministic simulation
    fn fixed_update(&mut self, _world: &mut SceneWorld, _dt: f64) -> Result<()> {
        Ok(())
    }

    /// Called once per frame for variable-rate logic
    fn update(&mut self, _world: &mut SceneWorld, _dt: f64) -> Result<()> {
        Ok(())
    }

    /// Called when two registered objects start touching
    fn on_collision(&mut self, _world: &mut SceneWorld, _a: EntityId, _b: EntityId) {}

    /// Called when the system is being shut down
    fn shutdown(&mut self, _world: &mut SceneWorld) -> Result<()> {
        Ok(())
    }

    /// Human-readable name for this system
    fn name(&self) -> &str;
}
