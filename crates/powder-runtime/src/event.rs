//! Game events

use powder_core::EntityId;

/// Events published by the simulation for cosmetic and debug consumers
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Two registered objects started touching
    CollisionStarted { entity_a: EntityId, entity_b: EntityId },
    /// Two registered objects stopped touching
    CollisionEnded { entity_a: EntityId, entity_b: EntityId },
    /// A contact pushed back harder than the skier's impact threshold (newtons)
    Impact {
        entity_a: EntityId,
        entity_b: EntityId,
        force: f32,
    },
    /// A terrain chunk became resident (built or rebuilt)
    ChunkLoaded { x: i32, z: i32 },
    /// A terrain chunk was released
    ChunkRetired { x: i32, z: i32 },
    /// The skier left the ground under its own jump impulse
    Jumped,
    /// A boost impulse was applied
    Boosted,
    /// The skier touched down after being airborne
    Landed,
    /// The skier lost ground contact
    Airborne,
}
