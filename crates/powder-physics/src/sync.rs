//! Synchronization between Rapier bodies and the scene registry

use crate::host::PhysicsBody;
use crate::world::PhysicsWorld;
use powder_core::Transform;
use powder_ecs::SceneWorld;
use powder_runtime::GameEvent;
use rapier3d::prelude::*;

/// Write Rapier poses back to the transforms of dynamic bodies.
///
/// Fixed colliders (chunks, trees, ramps) never move, so only dynamic
/// bodies are copied. Returns how many transforms were written.
pub fn sync_from_rapier(scene: &mut SceneWorld, physics: &PhysicsWorld) -> usize {
    let mut written = 0;
    for (_, (owned, transform)) in scene
        .raw_mut()
        .query_mut::<(&PhysicsBody, &mut Transform)>()
    {
        let Some(body) = owned.body.and_then(|h| physics.get_rigid_body(h)) else {
            continue;
        };
        if !body.is_dynamic() {
            continue;
        }

        let pos = body.translation();
        let rot = body.rotation();
        transform.position.x = pos.x;
        transform.position.y = pos.y;
        transform.position.z = pos.z;
        transform.rotation = [rot.i, rot.j, rot.k, rot.w];
        written += 1;
    }
    written
}

/// Drain Rapier's collision events and translate them to registry events.
///
/// Pairs where either collider has already been released are dropped.
pub fn collision_events(physics: &PhysicsWorld) -> Vec<GameEvent> {
    physics
        .drain_collision_events()
        .into_iter()
        .filter_map(|event| {
            let (h1, h2) = (event.collider1(), event.collider2());
            let entity_a = physics.entity_of(h1)?;
            let entity_b = physics.entity_of(h2)?;
            Some(match event {
                CollisionEvent::Started(..) => GameEvent::CollisionStarted { entity_a, entity_b },
                CollisionEvent::Stopped(..) => GameEvent::CollisionEnded { entity_a, entity_b },
            })
        })
        .collect()
}

/// Drain contact force events as impacts between registry objects.
///
/// Pairs where either collider has already been released are dropped.
pub fn impact_events(physics: &PhysicsWorld) -> Vec<GameEvent> {
    physics
        .drain_contact_force_events()
        .into_iter()
        .filter_map(|event| {
            Some(GameEvent::Impact {
                entity_a: physics.entity_of(event.collider1)?,
                entity_b: physics.entity_of(event.collider2)?,
                force: event.total_force_magnitude,
            })
        })
        .collect()
}
