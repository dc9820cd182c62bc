//! SceneWorld - hecs world with stable IDs and typed components

use bimap::BiMap;
use hecs::Component;
use powder_core::{EntityId, PowderError, Result, Transform};

/// Human-readable label attached to every spawned entity
#[derive(Debug, Clone, PartialEq, Eq)]
struct Name(String);

/// The object registry shared by terrain streaming and the physics bridge
///
/// Wraps hecs::World with:
/// - Stable EntityId mapping
/// - A `Name` and `Transform` on every entity
/// - Typed component access by `EntityId`
/// - Raw hecs queries for bulk passes such as transform sync
pub struct SceneWorld {
    /// The underlying hecs world
    world: hecs::World,
    /// Bidirectional mapping: EntityId <-> hecs::Entity
    id_map: BiMap<EntityId, hecs::Entity>,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneWorld {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            world: hecs::World::new(),
            id_map: BiMap::new(),
        }
    }

    /// Spawn a new entity with a name at the given transform
    pub fn spawn_at(&mut self, name: impl Into<String>, transform: Transform) -> EntityId {
        let entity_id = EntityId::new();
        let hecs_entity = self.world.spawn((Name(name.into()), transform));
        self.id_map.insert(entity_id, hecs_entity);
        entity_id
    }

    /// Despawn an entity and all of its components
    pub fn despawn(&mut self, id: EntityId) -> Result<()> {
        let hecs_entity = self.entity(id)?;

        self.world
            .despawn(hecs_entity)
            .map_err(|_| PowderError::EntityNotFound(id.to_string()))?;
        self.id_map.remove_by_left(&id);

        Ok(())
    }

    /// Attach (or replace) a component on an entity
    pub fn insert<C: Component>(&mut self, id: EntityId, component: C) -> Result<()> {
        let hecs_entity = self.entity(id)?;
        self.world
            .insert_one(hecs_entity, component)
            .map_err(|_| PowderError::EntityNotFound(id.to_string()))
    }

    /// Borrow a component of an entity
    pub fn get<C: Component>(&self, id: EntityId) -> Option<hecs::Ref<'_, C>> {
        let hecs_entity = self.id_map.get_by_left(&id)?;
        self.world.get::<&C>(*hecs_entity).ok()
    }

    /// Check whether an entity carries a component
    pub fn has<C: Component>(&self, id: EntityId) -> bool {
        self.get::<C>(id).is_some()
    }

    /// Get entity name by ID
    pub fn get_name(&self, id: EntityId) -> Option<String> {
        self.get::<Name>(id).map(|n| n.0.clone())
    }

    /// Get the transform of an entity
    pub fn get_transform(&self, id: EntityId) -> Option<Transform> {
        self.get::<Transform>(id).map(|t| *t)
    }

    /// Mutable access to the hecs world for multi-component queries
    pub fn raw_mut(&mut self) -> &mut hecs::World {
        &mut self.world
    }

    /// Get number of entities
    pub fn entity_count(&self) -> usize {
        self.id_map.len()
    }

    /// Check if an entity exists
    pub fn contains(&self, id: EntityId) -> bool {
        self.id_map.contains_left(&id)
    }

    fn entity(&self, id: EntityId) -> Result<hecs::Entity> {
        self.id_map
            .get_by_left(&id)
            .copied()
            .ok_or_else(|| PowderError::EntityNotFound(id.to_string()))
    }
}
