//! Rapier-backed owner of chunk colliders, props, and the skier body

use crate::world::{
    to_vector, PhysicsWorld, DEBRIS_GROUP, OBSTACLE_GROUP, PLAYER_GROUP, TERRAIN_GROUP,
};
use powder_core::{EntityId, PowderError, Result, Transform, Vec3};
use powder_ecs::SceneWorld;
use powder_terrain::{ChunkKey, PropKind, ScatterProp, TerrainChunk, TerrainHost};
use rapier3d::na::{DMatrix, Translation3, UnitQuaternion};
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

/// Tree trunk radius at scale 1
pub const TREE_RADIUS: f32 = 0.6;
/// Tree trunk height at scale 1
pub const TREE_HEIGHT: f32 = 3.0;
/// Ramp half extents at scale 1
pub const RAMP_HALF_EXTENTS: [f32; 3] = [1.5, 0.2, 1.0];
/// Ramp kick angle; the leading edge points down the local -X axis
pub const RAMP_PITCH: f32 = -std::f32::consts::PI / 9.0;
/// Snowball mass per unit radius
pub const SNOWBALL_MASS_PER_RADIUS: f32 = 2.5;

/// Physics handles owned by a registry object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsBody {
    /// Absent for colliders fixed in world space
    pub body: Option<RigidBodyHandle>,
    pub collider: ColliderHandle,
}

/// Marks the ground object of a terrain chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkTag(pub ChunkKey);

/// Marks a scattered obstacle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropTag(pub PropKind);

/// Marks the player's body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skier;

/// Shape and material of the skier's body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkierBodyConfig {
    pub mass: f32,
    /// Capsule cylinder half height; with the radius this sets the foot offset
    pub half_height: f32,
    pub radius: f32,
    pub friction: f32,
    pub linear_damping: f32,
    /// Contact force in newtons above which a hit is reported as an impact
    pub impact_threshold: f32,
}

impl Default for SkierBodyConfig {
    fn default() -> Self {
        Self {
            mass: 2.0,
            half_height: 0.55,
            radius: 0.4,
            friction: 0.05,
            linear_damping: 0.0,
            impact_threshold: 400.0,
        }
    }
}

impl SkierBodyConfig {
    /// Distance from the body center to the bottom of the capsule
    pub fn foot_offset(&self) -> f32 {
        self.half_height + self.radius
    }
}

fn tag(id: EntityId) -> u128 {
    id.raw() as u128
}

fn isometry(position: Vec3, rotation: UnitQuaternion<Real>) -> Isometry<Real> {
    Isometry::from_parts(Translation3::new(position.x, position.y, position.z), rotation)
}

fn quat_array(q: &UnitQuaternion<Real>) -> [f32; 4] {
    [q.i, q.j, q.k, q.w]
}

/// Rotation taking world up onto `up`, then turning `yaw` about it
fn prop_rotation(up: Vec3, yaw: f32) -> UnitQuaternion<Real> {
    let align = up
        .try_normalized(1e-6)
        .and_then(|up| UnitQuaternion::rotation_between(&Vector::y(), &to_vector(up)))
        .unwrap_or_else(UnitQuaternion::identity);
    align * UnitQuaternion::from_axis_angle(&Vector::y_axis(), yaw)
}

/// Heightfield shape for a chunk, centered on the chunk's footprint
fn chunk_shape(chunk: &TerrainChunk) -> (DMatrix<Real>, Vector<Real>) {
    let (edge, heights) = chunk.height_grid();
    // Rows run along Z and columns along X, as in the vertex grid
    let matrix = DMatrix::from_fn(edge, edge, |row, col| heights[row * edge + col]);
    (matrix, vector![chunk.size, 1.0, chunk.size])
}

/// Hands terrain chunks and props to Rapier and registers them in the scene
pub struct PhysicsHost<'a> {
    pub scene: &'a mut SceneWorld,
    pub physics: &'a mut PhysicsWorld,
}

impl<'a> PhysicsHost<'a> {
    pub fn new(scene: &'a mut SceneWorld, physics: &'a mut PhysicsWorld) -> Self {
        Self { scene, physics }
    }

    fn register(
        &mut self,
        name: String,
        transform: Transform,
        body: Option<RigidBodyHandle>,
        collider: ColliderHandle,
    ) -> Result<EntityId> {
        let id = self.scene.spawn_at(name, transform);
        if let Some(c) = self.physics.collider_set.get_mut(collider) {
            c.user_data = tag(id);
        }
        self.scene.insert(id, PhysicsBody { body, collider })?;
        Ok(id)
    }

    fn attach_tree(&mut self, prop: &ScatterProp) -> Result<EntityId> {
        let half_height = TREE_HEIGHT * 0.5 * prop.scale;
        let center = prop.position + Vec3::UP * half_height;
        let rotation = prop_rotation(Vec3::UP, prop.yaw);

        let collider = ColliderBuilder::cylinder(half_height, TREE_RADIUS * prop.scale)
            .position(isometry(center, rotation))
            .collision_groups(InteractionGroups::new(OBSTACLE_GROUP, Group::ALL))
            .friction(0.4)
            .build();
        let handle = self.physics.insert_collider(collider);

        let transform = Transform::from_position(center)
            .with_rotation(quat_array(&rotation))
            .with_scale(Vec3::new(prop.scale, prop.scale, prop.scale));
        self.register("tree".into(), transform, None, handle)
    }

    fn attach_ramp(&mut self, prop: &ScatterProp) -> Result<EntityId> {
        let [hx, hy, hz] = RAMP_HALF_EXTENTS;
        let s = prop.scale;
        let rotation = prop_rotation(prop.up, prop.yaw)
            * UnitQuaternion::from_axis_angle(&Vector::x_axis(), RAMP_PITCH);

        let collider = ColliderBuilder::cuboid(hx * s, hy * s, hz * s)
            .position(isometry(prop.position, rotation))
            .collision_groups(InteractionGroups::new(OBSTACLE_GROUP, Group::ALL))
            .friction(0.05)
            .build();
        let handle = self.physics.insert_collider(collider);

        let transform = Transform::from_position(prop.position)
            .with_rotation(quat_array(&rotation))
            .with_scale(Vec3::new(s, s, s));
        self.register("ramp".into(), transform, None, handle)
    }

    fn attach_snowball(&mut self, prop: &ScatterProp) -> Result<EntityId> {
        let radius = prop.scale.max(0.05);
        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(prop.position))
            .additional_mass(radius * SNOWBALL_MASS_PER_RADIUS)
            .linear_damping(0.15)
            .angular_damping(0.3)
            .build();
        let body_handle = self.physics.insert_rigid_body(body);

        let collider = ColliderBuilder::ball(radius)
            .density(0.0)
            .collision_groups(InteractionGroups::new(DEBRIS_GROUP, Group::ALL))
            .friction(0.6)
            .build();
        let collider_handle = self.physics.insert_collider_with_parent(collider, body_handle);

        let transform = Transform::from_position(prop.position)
            .with_scale(Vec3::new(radius, radius, radius));
        self.register("snowball".into(), transform, Some(body_handle), collider_handle)
    }

    /// Create the skier's capsule body standing with its feet at `feet`.
    ///
    /// Rotation is locked; the controller sets heading directly.
    pub fn spawn_skier(
        &mut self,
        config: &SkierBodyConfig,
        feet: Vec3,
        yaw: f32,
    ) -> Result<(EntityId, RigidBodyHandle)> {
        let center = feet + Vec3::UP * config.foot_offset();
        let rotation = UnitQuaternion::from_axis_angle(&Vector::y_axis(), yaw);

        let body = RigidBodyBuilder::dynamic()
            .position(isometry(center, rotation))
            .lock_rotations()
            .ccd_enabled(true)
            .additional_mass(config.mass)
            .linear_damping(config.linear_damping)
            .build();
        let body_handle = self.physics.insert_rigid_body(body);

        let collider = ColliderBuilder::capsule_y(config.half_height, config.radius)
            .density(0.0)
            .friction(config.friction)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .collision_groups(InteractionGroups::new(PLAYER_GROUP, Group::ALL))
            .active_events(ActiveEvents::COLLISION_EVENTS | ActiveEvents::CONTACT_FORCE_EVENTS)
            .contact_force_event_threshold(config.impact_threshold)
            .build();
        let collider_handle = self.physics.insert_collider_with_parent(collider, body_handle);

        let colliders = &self.physics.collider_set;
        let rb = self
            .physics
            .rigid_body_set
            .get_mut(body_handle)
            .ok_or_else(|| PowderError::Physics("skier body vanished on insert".into()))?;
        rb.recompute_mass_properties_from_colliders(colliders);

        let transform = Transform::from_position(center).with_rotation(Transform::yaw_rotation(yaw));
        let id = self.register("skier".into(), transform, Some(body_handle), collider_handle)?;
        self.scene.insert(id, Skier)?;
        tracing::debug!("Spawned skier {} at {:?}", id, center);
        Ok((id, body_handle))
    }
}

impl TerrainHost for PhysicsHost<'_> {
    fn attach_chunk(&mut self, chunk: &TerrainChunk) -> Result<EntityId> {
        if chunk.indices.is_empty() {
            return Err(PowderError::Physics(format!(
                "chunk {} has no triangles",
                chunk.key
            )));
        }
        let (heights, scale) = chunk_shape(chunk);
        let center = chunk.key.center(chunk.size);
        let collider = ColliderBuilder::heightfield(heights, scale)
            .translation(to_vector(center))
            .collision_groups(InteractionGroups::new(TERRAIN_GROUP, Group::ALL))
            .friction(0.02)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .build();
        let handle = self.physics.insert_collider(collider);

        let id = self.register(
            format!("chunk {}", chunk.key),
            Transform::from_position(center),
            None,
            handle,
        )?;
        self.scene.insert(id, ChunkTag(chunk.key))?;
        Ok(id)
    }

    fn refresh_chunk(&mut self, handle: EntityId, chunk: &TerrainChunk) -> Result<()> {
        let collider = self
            .scene
            .get::<PhysicsBody>(handle)
            .map(|b| b.collider)
            .ok_or_else(|| PowderError::ComponentMissing {
                entity: handle.to_string(),
                component: "PhysicsBody".into(),
            })?;

        let (heights, scale) = chunk_shape(chunk);
        if self
            .physics
            .set_collider_shape(collider, SharedShape::heightfield(heights, scale))
        {
            Ok(())
        } else {
            Err(PowderError::Physics(format!(
                "collider for chunk {} is gone",
                chunk.key
            )))
        }
    }

    fn attach_prop(&mut self, prop: &ScatterProp) -> Result<EntityId> {
        if !prop.position.is_finite() {
            return Err(PowderError::Physics(format!(
                "{} placed at a non-finite position",
                prop.kind.as_str()
            )));
        }
        let id = match prop.kind {
            PropKind::Tree => self.attach_tree(prop)?,
            PropKind::Ramp => self.attach_ramp(prop)?,
            PropKind::Snowball => self.attach_snowball(prop)?,
        };
        self.scene.insert(id, PropTag(prop.kind))?;
        Ok(id)
    }

    fn release(&mut self, handle: EntityId) -> Result<()> {
        let owned = self.scene.get::<PhysicsBody>(handle).map(|b| *b);
        match owned {
            Some(PhysicsBody {
                body: Some(body), ..
            }) => self.physics.remove_rigid_body(body),
            Some(PhysicsBody {
                body: None,
                collider,
            }) => self.physics.remove_collider(collider),
            None => {}
        }
        self.scene.despawn(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::QueryLayer;
    use powder_terrain::{HeightField, HeightFieldParams, Lod};

    fn flat_chunk() -> TerrainChunk {
        let field = HeightField::new(HeightFieldParams::flat(0.0));
        TerrainChunk::build(&field, ChunkKey::new(0, 0), Lod::Low, 32.0, 8)
    }

    fn prop(kind: PropKind, position: Vec3) -> ScatterProp {
        ScatterProp {
            kind,
            position,
            up: Vec3::UP,
            yaw: 0.3,
            scale: 1.0,
            min_spacing: 2.0,
        }
    }

    #[test]
    fn chunk_collider_is_tagged_and_queryable() {
        let mut scene = SceneWorld::new();
        let mut physics = PhysicsWorld::new();
        let id = {
            let mut host = PhysicsHost::new(&mut scene, &mut physics);
            host.attach_chunk(&flat_chunk()).unwrap()
        };
        physics.refresh_queries();

        assert!(scene.has::<ChunkTag>(id));
        assert_eq!(scene.get_name(id).as_deref(), Some("chunk (0, 0)"));
        let owned = *scene.get::<PhysicsBody>(id).unwrap();
        assert_eq!(owned.body, None);
        assert_eq!(physics.entity_of(owned.collider), Some(id));
        let hit = physics
            .cast_ray(Vec3::new(3.0, 2.0, -4.0), Vec3::DOWN, 5.0, QueryLayer::Terrain)
            .unwrap();
        assert!(hit.point.y.abs() < 1e-4);
        assert_eq!(hit.entity, Some(id));
    }

    /// Height of the mesh triangle under (x, z), by barycentric interpolation
    fn mesh_height(chunk: &TerrainChunk, x: f32, z: f32) -> Option<f32> {
        chunk.indices.chunks_exact(3).find_map(|tri| {
            let [a, b, c] = [0, 1, 2].map(|k| chunk.positions[tri[k] as usize]);
            let det = (b[2] - c[2]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[2] - c[2]);
            let wa = ((b[2] - c[2]) * (x - c[0]) + (c[0] - b[0]) * (z - c[2])) / det;
            let wb = ((c[2] - a[2]) * (x - c[0]) + (a[0] - c[0]) * (z - c[2])) / det;
            let wc = 1.0 - wa - wb;
            (wa >= -1e-5 && wb >= -1e-5 && wc >= -1e-5).then(|| wa * a[1] + wb * b[1] + wc * c[1])
        })
    }

    fn collider_height(physics: &PhysicsWorld, x: f32, z: f32) -> f32 {
        physics
            .cast_ray(Vec3::new(x, 100.0, z), Vec3::DOWN, 200.0, QueryLayer::Terrain)
            .map(|h| h.point.y)
            .unwrap()
    }

    #[test]
    fn raised_corner_matches_mesh_triangles() {
        let field = HeightField::new(HeightFieldParams::flat(0.0));
        let mut chunk = TerrainChunk::build(&field, ChunkKey::new(0, 0), Lod::Low, 2.0, 2);
        // Lift only the middle vertex, so no cell is planar
        let middle = chunk.positions.iter().position(|p| p[0] == 0.0 && p[2] == 0.0).unwrap();
        chunk.positions[middle][1] = 1.0;

        let mut scene = SceneWorld::new();
        let mut physics = PhysicsWorld::new();
        PhysicsHost::new(&mut scene, &mut physics)
            .attach_chunk(&chunk)
            .unwrap();
        physics.refresh_queries();

        // Points on both sides of every cell's diagonal
        for (x, z) in [
            (0.5, -0.5),
            (0.25, -0.6),
            (0.7, -0.2),
            (-0.3, 0.6),
            (-0.75, 0.2),
            (0.4, 0.4),
            (-0.5, -0.2),
            (-0.2, -0.5),
        ] {
            let expected = mesh_height(&chunk, x, z).unwrap();
            let got = collider_height(&physics, x, z);
            assert!(
                (got - expected).abs() < 1e-4,
                "at ({}, {}) collider {} mesh {}",
                x,
                z,
                got,
                expected
            );
        }
        // The tr-bl split puts (0.5, -0.5) halfway up the raised edge
        assert!((collider_height(&physics, 0.5, -0.5) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn noisy_chunk_matches_mesh_triangles() {
        let field = HeightField::new(HeightFieldParams::default());
        let chunk = TerrainChunk::build(&field, ChunkKey::new(1, -2), Lod::High, 32.0, 8);
        let mut scene = SceneWorld::new();
        let mut physics = PhysicsWorld::new();
        PhysicsHost::new(&mut scene, &mut physics)
            .attach_chunk(&chunk)
            .unwrap();
        physics.refresh_queries();

        let origin = chunk.positions[0];
        let step = 32.0 / 8.0;
        for qz in 0..8 {
            for qx in 0..8 {
                for (fx, fz) in [(0.3, 0.8), (0.8, 0.3), (0.2, 0.2), (0.9, 0.9)] {
                    let x = origin[0] + (qx as f32 + fx) * step;
                    let z = origin[2] + (qz as f32 + fz) * step;
                    let expected = mesh_height(&chunk, x, z).unwrap();
                    let got = collider_height(&physics, x, z);
                    assert!(
                        (got - expected).abs() < 2e-3,
                        "at ({}, {}) collider {} mesh {}",
                        x,
                        z,
                        got,
                        expected
                    );
                }
            }
        }
    }

    #[test]
    fn refreshed_chunk_moves_its_surface() {
        let mut scene = SceneWorld::new();
        let mut physics = PhysicsWorld::new();
        let mut chunk = flat_chunk();
        let id = PhysicsHost::new(&mut scene, &mut physics)
            .attach_chunk(&chunk)
            .unwrap();

        for p in chunk.positions.iter_mut() {
            p[1] -= 0.5;
        }
        PhysicsHost::new(&mut scene, &mut physics)
            .refresh_chunk(id, &chunk)
            .unwrap();
        physics.refresh_queries();

        let hit = physics
            .cast_ray(Vec3::new(1.0, 2.0, 1.0), Vec3::DOWN, 5.0, QueryLayer::Terrain)
            .unwrap();
        assert!((hit.point.y + 0.5).abs() < 1e-4);
    }

    #[test]
    fn props_land_in_their_groups() {
        let mut scene = SceneWorld::new();
        let mut physics = PhysicsWorld::new();
        let mut host = PhysicsHost::new(&mut scene, &mut physics);

        let tree = host.attach_prop(&prop(PropKind::Tree, Vec3::new(0.0, 0.0, 0.0))).unwrap();
        let ramp = host.attach_prop(&prop(PropKind::Ramp, Vec3::new(10.0, 0.2, 0.0))).unwrap();
        let ball = host
            .attach_prop(&prop(PropKind::Snowball, Vec3::new(-10.0, 1.0, 0.0)))
            .unwrap();
        drop(host);
        physics.refresh_queries();

        assert_eq!(scene.get::<PropTag>(tree).map(|t| t.0), Some(PropKind::Tree));
        let hit = physics
            .cast_ray(Vec3::new(0.0, 10.0, 0.0), Vec3::DOWN, 20.0, QueryLayer::Walkable)
            .unwrap();
        assert!((hit.point.y - TREE_HEIGHT).abs() < 1e-3);
        assert_eq!(hit.entity, Some(tree));
        assert!(physics
            .cast_ray(Vec3::new(0.0, 10.0, 0.0), Vec3::DOWN, 20.0, QueryLayer::Terrain)
            .is_none());

        assert!(physics
            .cast_ray(Vec3::new(10.0, 5.0, 0.0), Vec3::DOWN, 10.0, QueryLayer::Walkable)
            .is_some_and(|h| h.entity == Some(ramp)));

        // Snowballs are debris, never ground
        assert!(physics
            .cast_ray(Vec3::new(-10.0, 5.0, 0.0), Vec3::DOWN, 10.0, QueryLayer::Walkable)
            .is_none());
        let body = scene.get::<PhysicsBody>(ball).unwrap().body.unwrap();
        assert!(physics.get_rigid_body(body).unwrap().is_dynamic());
    }

    #[test]
    fn release_removes_physics_and_registry_entry() {
        let mut scene = SceneWorld::new();
        let mut physics = PhysicsWorld::new();
        let mut host = PhysicsHost::new(&mut scene, &mut physics);

        let chunk = host.attach_chunk(&flat_chunk()).unwrap();
        let ball = host
            .attach_prop(&prop(PropKind::Snowball, Vec3::new(0.0, 3.0, 0.0)))
            .unwrap();
        host.release(chunk).unwrap();
        host.release(ball).unwrap();
        drop(host);

        assert_eq!(scene.entity_count(), 0);
        assert_eq!(physics.collider_set.len(), 0);
        assert_eq!(physics.rigid_body_set.len(), 0);
        assert!(PhysicsHost::new(&mut scene, &mut physics).release(ball).is_err());
    }

    #[test]
    fn skier_spawns_standing_on_its_feet() {
        let mut scene = SceneWorld::new();
        let mut physics = PhysicsWorld::new();
        let config = SkierBodyConfig::default();
        let (id, handle) = PhysicsHost::new(&mut scene, &mut physics)
            .spawn_skier(&config, Vec3::new(0.0, 1.0, 0.0), 0.0)
            .unwrap();

        assert!(scene.has::<Skier>(id));
        let body = physics.get_rigid_body(handle).unwrap();
        assert!((body.translation().y - 1.95).abs() < 1e-5);
        assert!((body.mass() - config.mass).abs() < 1e-3);
        assert!((config.foot_offset() - 0.95).abs() < 1e-6);
    }
}
