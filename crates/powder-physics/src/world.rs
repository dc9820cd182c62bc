//! Physics world wrapping Rapier 3D

use powder_core::{EntityId, Vec3};
use rapier3d::prelude::*;

/// Streamed terrain meshes
pub const TERRAIN_GROUP: Group = Group::GROUP_1;
/// Static obstacles the skier can stand on (trees, ramps)
pub const OBSTACLE_GROUP: Group = Group::GROUP_2;
/// The skier's own collider; never probed
pub const PLAYER_GROUP: Group = Group::GROUP_3;
/// Loose dynamic props (snowballs)
pub const DEBRIS_GROUP: Group = Group::GROUP_4;

/// Which colliders a downward query considers ground
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryLayer {
    /// Terrain plus static obstacles
    Walkable,
    /// Terrain meshes only
    Terrain,
}

impl QueryLayer {
    pub fn groups(&self) -> InteractionGroups {
        let targets = match self {
            QueryLayer::Walkable => TERRAIN_GROUP | OBSTACLE_GROUP,
            QueryLayer::Terrain => TERRAIN_GROUP,
        };
        InteractionGroups::new(Group::ALL, targets)
    }
}

pub fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

pub fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn to_point(v: Vec3) -> Point<Real> {
    point![v.x, v.y, v.z]
}

/// Closest hit of a ray query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    /// Unit normal facing back toward the ray origin
    pub normal: Vec3,
    /// Distance from the ray origin
    pub distance: f32,
    /// Registry object owning the hit collider, if any
    pub entity: Option<EntityId>,
}

/// Wraps Rapier's physics pipeline and body/collider sets
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    /// Colliders changed since the query pipeline was last rebuilt
    queries_dirty: bool,

    /// Collision and contact force events from the last step
    collision_recv: crossbeam::channel::Receiver<CollisionEvent>,
    contact_force_recv: crossbeam::channel::Receiver<ContactForceEvent>,
    event_handler: ChannelEventCollector,
}

impl PhysicsWorld {
    /// Create a new physics world with standard gravity
    pub fn new() -> Self {
        Self::with_gravity(-9.82)
    }

    pub fn with_gravity(gravity_y: f32) -> Self {
        let (collision_send, collision_recv) = crossbeam::channel::unbounded();
        let (contact_force_send, contact_force_recv) = crossbeam::channel::unbounded();
        let event_handler = ChannelEventCollector::new(collision_send, contact_force_send);

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: vector![0.0, gravity_y, 0.0],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            queries_dirty: false,
            collision_recv,
            contact_force_recv,
            event_handler,
        }
    }

    /// Step the physics simulation by dt seconds
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;

        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_handler,
        );
        self.queries_dirty = false;
    }

    /// Rebuild the query pipeline if colliders were added, removed or reshaped
    /// since the last step
    pub fn refresh_queries(&mut self) {
        if self.queries_dirty {
            self.query_pipeline.update(&self.collider_set);
            self.queries_dirty = false;
        }
    }

    /// Drain collision events from the last step
    pub fn drain_collision_events(&self) -> Vec<CollisionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.collision_recv.try_recv() {
            events.push(event);
        }
        events
    }

    /// Drain contact force events from the last step.
    ///
    /// Only colliders with `ActiveEvents::CONTACT_FORCE_EVENTS` report, and
    /// only above their force threshold.
    pub fn drain_contact_force_events(&self) -> Vec<ContactForceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.contact_force_recv.try_recv() {
            events.push(event);
        }
        events
    }

    /// Insert a rigid body and return its handle
    pub fn insert_rigid_body(&mut self, body: RigidBody) -> RigidBodyHandle {
        self.rigid_body_set.insert(body)
    }

    /// Insert a collider attached to a rigid body
    pub fn insert_collider_with_parent(
        &mut self,
        collider: Collider,
        parent: RigidBodyHandle,
    ) -> ColliderHandle {
        self.queries_dirty = true;
        self.collider_set
            .insert_with_parent(collider, parent, &mut self.rigid_body_set)
    }

    /// Insert a collider fixed in world space (no rigid body)
    pub fn insert_collider(&mut self, collider: Collider) -> ColliderHandle {
        self.queries_dirty = true;
        self.collider_set.insert(collider)
    }

    /// Remove a parentless collider
    pub fn remove_collider(&mut self, handle: ColliderHandle) {
        self.queries_dirty = true;
        self.collider_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.rigid_body_set,
            true,
        );
    }

    /// Swap the shape of an existing collider
    pub fn set_collider_shape(&mut self, handle: ColliderHandle, shape: SharedShape) -> bool {
        match self.collider_set.get_mut(handle) {
            Some(collider) => {
                collider.set_shape(shape);
                self.queries_dirty = true;
                true
            }
            None => false,
        }
    }

    /// Remove a rigid body and its attached colliders
    pub fn remove_rigid_body(&mut self, handle: RigidBodyHandle) {
        self.queries_dirty = true;
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Get a rigid body by handle
    pub fn get_rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    /// Get a mutable rigid body by handle
    pub fn get_rigid_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.rigid_body_set.get_mut(handle)
    }

    /// Registry object a collider was tagged with
    pub fn entity_of(&self, handle: ColliderHandle) -> Option<EntityId> {
        self.collider_set
            .get(handle)
            .map(|c| c.user_data)
            .filter(|data| *data != 0)
            .map(|data| EntityId::from_raw(data as u64))
    }

    /// Closest hit along a ray against the colliders in `layer`
    pub fn cast_ray(
        &self,
        origin: Vec3,
        dir: Vec3,
        max_distance: f32,
        layer: QueryLayer,
    ) -> Option<RayHit> {
        let dir = dir.try_normalized(1e-6)?;
        let ray = Ray::new(to_point(origin), to_vector(dir));
        let filter = QueryFilter::new().groups(layer.groups());

        let (handle, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            filter,
        )?;

        let mut normal = from_vector(&hit.normal).normalized_or(Vec3::UP);
        if normal.dot(&dir) > 0.0 {
            // Back-face hit on a single-sided mesh
            normal = -normal;
        }

        Some(RayHit {
            point: origin + dir * hit.time_of_impact,
            normal,
            distance: hit.time_of_impact,
            entity: self.entity_of(handle),
        })
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
