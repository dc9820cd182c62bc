//! Seams between the skier controller and the physics engine

use crate::world::{from_vector, to_vector, PhysicsWorld, QueryLayer, RayHit};
use powder_core::Vec3;
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::*;

/// The rigid body the controller drives
pub trait SkierBody {
    fn position(&self) -> Vec3;
    fn linear_velocity(&self) -> Vec3;
    fn angular_velocity(&self) -> Vec3;
    fn mass(&self) -> f32;

    /// Add a force at the center of mass for the coming step
    fn apply_force(&mut self, force: Vec3);
    /// Change momentum instantly at the center of mass
    fn apply_impulse(&mut self, impulse: Vec3);

    fn set_position(&mut self, position: Vec3);
    fn set_linear_velocity(&mut self, velocity: Vec3);
    fn set_angular_velocity(&mut self, velocity: Vec3);
    /// Overwrite orientation with a pure rotation about world up
    fn set_yaw(&mut self, yaw: f32);
}

/// Downward spatial queries against collision geometry
pub trait GroundQuery {
    fn cast(&self, origin: Vec3, dir: Vec3, max_distance: f32, layer: QueryLayer)
        -> Option<RayHit>;
}

impl GroundQuery for PhysicsWorld {
    fn cast(
        &self,
        origin: Vec3,
        dir: Vec3,
        max_distance: f32,
        layer: QueryLayer,
    ) -> Option<RayHit> {
        self.cast_ray(origin, dir, max_distance, layer)
    }
}

/// `SkierBody` over a Rapier rigid body.
///
/// Rapier keeps user forces until they are reset, so wrapping a body clears
/// whatever the previous frame added.
pub struct RapierBody<'a> {
    body: &'a mut RigidBody,
}

impl<'a> RapierBody<'a> {
    pub fn new(body: &'a mut RigidBody) -> Self {
        body.reset_forces(false);
        Self { body }
    }
}

impl SkierBody for RapierBody<'_> {
    fn position(&self) -> Vec3 {
        from_vector(self.body.translation())
    }

    fn linear_velocity(&self) -> Vec3 {
        from_vector(self.body.linvel())
    }

    fn angular_velocity(&self) -> Vec3 {
        from_vector(self.body.angvel())
    }

    fn mass(&self) -> f32 {
        self.body.mass()
    }

    fn apply_force(&mut self, force: Vec3) {
        if force.is_finite() {
            self.body.add_force(to_vector(force), true);
        }
    }

    fn apply_impulse(&mut self, impulse: Vec3) {
        if impulse.is_finite() {
            self.body.apply_impulse(to_vector(impulse), true);
        }
    }

    fn set_position(&mut self, position: Vec3) {
        self.body.set_translation(to_vector(position), true);
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.body.set_linvel(to_vector(velocity), true);
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.body.set_angvel(to_vector(velocity), true);
    }

    fn set_yaw(&mut self, yaw: f32) {
        let rotation = UnitQuaternion::from_axis_angle(&Vector::y_axis(), yaw);
        self.body.set_rotation(rotation, true);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rapier_body_round_trips_state() {
        let mut world = PhysicsWorld::new();
        let handle = world.insert_rigid_body(
            RigidBodyBuilder::dynamic()
                .translation(vector![1.0, 2.0, 3.0])
                .additional_mass(2.0)
                .build(),
        );
        let body = world.get_rigid_body_mut(handle).unwrap();
        let mut skier = RapierBody::new(body);

        assert_eq!(skier.position(), Vec3::new(1.0, 2.0, 3.0));
        skier.set_linear_velocity(Vec3::new(0.0, 0.0, -4.0));
        assert_eq!(skier.linear_velocity(), Vec3::new(0.0, 0.0, -4.0));
        skier.set_position(Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(skier.position(), Vec3::new(0.0, 1.0, 0.0));

        skier.set_yaw(std::f32::consts::FRAC_PI_2);
        let rotation = world.get_rigid_body(handle).unwrap().rotation();
        let forward = *rotation * vector![0.0, 0.0, -1.0];
        assert!((forward.x + 1.0).abs() < 1e-5);
    }

    #[test]
    fn stub_plane_reports_distance() {
        let query = stub::StubQuery::Plane { normal: Vec3::UP };
        let hit = query
            .cast(Vec3::new(3.0, 2.0, 1.0), Vec3::DOWN, 5.0, QueryLayer::Walkable)
            .unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-6);
        assert!(stub::StubQuery::Nothing
            .cast(Vec3::UP, Vec3::DOWN, 5.0, QueryLayer::Walkable)
            .is_none());
    }
}
