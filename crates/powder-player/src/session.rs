//! One skier on one streamed slope, stepped by the game loop

use crate::config::GameConfig;
use powder_core::{EntityId, Result, Vec3};
use powder_ecs::SceneWorld;
use powder_physics::sync::{collision_events, impact_events, sync_from_rapier};
use powder_physics::{FrameTelemetry, PhysicsHost, PhysicsWorld, PropTag, RapierBody, SkierController};
use powder_runtime::{ControlInput, EventBus, GameEvent, RuntimeSystem};
use powder_terrain::{ChunkStore, HeightField, TerrainHost, UpdateReport};
use rapier3d::prelude::RigidBodyHandle;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Running totals over a session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub steps: u64,
    pub grounded_steps: u64,
    pub jumps: u32,
    pub boosts: u32,
    pub landings: u32,
    pub prop_hits: u32,
    /// Contacts above the body's impact threshold
    pub impacts: u32,
    /// Hardest contact force seen, in newtons
    pub peak_impact: f32,
    pub chunks_loaded: u32,
    pub chunks_retired: u32,
    pub stamps: u32,
    pub corrections: u32,
    /// Path length travelled in the horizontal plane
    pub distance: f32,
}

/// Ties terrain streaming, the skier controller, and Rapier together.
///
/// Each fixed step runs: probe, control, physics step, penetration
/// correction, chunk streaming, trail stamping, transform sync, events.
pub struct SkiSession {
    config: GameConfig,
    physics: PhysicsWorld,
    store: ChunkStore,
    controller: SkierController,
    skier: Option<(EntityId, RigidBodyHandle)>,
    input: ControlInput,
    telemetry: Option<FrameTelemetry>,
    events: EventBus,
    stats: SessionStats,
    last_stamp: Option<Vec3>,
    warned_missing_skier: bool,
}

impl SkiSession {
    pub fn new(config: GameConfig) -> Self {
        let store = ChunkStore::new(
            HeightField::new(config.terrain.clone()),
            config.streaming.clone(),
            config.scatter.clone(),
            config.stamp,
        );
        let controller = SkierController::new(
            config.skier.clone(),
            config.probe.clone(),
            config.spawn.yaw,
        );
        Self {
            config,
            physics: PhysicsWorld::new(),
            store,
            controller,
            skier: None,
            input: ControlInput::default(),
            telemetry: None,
            events: EventBus::default(),
            stats: SessionStats::default(),
            last_stamp: None,
            warned_missing_skier: false,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Terrain height at world (x, z)
    pub fn get_height(&self, x: f32, z: f32) -> f32 {
        self.store.height(x, z)
    }

    /// Terrain normal at world (x, z)
    pub fn get_normal(&self, x: f32, z: f32) -> Vec3 {
        self.store.normal(x, z)
    }

    /// Dent resident terrain at (x, z). Returns how many chunks changed.
    pub fn stamp_terrain(
        &mut self,
        world: &mut SceneWorld,
        x: f32,
        z: f32,
        strength: f32,
    ) -> usize {
        let mut host = PhysicsHost::new(world, &mut self.physics);
        let touched = self.store.stamp_terrain(x, z, strength, &mut host);
        if touched > 0 {
            self.stats.stamps += 1;
        }
        touched
    }

    /// Undo every trail and stamp on resident chunks
    pub fn clear_deformation(&mut self, world: &mut SceneWorld) -> usize {
        let mut host = PhysicsHost::new(world, &mut self.physics);
        self.store.clear_deformation(&mut host)
    }

    /// Input applied on every following step until replaced
    pub fn set_input(&mut self, input: ControlInput) {
        self.input = input;
    }

    /// What the controller did on the last step
    pub fn telemetry(&self) -> Option<&FrameTelemetry> {
        self.telemetry.as_ref()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn skier(&self) -> Option<EntityId> {
        self.skier.map(|(id, _)| id)
    }

    pub fn skier_position(&self) -> Option<Vec3> {
        let (_, handle) = self.skier?;
        let body = self.physics.get_rigid_body(handle)?;
        let t = body.translation();
        Some(Vec3::new(t.x, t.y, t.z))
    }

    pub fn skier_velocity(&self) -> Option<Vec3> {
        let (_, handle) = self.skier?;
        let body = self.physics.get_rigid_body(handle)?;
        let v = body.linvel();
        Some(Vec3::new(v.x, v.y, v.z))
    }

    /// Take the events published since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        let (events, overflowed) = self.events.drain();
        if overflowed > 0 {
            warn!("Dropped {} undrained event(s)", overflowed);
        }
        events
    }

    fn publish_streaming(&mut self, report: &UpdateReport) {
        for key in report.created.iter().chain(&report.rebuilt) {
            self.events.push(GameEvent::ChunkLoaded { x: key.x, z: key.z });
        }
        for key in &report.retired {
            self.events.push(GameEvent::ChunkRetired { x: key.x, z: key.z });
        }
        self.stats.chunks_loaded += (report.created.len() + report.rebuilt.len()) as u32;
        self.stats.chunks_retired += report.retired.len() as u32;
    }

    fn publish_telemetry(&mut self, telemetry: &FrameTelemetry) {
        if telemetry.jumped() {
            self.stats.jumps += 1;
            self.events.push(GameEvent::Jumped);
        }
        if telemetry.boosted() {
            self.stats.boosts += 1;
            self.events.push(GameEvent::Boosted);
        }
        if telemetry.landed {
            self.stats.landings += 1;
            self.events.push(GameEvent::Landed);
        }
        if telemetry.took_off {
            self.events.push(GameEvent::Airborne);
        }
    }

    /// Push the body back above the terrain if the step sank it
    fn correct_penetration(&mut self, handle: RigidBodyHandle) {
        let Some(position) = self.skier_position() else {
            return;
        };
        let Some(pen) = self.controller.penetration(&self.physics, position) else {
            return;
        };
        if let Some(body) = self.physics.get_rigid_body_mut(handle) {
            pen.resolve(&mut RapierBody::new(body));
            self.stats.corrections += 1;
            debug!("Lifted skier {:.3} out of the terrain", pen.depth);
        }
    }

    /// Leave a trail behind a grounded, moving skier
    fn stamp_trail(&mut self, world: &mut SceneWorld, telemetry: &FrameTelemetry) {
        let trail = &self.config.trail;
        if !trail.enabled || telemetry.surface_speed < trail.min_speed {
            return;
        }
        let Some(point) = telemetry.probe.point.filter(|_| telemetry.probe.grounded) else {
            return;
        };
        if let Some(last) = self.last_stamp {
            if last.distance_xz(&point) < trail.spacing {
                return;
            }
        }
        let strength = trail.strength;
        self.last_stamp = Some(point);
        self.stamp_terrain(world, point.x, point.z, strength);
    }
}

impl RuntimeSystem for SkiSession {
    fn initialize(&mut self, world: &mut SceneWorld) -> Result<()> {
        let spawn = self.config.spawn.clone();
        let feet = Vec3::new(
            spawn.x,
            self.store.height(spawn.x, spawn.z) + spawn.drop_height,
            spawn.z,
        );

        let mut host = PhysicsHost::new(world, &mut self.physics);
        let report = self.store.update(feet, &mut host);
        let skier = host.spawn_skier(&self.config.body, feet, spawn.yaw)?;
        self.skier = Some(skier);
        self.publish_streaming(&report);
        self.physics.refresh_queries();

        info!(
            "Session started: seed {}, {} chunk(s), {} prop(s), skier at ({:.1}, {:.1}, {:.1})",
            self.config.terrain.seed,
            self.store.len(),
            self.store.prop_count(),
            feet.x,
            feet.y,
            feet.z
        );
        Ok(())
    }

    fn fixed_update(&mut self, world: &mut SceneWorld, dt: f64) -> Result<()> {
        let Some((_, handle)) = self.skier else {
            if !self.warned_missing_skier {
                warn!("No skier body; skipping simulation steps");
                self.warned_missing_skier = true;
            }
            return Ok(());
        };
        let dt = dt as f32;
        let Some(start) = self.skier_position() else {
            return Ok(());
        };

        // Chunks built last step must be visible to this step's rays
        self.physics.refresh_queries();
        let contact = self.controller.probe_ground(&self.physics, start);
        let telemetry = match self.physics.get_rigid_body_mut(handle) {
            Some(body) => {
                self.controller
                    .update(&mut RapierBody::new(body), contact, &self.input, dt)
            }
            None => return Ok(()),
        };

        self.physics.step(dt);
        self.correct_penetration(handle);

        let position = self.skier_position().unwrap_or(start);
        let travel = self.skier_velocity().filter(|v| v.is_finite());
        let report = {
            let mut host = PhysicsHost::new(world, &mut self.physics);
            self.store.update_directed(position, travel, &mut host)
        };
        if !report.is_empty() {
            debug!(
                "Streaming: +{} ~{} -{} ({} resident)",
                report.created.len(),
                report.rebuilt.len(),
                report.retired.len(),
                self.store.len()
            );
        }
        self.publish_streaming(&report);

        self.stamp_trail(world, &telemetry);
        sync_from_rapier(world, &self.physics);

        self.events.extend(collision_events(&self.physics));
        for impact in impact_events(&self.physics) {
            if let GameEvent::Impact { force, .. } = impact {
                self.stats.impacts += 1;
                self.stats.peak_impact = self.stats.peak_impact.max(force);
                debug!("Impact of {:.0} N", force);
            }
            self.events.push(impact);
        }
        self.publish_telemetry(&telemetry);

        self.stats.steps += 1;
        if telemetry.probe.grounded {
            self.stats.grounded_steps += 1;
        }
        self.stats.distance += start.distance_xz(&position);
        self.telemetry = Some(telemetry);
        Ok(())
    }

    fn on_collision(&mut self, world: &mut SceneWorld, a: EntityId, b: EntityId) {
        let Some(skier) = self.skier() else {
            return;
        };
        let other = if a == skier {
            b
        } else if b == skier {
            a
        } else {
            return;
        };
        if world.has::<PropTag>(other) {
            self.stats.prop_hits += 1;
            debug!(
                "Skier hit {} {}",
                world.get_name(other).unwrap_or_default(),
                other
            );
        }
    }

    fn shutdown(&mut self, world: &mut SceneWorld) -> Result<()> {
        let mut host = PhysicsHost::new(world, &mut self.physics);
        self.store.release_all(&mut host);
        if let Some((id, _)) = self.skier.take() {
            host.release(id)?;
        }
        info!(
            "Session ended after {} steps, {:.1} m travelled",
            self.stats.steps, self.stats.distance
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "ski_session"
    }
}
