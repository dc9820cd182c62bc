//! Slope-following skier control loop

use crate::body::{GroundQuery, SkierBody};
use crate::probe::{probe, NormalSmoother, ProbeConfig, ProbeResult};
use crate::world::QueryLayer;
use powder_core::Vec3;
use powder_runtime::ControlInput;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Vectors shorter than this are treated as having no direction
const MIN_DIR: f32 = 1e-3;

/// Control-law constants. Forces and impulses scale with body mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkierTuning {
    /// Heading change per second at full steer, radians
    pub yaw_rate: f32,
    /// Fraction of drive and steering available in the air
    pub air_control: f32,
    /// Coasting turns toward downhill only when off by at least this much
    pub auto_align_min_deg: f32,
    /// ...and at most this much
    pub auto_align_max_deg: f32,
    /// Fastest coasting turn, degrees per second
    pub auto_align_rate_deg: f32,
    /// Surface speed below which coasting does not turn
    pub auto_align_min_speed: f32,
    /// Propulsion along forward-on-plane, per unit mass
    pub forward_force: f32,
    /// Drag on the full surface velocity, per unit mass
    pub linear_drag: f32,
    /// Drag on sideways surface velocity, per unit mass
    pub lateral_drag: f32,
    /// Extra drag while steering hard, per unit mass at full steer
    pub turn_drag: f32,
    /// |steer| above which turn drag applies
    pub turn_drag_threshold: f32,
    /// Speed along the normal a jump tops up to
    pub jump_speed: f32,
    /// Speed along forward-on-plane a boost tops up to
    pub boost_speed: f32,
    /// Seconds between boosts
    pub boost_cooldown: f32,
    /// Fraction of yaw spin removed per second
    pub yaw_damping: f32,
    /// Rate of forward-on-plane smoothing per second
    pub forward_smoothing: f32,
    /// Penetration shallower than this is left to the solver
    pub penetration_epsilon: f32,
}

impl Default for SkierTuning {
    fn default() -> Self {
        Self {
            yaw_rate: 1.6,
            air_control: 0.2,
            auto_align_min_deg: 5.0,
            auto_align_max_deg: 80.0,
            auto_align_rate_deg: 10.0,
            auto_align_min_speed: 0.2,
            forward_force: 10.0,
            linear_drag: 0.4,
            lateral_drag: 6.0,
            turn_drag: 8.0,
            turn_drag_threshold: 0.5,
            jump_speed: 4.5,
            boost_speed: 12.0,
            boost_cooldown: 1.0,
            yaw_damping: 2.0,
            forward_smoothing: 8.0,
            penetration_epsilon: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    Grounded,
    Airborne,
}

/// Everything the control loop decided in one frame, for debug views and logs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameTelemetry {
    pub mode: ControlMode,
    pub probe: ProbeResult,
    /// Normal the frame was aligned to (smoothed ground normal, or up)
    pub normal: Vec3,
    pub forward_on_plane: Vec3,
    pub yaw: f32,
    pub yaw_rate: f32,
    pub speed: f32,
    pub surface_speed: f32,
    pub drive: Vec3,
    pub drag: Vec3,
    pub lateral_drag: Vec3,
    pub turn_drag: Vec3,
    pub air_force: Vec3,
    pub jump_impulse: Vec3,
    pub boost_impulse: Vec3,
    pub boost_cooldown: f32,
    pub landed: bool,
    pub took_off: bool,
}

impl FrameTelemetry {
    pub fn jumped(&self) -> bool {
        self.jump_impulse != Vec3::ZERO
    }

    pub fn boosted(&self) -> bool {
        self.boost_impulse != Vec3::ZERO
    }

    /// Sum of every continuous force applied this frame
    pub fn total_force(&self) -> Vec3 {
        self.drive + self.drag + self.lateral_drag + self.turn_drag + self.air_force
    }
}

/// State carried from frame to frame
#[derive(Debug, Clone, PartialEq)]
pub struct SkierState {
    /// Heading in radians; zero faces -Z (downhill)
    pub yaw: f32,
    pub boost_cooldown: f32,
    /// A boost cooldown is running
    pub boost_active: bool,
    pub grounded: bool,
    jump_held: bool,
    normal: NormalSmoother,
    forward: Option<Vec3>,
}

impl SkierState {
    pub fn new(yaw: f32) -> Self {
        Self {
            yaw: wrap_angle(yaw),
            boost_cooldown: 0.0,
            boost_active: false,
            grounded: false,
            jump_held: false,
            normal: NormalSmoother::new(),
            forward: None,
        }
    }
}

/// Impulse that raises the velocity component along `normal` to `target`.
///
/// Zero when the body already moves that fast away from the surface.
pub fn jump_impulse(mass: f32, velocity: Vec3, normal: Vec3, target: f32) -> Vec3 {
    let dv = (target - velocity.dot(&normal)).max(0.0);
    normal * (mass * dv)
}

/// Impulse that raises the velocity component along `forward` to `target`.
///
/// A speed floor, not a kick: zero at or above the target.
pub fn boost_impulse(mass: f32, velocity: Vec3, forward: Vec3, target: f32) -> Vec3 {
    let dv = (target - velocity.dot(&forward)).max(0.0);
    forward * (mass * dv)
}

/// Wrap to (-PI, PI]
fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Drives a skier body from player input and the ground under it
pub struct SkierController {
    pub tuning: SkierTuning,
    pub probe: ProbeConfig,
    state: SkierState,
}

impl SkierController {
    pub fn new(tuning: SkierTuning, probe: ProbeConfig, yaw: f32) -> Self {
        Self {
            tuning,
            probe,
            state: SkierState::new(yaw),
        }
    }

    pub fn state(&self) -> &SkierState {
        &self.state
    }

    /// Heading unit vector in the horizontal plane
    pub fn heading(&self) -> Vec3 {
        Vec3::FORWARD.rotate_y(self.state.yaw)
    }

    /// Probe the ground under a body centered at `position`
    pub fn probe_ground(&self, query: &dyn GroundQuery, position: Vec3) -> ProbeResult {
        probe(query, position, &self.probe)
    }

    /// Run one control step before the physics step.
    ///
    /// `contact` is this frame's probe of the ground under `body`.
    pub fn update(
        &mut self,
        body: &mut dyn SkierBody,
        contact: ProbeResult,
        input: &ControlInput,
        dt: f32,
    ) -> FrameTelemetry {
        let t = self.tuning.clone();
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        self.state.boost_cooldown = (self.state.boost_cooldown - dt).max(0.0);

        let grounded = contact.grounded;
        let normal = if grounded {
            if self.probe.smoothing_rate > 0.0 {
                self.state
                    .normal
                    .update(contact.normal, self.probe.smoothing_rate, dt)
            } else {
                contact.normal
            }
        } else {
            Vec3::UP
        };

        let steer = if input.steer.is_finite() {
            input.steer.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let jump_pressed = input.jump && !self.state.jump_held;
        self.state.jump_held = input.jump;

        let mass = body.mass();
        let velocity = body.linear_velocity();
        let v_plane = velocity.project_on_plane(&normal);
        let surface_speed = v_plane.length();

        // Heading
        if grounded {
            if steer != 0.0 {
                self.state.yaw += t.yaw_rate * steer * dt;
            } else if surface_speed > t.auto_align_min_speed {
                self.state.yaw += self.downhill_turn(normal, dt);
            }
        } else {
            self.state.yaw += t.yaw_rate * t.air_control * steer * dt;
        }
        self.state.yaw = wrap_angle(self.state.yaw);

        let forward = self.forward_on_plane(normal, dt);

        let mut telemetry = FrameTelemetry {
            mode: if grounded {
                ControlMode::Grounded
            } else {
                ControlMode::Airborne
            },
            probe: contact,
            normal,
            forward_on_plane: forward,
            yaw: self.state.yaw,
            yaw_rate: body.angular_velocity().y,
            speed: velocity.length(),
            surface_speed,
            drive: Vec3::ZERO,
            drag: Vec3::ZERO,
            lateral_drag: Vec3::ZERO,
            turn_drag: Vec3::ZERO,
            air_force: Vec3::ZERO,
            jump_impulse: Vec3::ZERO,
            boost_impulse: Vec3::ZERO,
            boost_cooldown: 0.0,
            landed: grounded && !self.state.grounded,
            took_off: !grounded && self.state.grounded,
        };

        if grounded {
            telemetry.drive = forward * (t.forward_force * mass);
            telemetry.drag = v_plane * (-t.linear_drag * mass);
            let lateral = v_plane - forward * v_plane.dot(&forward);
            telemetry.lateral_drag = lateral * (-t.lateral_drag * mass);
            if steer.abs() > t.turn_drag_threshold {
                telemetry.turn_drag = v_plane * (-t.turn_drag * mass * steer.abs());
            }
            body.apply_force(telemetry.total_force());

            if jump_pressed {
                let impulse = jump_impulse(mass, velocity, normal, t.jump_speed);
                if impulse != Vec3::ZERO {
                    body.apply_impulse(impulse);
                    telemetry.jump_impulse = impulse;
                }
            }

            if input.boost && self.state.boost_cooldown <= 0.0 {
                let impulse = boost_impulse(mass, velocity, forward, t.boost_speed);
                if impulse != Vec3::ZERO {
                    body.apply_impulse(impulse);
                    telemetry.boost_impulse = impulse;
                    self.state.boost_cooldown = t.boost_cooldown;
                }
            }
        } else {
            telemetry.air_force = forward * (t.forward_force * t.air_control * mass);
            body.apply_force(telemetry.air_force);
        }

        let spin = body.angular_velocity();
        if spin.y.abs() > 1e-6 {
            let keep = (1.0 - t.yaw_damping * dt).max(0.0);
            body.set_angular_velocity(Vec3::new(spin.x, spin.y * keep, spin.z));
        }
        body.set_yaw(self.state.yaw);

        self.state.grounded = grounded;
        self.state.boost_active = self.state.boost_cooldown > 0.0;
        telemetry.boost_cooldown = self.state.boost_cooldown;
        telemetry
    }

    /// Signed heading change that eases a coasting skier toward the fall line
    fn downhill_turn(&self, normal: Vec3, dt: f32) -> f32 {
        let t = &self.tuning;
        let Some(downhill) = Vec3::DOWN.project_on_plane(&normal).try_normalized(MIN_DIR) else {
            return 0.0;
        };
        let Some(forward) = self.heading().project_on_plane(&normal).try_normalized(MIN_DIR)
        else {
            return 0.0;
        };

        let angle = forward.dot(&downhill).clamp(-1.0, 1.0).acos();
        if angle < t.auto_align_min_deg.to_radians() || angle > t.auto_align_max_deg.to_radians() {
            return 0.0;
        }
        let max_turn = t.auto_align_rate_deg.to_radians() * dt;
        let side = forward.cross(&downhill).y;
        side.signum() * angle.min(max_turn)
    }

    /// Heading projected onto the ground plane, smoothed across frames
    fn forward_on_plane(&mut self, normal: Vec3, dt: f32) -> Vec3 {
        let heading = self.heading();
        let raw = heading.project_on_plane(&normal).try_normalized(MIN_DIR);

        let forward = match (raw, self.state.forward) {
            (Some(mut raw), Some(prev)) => {
                if raw.dot(&prev) < 0.0 {
                    raw = -raw;
                }
                let blend = (self.tuning.forward_smoothing * dt).clamp(0.0, 1.0);
                prev.lerp(&raw, blend).try_normalized(MIN_DIR).unwrap_or(prev)
            }
            (Some(raw), None) => raw,
            (None, Some(prev)) => prev,
            (None, None) => heading,
        };
        self.state.forward = Some(forward);
        forward
    }

    /// How far the feet of a body centered at `position` sit below the
    /// terrain surface, when that exceeds `penetration_epsilon`.
    ///
    /// Only terrain counts; standing on a prop is never corrected.
    pub fn penetration(&self, query: &dyn GroundQuery, position: Vec3) -> Option<Penetration> {
        let foot = self.probe.foot_offset;
        let origin = position + Vec3::UP * foot;
        let hit = query.cast(
            origin,
            Vec3::DOWN,
            2.0 * foot + self.probe.ring_reach,
            QueryLayer::Terrain,
        )?;

        let depth = hit.point.y - (position.y - foot);
        if !depth.is_finite() || depth <= self.tuning.penetration_epsilon {
            return None;
        }
        Some(Penetration {
            depth,
            normal: hit.normal,
        })
    }
}

/// Feet below the terrain surface after a physics step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    pub depth: f32,
    /// Terrain normal at the contact
    pub normal: Vec3,
}

impl Penetration {
    /// Move the body up by the depth and remove velocity into the surface
    pub fn resolve(&self, body: &mut dyn SkierBody) {
        body.set_position(body.position() + Vec3::UP * self.depth);
        let velocity = body.linear_velocity();
        let into = velocity.dot(&self.normal);
        if into < 0.0 {
            body.set_linear_velocity(velocity - self.normal * into);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::stub::{StubBody, StubQuery};
    use crate::probe::ProbeMode;
    use crate::world::RayHit;

    const DT: f32 = 1.0 / 60.0;

    fn tick(
        ctl: &mut SkierController,
        body: &mut StubBody,
        ground: &dyn GroundQuery,
        input: &ControlInput,
        dt: f32,
    ) -> FrameTelemetry {
        let contact = ctl.probe_ground(ground, body.position);
        ctl.update(body, contact, input, dt)
    }

    fn controller() -> SkierController {
        SkierController::new(SkierTuning::default(), ProbeConfig::default(), 0.0)
    }

    fn flat() -> StubQuery {
        StubQuery::Plane { normal: Vec3::UP }
    }

    /// Normal of a slope that drops toward -Z
    fn slope(deg: f32) -> Vec3 {
        let r = deg.to_radians();
        Vec3::new(0.0, r.cos(), -r.sin())
    }

    fn standing_on(normal: Vec3) -> StubBody {
        StubBody::at(normal * 0.95)
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn airborne_frame_gets_only_air_force() {
        let mut ctl = controller();
        let mut body = StubBody::at(Vec3::new(0.0, 10.0, 0.0));
        body.velocity = Vec3::new(1.0, -2.0, -6.0);
        let input = ControlInput::new(0.0, true, true);

        let tm = tick(&mut ctl, &mut body, &StubQuery::Nothing, &input, DT);

        assert_eq!(tm.mode, ControlMode::Airborne);
        assert!(body.impulses.is_empty());
        assert_eq!(body.forces.len(), 1);
        assert_eq!(tm.drag, Vec3::ZERO);
        assert_eq!(tm.lateral_drag, Vec3::ZERO);
        // forward (0, 0, -1) * forward_force * air_control * mass
        assert!(approx(body.forces[0], Vec3::new(0.0, 0.0, -4.0)));
        assert_eq!(tm.normal, Vec3::UP);
    }

    #[test]
    fn grounded_forces_track_heading() {
        let mut ctl = controller();
        let mut body = standing_on(Vec3::UP);
        body.velocity = Vec3::new(3.0, 0.0, 0.0);

        let tm = tick(&mut ctl, &mut body, &flat(), &ControlInput::default(), DT);

        assert_eq!(tm.mode, ControlMode::Grounded);
        assert!(approx(tm.drive, Vec3::new(0.0, 0.0, -20.0)));
        assert!(approx(tm.drag, Vec3::new(-2.4, 0.0, 0.0)));
        assert!(approx(tm.lateral_drag, Vec3::new(-36.0, 0.0, 0.0)));
        assert_eq!(tm.turn_drag, Vec3::ZERO);
        assert!(approx(body.total_force(), tm.total_force()));
    }

    #[test]
    fn turn_drag_needs_hard_steer() {
        let mut ctl = controller();
        let mut body = standing_on(Vec3::UP);
        body.velocity = Vec3::new(0.0, 0.0, -5.0);

        let gentle = tick(&mut ctl, &mut body, &flat(), &ControlInput::new(0.4, false, false), DT);
        assert_eq!(gentle.turn_drag, Vec3::ZERO);

        let hard = tick(&mut ctl, &mut body, &flat(), &ControlInput::new(-1.0, false, false), DT);
        assert!(approx(hard.turn_drag, Vec3::new(0.0, 0.0, 80.0)));
    }

    #[test]
    fn jump_is_edge_triggered_speed_floor() {
        let mut ctl = controller();
        let mut body = standing_on(Vec3::UP);
        let hold = ControlInput::new(0.0, true, false);

        let first = tick(&mut ctl, &mut body, &flat(), &hold, DT);
        assert!(approx(first.jump_impulse, Vec3::new(0.0, 9.0, 0.0)));
        assert!(first.jumped());

        // Still held: no second jump even though still grounded
        body.velocity = Vec3::ZERO;
        let second = tick(&mut ctl, &mut body, &flat(), &hold, DT);
        assert!(!second.jumped());

        tick(&mut ctl, &mut body, &flat(), &ControlInput::default(), DT);
        let again = tick(&mut ctl, &mut body, &flat(), &hold, DT);
        assert!(again.jumped());
        assert_eq!(body.impulses.len(), 2);
    }

    #[test]
    fn jump_pressed_in_air_is_consumed() {
        let mut ctl = controller();
        let mut body = StubBody::at(Vec3::new(0.0, 10.0, 0.0));
        let hold = ControlInput::new(0.0, true, false);

        tick(&mut ctl, &mut body, &StubQuery::Nothing, &hold, DT);
        body.position = Vec3::new(0.0, 0.95, 0.0);
        let landed = tick(&mut ctl, &mut body, &flat(), &hold, DT);

        assert!(landed.landed);
        assert!(!landed.jumped());
    }

    #[test]
    fn jump_impulse_tops_up_normal_speed() {
        let n = Vec3::UP;
        assert_eq!(jump_impulse(2.0, Vec3::new(0.0, 5.0, 0.0), n, 4.5), Vec3::ZERO);
        let imp = jump_impulse(2.0, Vec3::new(3.0, 1.5, 0.0), n, 4.5);
        assert!(approx(imp, Vec3::new(0.0, 6.0, 0.0)));
    }

    #[test]
    fn boost_is_a_speed_floor() {
        let fwd = Vec3::FORWARD;
        assert_eq!(boost_impulse(2.0, Vec3::new(0.0, 0.0, -13.0), fwd, 12.0), Vec3::ZERO);
        let imp = boost_impulse(2.0, Vec3::new(0.0, 0.0, -5.0), fwd, 12.0);
        assert!(((imp.length()) - 2.0 * (12.0 - 5.0)).abs() < 1e-4);
        assert!(approx(imp.normalized(), fwd));
    }

    #[test]
    fn boost_respects_cooldown_and_floor() {
        let mut ctl = controller();
        let mut body = standing_on(Vec3::UP);
        body.velocity = Vec3::new(0.0, 0.0, -5.0);
        let boost = ControlInput::new(0.0, false, true);

        let tm = tick(&mut ctl, &mut body, &flat(), &boost, DT);
        assert!(approx(tm.boost_impulse, Vec3::new(0.0, 0.0, -14.0)));
        assert!(ctl.state().boost_active);

        // On cooldown
        body.velocity = Vec3::new(0.0, 0.0, -5.0);
        let blocked = tick(&mut ctl, &mut body, &flat(), &boost, DT);
        assert!(!blocked.boosted());

        for _ in 0..70 {
            tick(&mut ctl, &mut body, &flat(), &ControlInput::default(), DT);
        }
        assert!(!ctl.state().boost_active);

        // Already faster than the target: nothing happens and no cooldown starts
        body.velocity = Vec3::new(0.0, 0.0, -20.0);
        let fast = tick(&mut ctl, &mut body, &flat(), &boost, DT);
        assert!(!fast.boosted());
        assert_eq!(ctl.state().boost_cooldown, 0.0);
    }

    #[test]
    fn steering_rotates_heading_and_writes_yaw() {
        let mut ctl = controller();
        let mut body = standing_on(Vec3::UP);
        let left = ControlInput::new(1.0, false, false);

        for _ in 0..60 {
            tick(&mut ctl, &mut body, &flat(), &left, DT);
        }
        assert!((ctl.state().yaw - 1.6).abs() < 1e-3);
        assert_eq!(body.yaw, Some(ctl.state().yaw));
        // Positive yaw turns the skier toward -X
        assert!(ctl.heading().x < -0.9);
    }

    #[test]
    fn coasting_turns_toward_the_fall_line() {
        let n = slope(20.0);
        let ground = StubQuery::Plane { normal: n };
        let mut ctl = SkierController::new(SkierTuning::default(), ProbeConfig::default(), 0.5);
        let mut body = standing_on(n);
        body.velocity = Vec3::new(0.0, 0.0, -4.0).project_on_plane(&n);

        tick(&mut ctl, &mut body, &ground, &ControlInput::default(), DT);
        let expected = 0.5 - 10f32.to_radians() * DT;
        assert!((ctl.state().yaw - expected).abs() < 1e-5);

        // Across the slope (beyond the window): no auto turn
        let mut across = SkierController::new(SkierTuning::default(), ProbeConfig::default(), 2.0);
        tick(&mut across, &mut body, &ground, &ControlInput::default(), DT);
        assert!((across.state().yaw - 2.0).abs() < 1e-6);
    }

    #[test]
    fn yaw_spin_is_damped() {
        let mut ctl = controller();
        let mut body = standing_on(Vec3::UP);
        body.angular = Vec3::new(0.0, 3.0, 0.0);

        tick(&mut ctl, &mut body, &flat(), &ControlInput::default(), DT);
        assert!((body.angular.y - 3.0 * (1.0 - 2.0 * DT)).abs() < 1e-5);
    }

    /// Every ray lands on a wall facing +Z
    struct Wall;

    impl GroundQuery for Wall {
        fn cast(&self, origin: Vec3, dir: Vec3, _max: f32, _layer: QueryLayer) -> Option<RayHit> {
            Some(RayHit {
                point: origin + dir * 0.5,
                normal: Vec3::new(0.0, 0.0, 1.0),
                distance: 0.5,
                entity: None,
            })
        }
    }

    #[test]
    fn degenerate_forward_reuses_previous() {
        let probe = ProbeConfig {
            smoothing_rate: 0.0,
            ..ProbeConfig::default()
        };
        let mut ctl = SkierController::new(SkierTuning::default(), probe, 0.0);
        let mut body = standing_on(Vec3::UP);

        let before = tick(&mut ctl, &mut body, &flat(), &ControlInput::default(), DT);
        let after = tick(&mut ctl, &mut body, &Wall, &ControlInput::default(), DT);

        assert!(after.forward_on_plane.is_finite());
        assert_eq!(after.forward_on_plane, before.forward_on_plane);
        assert!(body.forces.iter().all(|f| f.is_finite()));
    }

    #[test]
    fn single_probe_mode_drives_the_same_loop() {
        let probe = ProbeConfig {
            mode: ProbeMode::Single,
            ..ProbeConfig::default()
        };
        let mut ctl = SkierController::new(SkierTuning::default(), probe, 0.0);
        let mut body = standing_on(Vec3::UP);
        let tm = tick(&mut ctl, &mut body, &flat(), &ControlInput::default(), DT);
        assert_eq!(tm.mode, ControlMode::Grounded);
        assert_eq!(tm.probe.rays, 1);
    }

    #[test]
    fn penetration_is_corrected_upward() {
        let ctl = controller();
        let mut body = StubBody::at(Vec3::new(0.0, 0.65, 0.0));
        body.velocity = Vec3::new(0.0, -2.0, -5.0);

        let pen = ctl.penetration(&flat(), body.position).unwrap();
        assert!((pen.depth - 0.3).abs() < 1e-5);
        pen.resolve(&mut body);
        assert!((body.position.y - 0.95).abs() < 1e-5);
        assert!(approx(body.velocity, Vec3::new(0.0, 0.0, -5.0)));

        // Resting on the surface: left alone
        assert!(ctl.penetration(&flat(), body.position).is_none());
        assert!(ctl.penetration(&StubQuery::Nothing, body.position).is_none());
    }

    #[test]
    fn angles_wrap_into_half_open_range() {
        assert!((wrap_angle(3.0 * PI).abs() - PI).abs() < 1e-5);
        assert!((wrap_angle(TAU + 0.5) - 0.5).abs() < 1e-5);
        assert!((wrap_angle(-TAU - 0.5) + 0.5).abs() < 1e-5);
        assert!((wrap_angle(-0.5) + 0.5).abs() < 1e-6);
        assert_eq!(wrap_angle(f32::NAN), 0.0);
    }
}
