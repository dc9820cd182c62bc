//! Headless application loop
//!
//! Owns the registry, clock, input, and session, and runs them the way a
//! windowed front end would: feed input, run fixed steps, drain events.

use crate::config::GameConfig;
use crate::session::SkiSession;
use powder_core::Result;
use powder_ecs::SceneWorld;
use powder_physics::FrameTelemetry;
use powder_runtime::{GameClock, GameEvent, InputState, RuntimeSystem};

/// Scripted key presses standing in for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Pilot {
    /// Hands off: ride the fall line
    Straight,
    /// Alternate left and right turns
    Slalom,
    /// Jump and boost at intervals
    Hop,
}

/// Frames between slalom direction changes
const SLALOM_PERIOD: u64 = 45;
/// Frames between hops
const HOP_PERIOD: u64 = 90;

impl Pilot {
    /// Press and release keys for `frame`
    pub fn drive(&self, frame: u64, input: &mut InputState) {
        match self {
            Pilot::Straight => {}
            Pilot::Slalom => {
                let left = (frame / SLALOM_PERIOD) % 2 == 0;
                let (press, release) = if left {
                    ("KeyA", "KeyD")
                } else {
                    ("KeyD", "KeyA")
                };
                input.process_key_up(release);
                input.process_key_down(press);
            }
            Pilot::Hop => {
                if frame % HOP_PERIOD == HOP_PERIOD - 1 {
                    input.process_key_down("Space");
                } else {
                    input.process_key_up("Space");
                }
                if frame % (HOP_PERIOD * 2) == 30 {
                    input.request_boost();
                }
            }
        }
    }
}

pub struct SkiApp {
    pub world: SceneWorld,
    pub clock: GameClock,
    pub input: InputState,
    pub session: SkiSession,
    frames: u64,
}

impl SkiApp {
    /// Build the session and stream in the starting slope
    pub fn new(config: GameConfig) -> Result<Self> {
        let clock = GameClock::from_config(&config.clock);
        let mut world = SceneWorld::new();
        let mut session = SkiSession::new(config);
        session.initialize(&mut world)?;

        Ok(Self {
            world,
            clock,
            input: InputState::new(),
            session,
            frames: 0,
        })
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn telemetry(&self) -> Option<&FrameTelemetry> {
        self.session.telemetry()
    }

    /// Run one rendered frame of `dt` seconds and return what happened
    pub fn frame(&mut self, dt: f64) -> Result<Vec<GameEvent>> {
        self.clock.advance(dt);
        self.run_frame()
    }

    /// Run one frame timed by the wall clock
    pub fn tick(&mut self) -> Result<Vec<GameEvent>> {
        self.clock.tick();
        self.run_frame()
    }

    fn run_frame(&mut self) -> Result<Vec<GameEvent>> {
        self.session.set_input(self.input.control_input());

        let mut stepped = false;
        while self.clock.should_fixed_update() {
            let dt = self.clock.fixed_timestep;
            self.session.fixed_update(&mut self.world, dt)?;
            self.clock.consume_fixed_step();
            stepped = true;
        }
        // A boost tap survives frames too short to run a step
        if stepped {
            self.input.consume_boost();
        }
        self.session.update(&mut self.world, self.clock.delta_time)?;

        let events = self.session.drain_events();
        for event in &events {
            if let GameEvent::CollisionStarted { entity_a, entity_b } = event {
                self.session.on_collision(&mut self.world, *entity_a, *entity_b);
            }
        }

        self.frames += 1;
        Ok(events)
    }

    /// Release every chunk, prop, and the skier
    pub fn shutdown(&mut self) -> Result<()> {
        self.session.shutdown(&mut self.world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powder_terrain::{HeightFieldParams, ScatterConfig};

    const FRAME: f64 = 1.0 / 60.0;

    fn app() -> SkiApp {
        SkiApp::new(GameConfig {
            terrain: HeightFieldParams::flat(0.3),
            scatter: ScatterConfig::empty(),
            ..GameConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn frames_run_fixed_steps() {
        let mut app = app();
        for _ in 0..30 {
            app.frame(FRAME).unwrap();
        }
        assert_eq!(app.frames(), 30);
        // One step per 1/60 frame, give or take accumulator rounding
        let steps = app.session.stats().steps;
        assert!((29..=30).contains(&steps), "ran {} steps", steps);
    }

    #[test]
    fn long_frames_are_capped() {
        let mut app = app();
        app.frame(1.0).unwrap();
        assert!(app.session.stats().steps <= 3);
    }

    #[test]
    fn slalom_pilot_turns_both_ways() {
        let mut app = app();
        let mut yaw_at = Vec::new();
        for frame in 0..(SLALOM_PERIOD * 2) {
            Pilot::Slalom.drive(frame, &mut app.input);
            app.frame(FRAME).unwrap();
            if (frame + 1) % SLALOM_PERIOD == 0 {
                yaw_at.push(app.telemetry().unwrap().yaw);
            }
        }
        // Left first (positive yaw), then back to the right
        assert!(yaw_at[0] > 0.3, "yaw after left turn {}", yaw_at[0]);
        assert!(yaw_at[1] < yaw_at[0] - 0.5, "yaw after right turn {}", yaw_at[1]);
    }

    #[test]
    fn hop_pilot_jumps() {
        let mut app = app();
        let mut jumped = false;
        for frame in 0..(HOP_PERIOD * 2) {
            Pilot::Hop.drive(frame, &mut app.input);
            let events = app.frame(FRAME).unwrap();
            jumped |= events.contains(&GameEvent::Jumped);
        }
        assert!(jumped);
        assert!(app.session.stats().boosts >= 1);
    }

    #[test]
    fn boost_tap_survives_a_frame_without_steps() {
        let mut app = app();
        for _ in 0..60 {
            app.frame(FRAME).unwrap();
        }
        let steps = app.session.stats().steps;
        assert_eq!(app.session.stats().boosts, 0);

        app.input.request_boost();
        app.frame(0.0).unwrap();
        assert_eq!(app.session.stats().steps, steps);
        assert!(app.input.control_input().boost);

        for _ in 0..5 {
            app.frame(FRAME).unwrap();
        }
        assert_eq!(app.session.stats().boosts, 1);
        assert!(!app.input.control_input().boost);
    }

    #[test]
    fn shutdown_empties_the_registry() {
        let mut app = app();
        app.frame(FRAME).unwrap();
        app.shutdown().unwrap();
        assert_eq!(app.world.entity_count(), 0);
    }
}
