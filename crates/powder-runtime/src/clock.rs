//! Game clock with fixed-timestep accumulator

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Timing knobs for the frame loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Physics rate in Hz
    pub fixed_hz: f64,
    /// Longest frame delta accepted, in seconds (tab resume, stalls)
    pub max_frame_delta: f64,
    /// Upper bound on fixed steps run for a single frame
    pub max_substeps: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            fixed_hz: 60.0,
            max_frame_delta: 0.033,
            max_substeps: 3,
        }
    }
}

/// Tracks game time and provides a fixed-timestep accumulator for physics updates
pub struct GameClock {
    /// Total elapsed game time in seconds
    pub total_time: f64,
    /// Time since last frame in seconds, after clamping
    pub delta_time: f64,
    /// Fixed timestep interval (default: 1/60 second)
    pub fixed_timestep: f64,
    /// Clamp applied to every frame delta
    pub max_frame_delta: f64,
    /// Fixed steps allowed per frame
    pub max_substeps: u32,
    /// Accumulated time for fixed-step consumption
    accumulator: f64,
    /// Fixed steps consumed since the last advance
    substeps: u32,
    /// Last tick instant
    last_instant: Instant,
    /// Whether this is the first tick
    first_tick: bool,
}

impl Default for GameClock {
    fn default() -> Self {
        Self::from_config(&ClockConfig::default())
    }
}

impl GameClock {
    pub fn from_config(config: &ClockConfig) -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            fixed_timestep: 1.0 / config.fixed_hz.max(1.0),
            max_frame_delta: config.max_frame_delta.max(0.0),
            max_substeps: config.max_substeps.max(1),
            accumulator: 0.0,
            substeps: 0,
            last_instant: Instant::now(),
            first_tick: true,
        }
    }

    /// Advance the clock from the wall clock. Call once per frame.
    pub fn tick(&mut self) {
        let now = Instant::now();

        if self.first_tick {
            self.first_tick = false;
            self.last_instant = now;
            self.advance(0.0);
            return;
        }

        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(elapsed);
    }

    /// Advance the clock by an explicit frame delta (headless and tests)
    pub fn advance(&mut self, elapsed: f64) {
        self.delta_time = elapsed.clamp(0.0, self.max_frame_delta);
        self.total_time += self.delta_time;
        self.accumulator += self.delta_time;
        self.substeps = 0;
    }

    /// Returns true if there's enough accumulated time for a fixed update step
    pub fn should_fixed_update(&self) -> bool {
        self.substeps < self.max_substeps && self.accumulator >= self.fixed_timestep
    }

    /// Consume one fixed timestep from the accumulator
    pub fn consume_fixed_step(&mut self) {
        self.accumulator -= self.fixed_timestep;
        self.substeps += 1;
        if self.substeps >= self.max_substeps {
            // Time that cannot be simulated this frame is dropped, not carried
            self.accumulator %= self.fixed_timestep;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_defaults() {
        let clock = GameClock::default();
        assert!((clock.fixed_timestep - 1.0 / 60.0).abs() < 1e-10);
        assert_eq!(clock.total_time, 0.0);
        assert_eq!(clock.delta_time, 0.0);
        assert_eq!(clock.max_substeps, 3);
    }

    #[test]
    fn test_custom_timestep() {
        let clock = GameClock::from_config(&ClockConfig {
            fixed_hz: 30.0,
            ..ClockConfig::default()
        });
        assert!((clock.fixed_timestep - 1.0 / 30.0).abs() < 1e-10);
    }

    #[test]
    fn test_first_tick_zero_delta() {
        let mut clock = GameClock::default();
        clock.tick();
        assert_eq!(clock.delta_time, 0.0);
    }

    #[test]
    fn frame_delta_is_capped() {
        let mut clock = GameClock::default();
        clock.advance(5.0);
        assert!((clock.delta_time - 0.033).abs() < 1e-12);
        assert!((clock.total_time - 0.033).abs() < 1e-12);
    }

    #[test]
    fn test_accumulator_logic() {
        let mut clock = GameClock::from_config(&ClockConfig {
            max_frame_delta: 0.25,
            ..ClockConfig::default()
        });
        clock.advance(1.0 / 30.0 + 1e-9); // Two fixed steps worth

        assert!(clock.should_fixed_update());
        clock.consume_fixed_step();
        assert!(clock.should_fixed_update());
        clock.consume_fixed_step();
        assert!(!clock.should_fixed_update());
    }

    #[test]
    fn substeps_are_bounded_per_frame() {
        let mut clock = GameClock::from_config(&ClockConfig {
            fixed_hz: 60.0,
            max_frame_delta: 1.0,
            max_substeps: 2,
        });
        clock.advance(0.5);

        let mut steps = 0;
        while clock.should_fixed_update() {
            clock.consume_fixed_step();
            steps += 1;
        }
        assert_eq!(steps, 2);

        // The backlog was dropped, so the next frame starts fresh
        clock.advance(0.0);
        assert!(!clock.should_fixed_update());
    }
}
