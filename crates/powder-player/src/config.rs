//! Session configuration
//!
//! Loaded from a TOML file where every section is optional and falls back
//! to the built-in tuning. Precedence (highest wins):
//! 1. `powder-sim` flags such as `--seed`
//! 2. Environment variables: `POWDER_SEED`
//! 3. The config file, when one is given
//! 4. Defaults

use powder_core::{PowderError, Result};
use powder_physics::{ProbeConfig, SkierBodyConfig, SkierTuning};
use powder_runtime::ClockConfig;
use powder_terrain::{HeightFieldParams, ScatterConfig, StampParams, StreamingConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Snow trail left behind a grounded skier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    pub enabled: bool,
    /// Surface speed below which no trail is left
    pub min_speed: f32,
    /// Stamp strength in [0, 1]
    pub strength: f32,
    /// Distance travelled between stamps
    pub spacing: f32,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_speed: 1.0,
            strength: 0.6,
            spacing: 0.35,
        }
    }
}

/// Where the skier starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub x: f32,
    pub z: f32,
    /// Heading in radians; zero faces downhill
    pub yaw: f32,
    /// Gap left between the feet and the terrain at spawn
    pub drop_height: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            z: 0.0,
            yaw: 0.0,
            drop_height: 0.5,
        }
    }
}

/// Everything a ski session can be tuned with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub terrain: HeightFieldParams,
    pub streaming: StreamingConfig,
    pub scatter: ScatterConfig,
    pub stamp: StampParams,
    pub probe: ProbeConfig,
    pub skier: SkierTuning,
    pub body: SkierBodyConfig,
    pub trail: TrailConfig,
    pub clock: ClockConfig,
    pub spawn: SpawnConfig,
}

impl GameConfig {
    /// Load from a TOML file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Built-in defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GameConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("POWDER_SEED") {
            match value.trim().parse() {
                Ok(seed) => self.terrain.seed = seed,
                Err(_) => tracing::warn!("Ignoring POWDER_SEED={:?}: not a u32", value),
            }
        }
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.streaming.chunk_size.is_finite() && self.streaming.chunk_size > 0.0) {
            return Err(PowderError::Config(format!(
                "streaming.chunk_size must be positive, got {}",
                self.streaming.chunk_size
            )));
        }
        if self.streaming.high_radius < 0 || self.streaming.low_radius < self.streaming.high_radius
        {
            return Err(PowderError::Config(format!(
                "streaming radii must satisfy 0 <= high ({}) <= low ({})",
                self.streaming.high_radius, self.streaming.low_radius
            )));
        }
        if !(self.clock.fixed_hz.is_finite() && self.clock.fixed_hz > 0.0) {
            return Err(PowderError::Config(format!(
                "clock.fixed_hz must be positive, got {}",
                self.clock.fixed_hz
            )));
        }
        if !(self.body.mass.is_finite() && self.body.mass > 0.0) {
            return Err(PowderError::Config(format!(
                "body.mass must be positive, got {}",
                self.body.mass
            )));
        }
        let impact = self.body.impact_threshold;
        if impact.is_nan() || impact <= 0.0 {
            return Err(PowderError::Config(format!(
                "body.impact_threshold must be positive, got {}",
                impact
            )));
        }
        Ok(())
    }
}
