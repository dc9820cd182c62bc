//! Obstacle placement by bounded rejection sampling

use crate::height_field::HeightField;
use powder_core::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Kinds of obstacles scattered on the slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropKind {
    Tree,
    Ramp,
    Snowball,
}

impl PropKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropKind::Tree => "tree",
            PropKind::Ramp => "ramp",
            PropKind::Snowball => "snowball",
        }
    }
}

/// Placement rule for one prop kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterRule {
    pub kind: PropKind,
    /// Target number of props per chunk
    pub count: u32,
    /// Minimum distance to any other prop in the chunk
    pub min_spacing: f32,
    /// Steepest ground the prop may stand on, in degrees
    #[serde(default)]
    pub max_slope_deg: Option<f32>,
    /// Vertical offset above the surface, multiplied by the prop's scale
    #[serde(default)]
    pub height_offset: f32,
    /// Tilt the prop to the local normal instead of standing upright
    #[serde(default)]
    pub align_to_normal: bool,
    /// Uniform scale range (snowball radius, tree size)
    pub scale_min: f32,
    pub scale_max: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterConfig {
    /// Sample budget per requested prop
    pub max_attempts_per_item: u32,
    /// Keep samples this far inside the chunk edge
    pub edge_margin: f32,
    pub rules: Vec<ScatterRule>,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            max_attempts_per_item: 8,
            edge_margin: 1.0,
            rules: vec![
                ScatterRule {
                    kind: PropKind::Tree,
                    count: 6,
                    min_spacing: 4.0,
                    max_slope_deg: Some(35.0),
                    height_offset: 0.0,
                    align_to_normal: false,
                    scale_min: 0.8,
                    scale_max: 1.3,
                },
                ScatterRule {
                    kind: PropKind::Ramp,
                    count: 2,
                    min_spacing: 8.0,
                    max_slope_deg: Some(20.0),
                    height_offset: 0.2,
                    align_to_normal: true,
                    scale_min: 1.0,
                    scale_max: 1.0,
                },
                ScatterRule {
                    kind: PropKind::Snowball,
                    count: 3,
                    min_spacing: 2.5,
                    max_slope_deg: None,
                    height_offset: 1.0,
                    align_to_normal: false,
                    scale_min: 0.5,
                    scale_max: 1.1,
                },
            ],
        }
    }
}

impl ScatterConfig {
    /// A config that places nothing
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            ..Self::default()
        }
    }
}

/// A placed obstacle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterProp {
    pub kind: PropKind,
    /// World position of the prop's base (plus its height offset)
    pub position: Vec3,
    /// Up axis: local normal for aligned props, world up otherwise
    pub up: Vec3,
    /// Heading around `up`, in radians
    pub yaw: f32,
    pub scale: f32,
    /// Spacing this prop demands from its neighbours
    pub min_spacing: f32,
}

/// Scatter props over a square footprint.
///
/// Each rule gets `count * max_attempts_per_item` samples. A sample is kept
/// when the ground is gentle enough for the rule and it sits at least
/// `max(spacing_a, spacing_b)` from every prop accepted so far, whatever its
/// kind. Falling short of `count` is a normal outcome.
pub fn scatter<R: Rng + ?Sized>(
    field: &HeightField,
    center: Vec3,
    size: f32,
    config: &ScatterConfig,
    rng: &mut R,
) -> Vec<ScatterProp> {
    let half = (size * 0.5 - config.edge_margin).max(0.0);
    let mut placed: Vec<ScatterProp> = Vec::new();

    for rule in &config.rules {
        let max_slope = rule.max_slope_deg.map(f32::to_radians);
        let attempts = rule.count.saturating_mul(config.max_attempts_per_item);
        let mut accepted = 0;

        for _ in 0..attempts {
            if accepted >= rule.count {
                break;
            }

            let x = center.x + rng.gen_range(-1.0f32..=1.0) * half;
            let z = center.z + rng.gen_range(-1.0f32..=1.0) * half;

            if let Some(limit) = max_slope {
                if field.slope_angle(x, z) > limit {
                    continue;
                }
            }

            let candidate = Vec3::new(x, 0.0, z);
            let crowded = placed.iter().any(|other| {
                let spacing = rule.min_spacing.max(other.min_spacing);
                other.position.distance_xz(&candidate) < spacing
            });
            if crowded {
                continue;
            }

            let scale = if rule.scale_max > rule.scale_min {
                rng.gen_range(rule.scale_min..=rule.scale_max)
            } else {
                rule.scale_min
            };
            let yaw = rng.gen_range(0.0..std::f32::consts::TAU);
            let up = if rule.align_to_normal {
                field.normal(x, z)
            } else {
                Vec3::UP
            };
            let y = field.height(x, z) + rule.height_offset * scale;

            placed.push(ScatterProp {
                kind: rule.kind,
                position: Vec3::new(x, y, z),
                up,
                yaw,
                scale,
                min_spacing: rule.min_spacing,
            });
            accepted += 1;
        }
    }

    placed
}
