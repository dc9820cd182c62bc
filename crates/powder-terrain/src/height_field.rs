//! Seeded height function for the slope

use crate::noise::fbm;
use powder_core::Vec3;
use serde::{Deserialize, Serialize};

/// Quadratic bowl along X that keeps a playable corridor around `center_x`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValleyParams {
    /// World X of the corridor's floor
    pub center_x: f32,
    /// Height gained per squared unit of distance from the floor
    pub curvature: f32,
    /// Cap on the bowl's rise
    pub max_rise: f32,
}

impl Default for ValleyParams {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            curvature: 0.004,
            max_rise: 12.0,
        }
    }
}

/// Shape parameters of the height field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightFieldParams {
    pub seed: u32,
    /// Height gained per unit of +Z; the slope runs downhill toward -Z
    pub base_slope: f32,
    /// Ridge (mountain) relief
    pub mountain_amp: f32,
    pub mountain_freq: f32,
    pub mountain_octaves: u32,
    /// High-frequency bumps
    pub detail_amp: f32,
    pub detail_freq: f32,
    pub detail_octaves: u32,
    pub valley: Option<ValleyParams>,
    /// Finite-difference step for `normal`
    pub normal_epsilon: f32,
}

impl Default for HeightFieldParams {
    fn default() -> Self {
        Self {
            seed: 1337,
            base_slope: 0.3,
            mountain_amp: 6.0,
            mountain_freq: 0.02,
            mountain_octaves: 4,
            detail_amp: 0.4,
            detail_freq: 0.25,
            detail_octaves: 3,
            valley: Some(ValleyParams::default()),
            normal_epsilon: 0.1,
        }
    }
}

impl HeightFieldParams {
    /// A plain inclined plane: `height(x, z) == z * base_slope`
    pub fn flat(base_slope: f32) -> Self {
        Self {
            base_slope,
            mountain_amp: 0.0,
            detail_amp: 0.0,
            valley: None,
            ..Self::default()
        }
    }
}

/// Pure, deterministic terrain height and normal
///
/// Every chunk and every probe samples the same instance, so the surface
/// agrees bit for bit wherever it is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    params: HeightFieldParams,
    /// Decorrelates the detail layer from the ridge layer
    detail_seed: u32,
}

impl HeightField {
    pub fn new(params: HeightFieldParams) -> Self {
        let detail_seed = params.seed.wrapping_mul(0x2545_f491).wrapping_add(0x5bd1_e995);
        Self {
            params,
            detail_seed,
        }
    }

    pub fn params(&self) -> &HeightFieldParams {
        &self.params
    }

    pub fn seed(&self) -> u32 {
        self.params.seed
    }

    /// Terrain height at world (x, z)
    pub fn height(&self, x: f32, z: f32) -> f32 {
        let p = &self.params;
        let mut h = z * p.base_slope;

        if p.mountain_amp != 0.0 {
            let n = fbm(x * p.mountain_freq, z * p.mountain_freq, p.mountain_octaves, p.seed);
            let ridge = 1.0 - (2.0 * n - 1.0).abs();
            h += ridge * p.mountain_amp;
        }

        if p.detail_amp != 0.0 {
            let n = fbm(x * p.detail_freq, z * p.detail_freq, p.detail_octaves, self.detail_seed);
            h += (n - 0.5) * p.detail_amp;
        }

        if let Some(valley) = &p.valley {
            let dx = x - valley.center_x;
            h += (valley.curvature * dx * dx).min(valley.max_rise);
        }

        h
    }

    /// Unit surface normal at world (x, z) by central differences
    pub fn normal(&self, x: f32, z: f32) -> Vec3 {
        let e = self.params.normal_epsilon;
        let n = Vec3::new(
            self.height(x - e, z) - self.height(x + e, z),
            2.0 * e,
            self.height(x, z - e) - self.height(x, z + e),
        );
        n.normalized_or(Vec3::UP)
    }

    /// Angle between the surface normal and world up, in radians
    pub fn slope_angle(&self, x: f32, z: f32) -> f32 {
        self.normal(x, z).y.clamp(-1.0, 1.0).acos()
    }

    /// Unit vector pointing downhill in the XZ plane, if the ground is not flat
    pub fn downhill(&self, x: f32, z: f32) -> Option<Vec3> {
        let n = self.normal(x, z);
        Vec3::new(n.x, 0.0, n.z).try_normalized(1e-4)
    }
}

impl Default for HeightField {
    fn default() -> Self {
        Self::new(HeightFieldParams::default())
    }
}
