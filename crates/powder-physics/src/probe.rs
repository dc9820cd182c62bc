//! Ground contact probing beneath the skier

use crate::body::GroundQuery;
use crate::world::QueryLayer;
use powder_core::Vec3;
use serde::{Deserialize, Serialize};

/// How many rays the probe casts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeMode {
    /// One ray straight down from the body center
    Single,
    /// A ring of rays around the body's vertical axis
    Ring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub mode: ProbeMode,
    /// Distance from the body center down to its feet
    pub foot_offset: f32,
    /// Single mode: ray length from the body center
    pub single_length: f32,
    /// Single mode: grounded when the hit is within this much of the feet
    pub single_tolerance: f32,
    /// Ring mode: number of rays
    pub ring_count: u32,
    /// Ring mode: horizontal offset of each ray from the body axis
    pub ring_radius: f32,
    /// Ring mode: how far below the feet a ray still counts
    pub ring_reach: f32,
    /// Ring mode: minimum dot with the mean normal for a hit to be averaged
    pub agreement: f32,
    /// Rate of exponential normal smoothing per second; zero disables it
    pub smoothing_rate: f32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            mode: ProbeMode::Ring,
            foot_offset: 0.95,
            single_length: 3.0,
            single_tolerance: 0.25,
            ring_count: 6,
            ring_radius: 0.2,
            ring_reach: 0.2,
            agreement: 0.7,
            smoothing_rate: 10.0,
        }
    }
}

/// What the probe found under the body this frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbeResult {
    pub grounded: bool,
    /// Contact point of the first hit, when grounded
    pub point: Option<Vec3>,
    /// Averaged surface normal; world up when not grounded
    pub normal: Vec3,
    /// Height of the resolved ground below the feet (positive) or above them
    /// (negative, penetration)
    pub clearance: f32,
    /// Rays that hit
    pub hits: u32,
    /// Hits that agreed with the mean normal
    pub agreeing: u32,
    /// Rays cast
    pub rays: u32,
}

impl ProbeResult {
    pub fn airborne(rays: u32) -> Self {
        Self {
            grounded: false,
            point: None,
            normal: Vec3::UP,
            clearance: f32::INFINITY,
            hits: 0,
            agreeing: 0,
            rays,
        }
    }

    /// Share of cast rays whose normals made it into the average
    pub fn confidence(&self) -> f32 {
        if self.rays == 0 {
            0.0
        } else {
            self.agreeing as f32 / self.rays as f32
        }
    }
}

/// Probe the ground under a body centered at `position`
pub fn probe(query: &dyn GroundQuery, position: Vec3, config: &ProbeConfig) -> ProbeResult {
    match config.mode {
        ProbeMode::Single => probe_single(query, position, config),
        ProbeMode::Ring => probe_ring(query, position, config),
    }
}

fn probe_single(query: &dyn GroundQuery, position: Vec3, config: &ProbeConfig) -> ProbeResult {
    let Some(hit) = query.cast(position, Vec3::DOWN, config.single_length, QueryLayer::Walkable)
    else {
        return ProbeResult::airborne(1);
    };

    if hit.distance > config.foot_offset + config.single_tolerance {
        return ProbeResult::airborne(1);
    }

    ProbeResult {
        grounded: true,
        point: Some(hit.point),
        normal: hit.normal.normalized_or(Vec3::UP),
        clearance: hit.distance - config.foot_offset,
        hits: 1,
        agreeing: 1,
        rays: 1,
    }
}

fn probe_ring(query: &dyn GroundQuery, position: Vec3, config: &ProbeConfig) -> ProbeResult {
    let count = config.ring_count.max(1);
    // Rays start as far above the feet as the center is, so a body sunk into
    // the surface still finds it
    let length = 2.0 * config.foot_offset + config.ring_reach;

    let mut normals = Vec::with_capacity(count as usize);
    let mut first_point = None;
    let mut clearance = f32::INFINITY;

    for i in 0..count {
        let angle = i as f32 / count as f32 * std::f32::consts::TAU;
        let (s, c) = angle.sin_cos();
        let origin = Vec3::new(
            position.x + c * config.ring_radius,
            position.y + config.foot_offset,
            position.z + s * config.ring_radius,
        );

        if let Some(hit) = query.cast(origin, Vec3::DOWN, length, QueryLayer::Walkable) {
            let Some(n) = hit.normal.try_normalized(1e-6) else {
                continue;
            };
            normals.push(n);
            first_point.get_or_insert(hit.point);
            clearance = clearance.min(hit.distance - 2.0 * config.foot_offset);
        }
    }

    if normals.is_empty() {
        return ProbeResult::airborne(count);
    }

    let mean = normals
        .iter()
        .fold(Vec3::ZERO, |acc, n| acc + *n)
        .normalized_or(Vec3::UP);
    let agreeing: Vec<Vec3> = normals
        .iter()
        .copied()
        .filter(|n| n.dot(&mean) > config.agreement)
        .collect();
    let used = if agreeing.is_empty() { &normals } else { &agreeing };
    let normal = used
        .iter()
        .fold(Vec3::ZERO, |acc, n| acc + *n)
        .normalized_or(mean);

    ProbeResult {
        grounded: true,
        point: first_point,
        normal,
        clearance,
        hits: normals.len() as u32,
        agreeing: agreeing.len() as u32,
        rays: count,
    }
}

/// Frame-to-frame exponential smoothing of a unit direction
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NormalSmoother {
    current: Option<Vec3>,
}

impl NormalSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blend toward `target` by `clamp(rate * dt, 0, 1)` and return the result.
    ///
    /// The first sample is taken as is. A degenerate blend keeps the previous
    /// value.
    pub fn update(&mut self, target: Vec3, rate: f32, dt: f32) -> Vec3 {
        let Some(target) = target.try_normalized(1e-6) else {
            return self.current.unwrap_or(Vec3::UP);
        };
        let next = match self.current {
            None => target,
            Some(_) if rate <= 0.0 => target,
            Some(prev) => {
                let t = (rate * dt).clamp(0.0, 1.0);
                prev.lerp(&target, t).try_normalized(1e-6).unwrap_or(prev)
            }
        };
        self.current = Some(next);
        next
    }

    pub fn current(&self) -> Option<Vec3> {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::stub::StubQuery;
    use crate::world::RayHit;

    fn tilted(deg: f32) -> Vec3 {
        let r = deg.to_radians();
        Vec3::new(0.0, r.cos(), -r.sin())
    }

    #[test]
    fn single_ray_grounded_within_threshold() {
        let config = ProbeConfig {
            mode: ProbeMode::Single,
            ..ProbeConfig::default()
        };
        let ground = StubQuery::Plane { normal: Vec3::UP };

        let near = probe(&ground, Vec3::new(0.0, 1.1, 0.0), &config);
        assert!(near.grounded);
        assert!((near.clearance - 0.15).abs() < 1e-5);
        assert_eq!(near.rays, 1);

        // Hit at 2.0 is inside the ray but beyond foot offset + tolerance
        let far = probe(&ground, Vec3::new(0.0, 2.0, 0.0), &config);
        assert!(!far.grounded);
        assert_eq!(far.normal, Vec3::UP);
    }

    #[test]
    fn ring_probe_averages_plane_normal() {
        let config = ProbeConfig::default();
        let n = tilted(20.0);
        let ground = StubQuery::Plane { normal: n };

        let result = probe(&ground, n * 0.95, &config);
        assert!(result.grounded);
        assert_eq!(result.hits, 6);
        assert_eq!(result.agreeing, 6);
        assert!((result.confidence() - 1.0).abs() < 1e-6);
        assert!((result.normal - n).length() < 1e-5);
    }

    #[test]
    fn missing_ground_defaults_to_up() {
        let result = probe(&StubQuery::Nothing, Vec3::new(0.0, 5.0, 0.0), &ProbeConfig::default());
        assert!(!result.grounded);
        assert_eq!(result.normal, Vec3::UP);
        assert_eq!(result.point, None);
        assert_eq!(result.confidence(), 0.0);
    }

    #[test]
    fn ring_probe_detects_penetration() {
        let ground = StubQuery::Plane { normal: Vec3::UP };
        // Feet 0.3 below the surface
        let result = probe(&ground, Vec3::new(0.0, 0.65, 0.0), &ProbeConfig::default());
        assert!(result.grounded);
        assert!((result.clearance + 0.3).abs() < 1e-5);
    }

    /// Ground whose first ray clips a steep prop face
    struct OneOutlier;

    impl GroundQuery for OneOutlier {
        fn cast(&self, origin: Vec3, dir: Vec3, _max: f32, _layer: QueryLayer) -> Option<RayHit> {
            let normal = if origin.x > 0.15 {
                Vec3::new(1.0, 0.0, 0.0)
            } else {
                Vec3::UP
            };
            Some(RayHit {
                point: origin + dir * 1.0,
                normal,
                distance: 1.0,
                entity: None,
            })
        }
    }

    #[test]
    fn outlier_normals_are_rejected() {
        let result = probe(&OneOutlier, Vec3::ZERO, &ProbeConfig::default());
        assert_eq!(result.hits, 6);
        assert_eq!(result.agreeing, 5);
        assert!((result.normal - Vec3::UP).length() < 1e-6);
    }

    #[test]
    fn smoother_blends_and_tolerates_degenerate_input() {
        let mut smoother = NormalSmoother::new();
        assert_eq!(smoother.update(Vec3::UP, 10.0, 1.0 / 60.0), Vec3::UP);

        let target = tilted(40.0);
        let first = smoother.update(target, 10.0, 1.0 / 60.0);
        assert!(first.dot(&Vec3::UP) < 1.0);
        assert!(first.dot(&target) < target.dot(&target));
        assert!((first.length() - 1.0).abs() < 1e-5);

        let held = smoother.update(Vec3::ZERO, 10.0, 1.0 / 60.0);
        assert_eq!(held, first);

        // A large step snaps to the target
        let snapped = smoother.update(target, 10.0, 1.0);
        assert!((snapped - target).length() < 1e-5);
    }
}
