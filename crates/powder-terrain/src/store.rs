//! Chunk streaming around a moving focus point

use crate::chunk::{ChunkKey, Lod, TerrainChunk};
use crate::height_field::HeightField;
use crate::host::TerrainHost;
use crate::scatter::{scatter, ScatterConfig};
use powder_core::{EntityId, Vec3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Window sizes and tessellation of streamed chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Chunk edge length in world units
    pub chunk_size: f32,
    /// Quads per edge for high-detail chunks
    pub high_segments: u32,
    /// Quads per edge for low-detail chunks
    pub low_segments: u32,
    /// Chebyshev radius (in chunks) of the high-detail window
    pub high_radius: i32,
    /// Chebyshev radius (in chunks) of the low-detail window
    pub low_radius: i32,
    /// Extra low-detail chunks added on the side the focus is travelling toward
    pub ahead_margin: i32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 32.0,
            high_segments: 32,
            low_segments: 8,
            high_radius: 1,
            low_radius: 2,
            ahead_margin: 2,
        }
    }
}

impl StreamingConfig {
    pub fn segments(&self, lod: Lod) -> u32 {
        match lod {
            Lod::High => self.high_segments,
            Lod::Low => self.low_segments,
        }
    }
}

/// Shape of a deformation stamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampParams {
    pub radius: f32,
    /// Deepest a vertex may sink below its baseline
    pub max_depth: f32,
}

impl Default for StampParams {
    fn default() -> Self {
        Self {
            radius: 0.6,
            max_depth: 0.18,
        }
    }
}

/// What one `update` call changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub created: Vec<ChunkKey>,
    /// Chunks torn down and rebuilt at a different LOD
    pub rebuilt: Vec<ChunkKey>,
    pub retired: Vec<ChunkKey>,
}

impl UpdateReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.rebuilt.is_empty() && self.retired.is_empty()
    }
}

/// Owns every resident terrain chunk and pages them around a focus point
pub struct ChunkStore {
    field: HeightField,
    config: StreamingConfig,
    scatter: ScatterConfig,
    stamp: StampParams,
    chunks: HashMap<ChunkKey, TerrainChunk>,
    /// Axis signs the low window currently leans toward, as (x, z)
    lean: (i32, i32),
}

/// Travel component along an axis needed to start leaning toward it
const LEAN_ENGAGE: f32 = 0.5;
/// Travel component below which an established lean is dropped
const LEAN_RELEASE: f32 = 0.2;

/// Next lean sign along one axis. Between the thresholds the previous lean
/// holds, so weaving across an axis does not flip the window every turn.
fn next_lean(prev: i32, component: f32) -> i32 {
    if component > LEAN_ENGAGE {
        1
    } else if component < -LEAN_ENGAGE {
        -1
    } else if prev != 0 && component * prev as f32 > LEAN_RELEASE {
        prev
    } else {
        0
    }
}

impl ChunkStore {
    pub fn new(
        field: HeightField,
        config: StreamingConfig,
        scatter: ScatterConfig,
        stamp: StampParams,
    ) -> Self {
        Self {
            field,
            config,
            scatter,
            stamp,
            chunks: HashMap::new(),
            lean: (0, 0),
        }
    }

    pub fn field(&self) -> &HeightField {
        &self.field
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Axis signs the low window leans toward after the last update
    pub fn lean(&self) -> (i32, i32) {
        self.lean
    }

    /// Lean that `travel` would leave behind, starting from the current one.
    ///
    /// No travel means no lean. A travel too slow to have a direction keeps
    /// the current lean.
    fn lean_for(&self, travel: Option<Vec3>) -> (i32, i32) {
        let Some(travel) = travel else {
            return (0, 0);
        };
        match Vec3::new(travel.x, 0.0, travel.z).try_normalized(1e-3) {
            Some(dir) => (next_lean(self.lean.0, dir.x), next_lean(self.lean.1, dir.z)),
            None => self.lean,
        }
    }

    /// Chunk keys the store should hold for `focus`, with their LOD.
    ///
    /// The low window is widened by `ahead_margin` on each axis the travel
    /// direction leans toward; anything inside it but outside the high
    /// window is `Lod::Low`. The lean carries over from the last update, so
    /// this is what the next `update_directed` call would converge to.
    pub fn desired_set(&self, focus: Vec3, travel: Option<Vec3>) -> BTreeMap<ChunkKey, Lod> {
        self.window(focus, self.lean_for(travel))
    }

    fn window(&self, focus: Vec3, lean: (i32, i32)) -> BTreeMap<ChunkKey, Lod> {
        let size = self.config.chunk_size;
        let center = ChunkKey::containing(focus.x, focus.z, size);
        let high = self.config.high_radius.max(0);
        let low = self.config.low_radius.max(high);

        let (mut x_min, mut x_max, mut z_min, mut z_max) = (-low, low, -low, low);
        let ahead = self.config.ahead_margin.max(0);
        match lean.0 {
            1 => x_max += ahead,
            -1 => x_min -= ahead,
            _ => {}
        }
        match lean.1 {
            1 => z_max += ahead,
            -1 => z_min -= ahead,
            _ => {}
        }

        let mut desired = BTreeMap::new();
        for dz in z_min..=z_max {
            for dx in x_min..=x_max {
                let lod = if dx.abs() <= high && dz.abs() <= high {
                    Lod::High
                } else {
                    Lod::Low
                };
                desired.insert(center.offset(dx, dz), lod);
            }
        }
        desired
    }

    /// Stream chunks around `focus` with no travel bias
    pub fn update(&mut self, focus: Vec3, host: &mut dyn TerrainHost) -> UpdateReport {
        self.update_directed(focus, None, host)
    }

    /// Bring the resident set in line with `desired_set(focus, travel)`.
    ///
    /// Retires chunks that fell out of the window, rebuilds chunks whose LOD
    /// changed, then builds the missing ones. Calling it again with the same
    /// arguments changes nothing.
    pub fn update_directed(
        &mut self,
        focus: Vec3,
        travel: Option<Vec3>,
        host: &mut dyn TerrainHost,
    ) -> UpdateReport {
        let lean = self.lean_for(travel);
        if lean != self.lean {
            debug!("Streaming window now leans {:?}", lean);
            self.lean = lean;
        }
        let desired = self.window(focus, lean);
        let mut report = UpdateReport::default();

        let mut stale: Vec<ChunkKey> = self
            .chunks
            .keys()
            .filter(|key| !desired.contains_key(key))
            .copied()
            .collect();
        stale.sort();
        for key in stale {
            if let Some(chunk) = self.chunks.remove(&key) {
                Self::release_chunk(chunk, host);
                debug!("Retired chunk {}", key);
                report.retired.push(key);
            }
        }

        for (&key, &lod) in &desired {
            match self.chunks.get(&key).map(|c| c.lod) {
                Some(current) if current == lod => {}
                Some(_) => {
                    if let Some(old) = self.chunks.remove(&key) {
                        Self::release_chunk(old, host);
                    }
                    let chunk = self.build_chunk(key, lod, host);
                    self.chunks.insert(key, chunk);
                    debug!("Rebuilt chunk {} at {:?}", key, lod);
                    report.rebuilt.push(key);
                }
                None => {
                    let chunk = self.build_chunk(key, lod, host);
                    self.chunks.insert(key, chunk);
                    debug!("Created chunk {} at {:?}", key, lod);
                    report.created.push(key);
                }
            }
        }

        report
    }

    fn build_chunk(&self, key: ChunkKey, lod: Lod, host: &mut dyn TerrainHost) -> TerrainChunk {
        let size = self.config.chunk_size;
        let mut chunk =
            TerrainChunk::build(&self.field, key, lod, size, self.config.segments(lod));

        match host.attach_chunk(&chunk) {
            Ok(handle) => chunk.body = Some(handle),
            Err(e) => warn!("Chunk {} has no ground object: {}", key, e),
        }

        let mut rng = ChaCha8Rng::seed_from_u64(chunk_seed(self.field.seed(), key));
        for prop in scatter(&self.field, key.center(size), size, &self.scatter, &mut rng) {
            match host.attach_prop(&prop) {
                Ok(handle) => chunk.props.push(handle),
                Err(e) => warn!("Dropped {} on chunk {}: {}", prop.kind.as_str(), key, e),
            }
        }

        chunk
    }

    fn release_chunk(chunk: TerrainChunk, host: &mut dyn TerrainHost) {
        for handle in chunk.props.iter().copied().chain(chunk.body) {
            release_handle(handle, host);
        }
    }

    /// Dent the terrain around world (x, z).
    ///
    /// Every resident chunk the stamp circle overlaps is deformed, so stamps
    /// that straddle a chunk edge dent both sides consistently. Returns the
    /// number of chunks that changed.
    pub fn stamp_terrain(
        &mut self,
        x: f32,
        z: f32,
        strength: f32,
        host: &mut dyn TerrainHost,
    ) -> usize {
        let StampParams { radius, max_depth } = self.stamp;
        let size = self.config.chunk_size;
        let lo = ChunkKey::containing(x - radius, z - radius, size);
        let hi = ChunkKey::containing(x + radius, z + radius, size);

        let mut touched = 0;
        for kz in lo.z..=hi.z {
            for kx in lo.x..=hi.x {
                let Some(chunk) = self.chunks.get_mut(&ChunkKey::new(kx, kz)) else {
                    continue;
                };
                if !chunk.overlaps_circle(x, z, radius) {
                    continue;
                }
                if chunk.stamp(x, z, radius, max_depth, strength) {
                    touched += 1;
                    if let Some(handle) = chunk.body {
                        if let Err(e) = host.refresh_chunk(handle, chunk) {
                            warn!("Failed to refresh chunk {}: {}", chunk.key, e);
                        }
                    }
                }
            }
        }

        if touched > 0 {
            debug!("Stamped ({:.2}, {:.2}) across {} chunk(s)", x, z, touched);
        }
        touched
    }

    /// Undo every deformation on resident chunks
    pub fn clear_deformation(&mut self, host: &mut dyn TerrainHost) -> usize {
        let mut restored = 0;
        for chunk in self.chunks.values_mut() {
            if chunk.restore() {
                restored += 1;
                if let Some(handle) = chunk.body {
                    if let Err(e) = host.refresh_chunk(handle, chunk) {
                        warn!("Failed to refresh chunk {}: {}", chunk.key, e);
                    }
                }
            }
        }
        restored
    }

    /// Analytic terrain height (ignores deformation)
    pub fn height(&self, x: f32, z: f32) -> f32 {
        self.field.height(x, z)
    }

    /// Analytic terrain normal (ignores deformation)
    pub fn normal(&self, x: f32, z: f32) -> Vec3 {
        self.field.normal(x, z)
    }

    pub fn chunk(&self, key: ChunkKey) -> Option<&TerrainChunk> {
        self.chunks.get(&key)
    }

    /// Resident chunk keys in sorted order
    pub fn keys(&self) -> Vec<ChunkKey> {
        let mut keys: Vec<_> = self.chunks.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Props currently tracked across all chunks
    pub fn prop_count(&self) -> usize {
        self.chunks.values().map(|c| c.props.len()).sum()
    }

    /// Drop every chunk and hand its objects back to the host
    pub fn release_all(&mut self, host: &mut dyn TerrainHost) {
        let count = self.chunks.len();
        for (_, chunk) in self.chunks.drain() {
            Self::release_chunk(chunk, host);
        }
        debug!("Released {} chunk(s)", count);
    }
}

fn release_handle(handle: EntityId, host: &mut dyn TerrainHost) {
    if let Err(e) = host.release(handle) {
        warn!("Failed to release {}: {}", handle, e);
    }
}

/// Per-chunk scatter seed, stable across rebuilds and runs
fn chunk_seed(seed: u32, key: ChunkKey) -> u64 {
    let mut h = ((seed as u64) << 32) ^ 0x9e37_79b9_7f4a_7c15;
    h ^= (key.x as u32 as u64).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = h.rotate_left(31);
    h ^= (key.z as u32 as u64).wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^ (h >> 29)
}
