//! Terrain chunk mesh generation and deformation

use crate::height_field::HeightField;
use powder_core::{EntityId, Vec3};
use serde::{Deserialize, Serialize};

/// Integer grid coordinate of a chunk
///
/// Chunk `(x, z)` is centered on world `(x * size, z * size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub z: i32,
}

impl ChunkKey {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Key of the chunk whose footprint contains world (x, z)
    pub fn containing(x: f32, z: f32, size: f32) -> Self {
        Self {
            x: (x / size + 0.5).floor() as i32,
            z: (z / size + 0.5).floor() as i32,
        }
    }

    /// World-space center of this chunk at ground level zero
    pub fn center(&self, size: f32) -> Vec3 {
        Vec3::new(self.x as f32 * size, 0.0, self.z as f32 * size)
    }

    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }
}

impl std::fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Tessellation tier of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lod {
    High,
    Low,
}

/// A single chunk of streamed terrain
pub struct TerrainChunk {
    pub key: ChunkKey,
    pub lod: Lod,
    /// Edge length in world units
    pub size: f32,
    /// Quads per edge (vertices = segments + 1)
    pub segments: u32,
    /// Vertex positions in world space
    pub positions: Vec<[f32; 3]>,
    /// Shading normals recomputed from the displaced mesh
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (CCW seen from above)
    pub indices: Vec<u32>,
    /// Pre-deformation vertex heights, captured on the first stamp
    baseline: Option<Vec<f32>>,
    /// Host handle of the chunk's ground collider
    pub body: Option<EntityId>,
    /// Host handles of props scattered on this chunk
    pub props: Vec<EntityId>,
}

impl TerrainChunk {
    /// Tessellate the chunk footprint and displace every vertex by the height field
    pub fn build(field: &HeightField, key: ChunkKey, lod: Lod, size: f32, segments: u32) -> Self {
        let segments = segments.max(1);
        let verts_per_edge = segments + 1;
        let vert_count = (verts_per_edge * verts_per_edge) as usize;

        let center = key.center(size);
        let half = size * 0.5;
        let step = size / segments as f32;

        let mut positions = Vec::with_capacity(vert_count);
        for vz in 0..verts_per_edge {
            for vx in 0..verts_per_edge {
                let x = center.x - half + vx as f32 * step;
                let z = center.z - half + vz as f32 * step;
                positions.push([x, field.height(x, z), z]);
            }
        }

        let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
        for qz in 0..segments {
            for qx in 0..segments {
                let tl = qz * verts_per_edge + qx;
                let tr = tl + 1;
                let bl = tl + verts_per_edge;
                let br = bl + 1;

                // Split along tr-bl, the diagonal a default grid collider uses
                indices.extend_from_slice(&[tl, bl, tr]);
                indices.extend_from_slice(&[bl, br, tr]);
            }
        }

        let mut chunk = Self {
            key,
            lod,
            size,
            segments,
            positions,
            normals: vec![[0.0, 1.0, 0.0]; vert_count],
            indices,
            baseline: None,
            body: None,
            props: Vec::new(),
        };
        chunk.recompute_normals();
        chunk
    }

    /// Area-weighted vertex normals from the current triangles
    pub fn recompute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.positions.len()];

        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa = Vec3::from_array(self.positions[a]);
            let pb = Vec3::from_array(self.positions[b]);
            let pc = Vec3::from_array(self.positions[c]);
            let face = (pb - pa).cross(&(pc - pa));
            accum[a] += face;
            accum[b] += face;
            accum[c] += face;
        }

        self.normals = accum
            .into_iter()
            .map(|n| n.normalized_or(Vec3::UP).to_array())
            .collect();
    }

    /// Press a radial dent into the mesh.
    ///
    /// Vertices within `radius` of (x, z) sink by `max_depth * falloff * strength`
    /// with a linear falloff, and never below `baseline - max_depth`. Returns
    /// whether any vertex moved.
    pub fn stamp(&mut self, x: f32, z: f32, radius: f32, max_depth: f32, strength: f32) -> bool {
        if radius <= 0.0 || max_depth <= 0.0 || strength.is_nan() || strength <= 0.0 {
            return false;
        }

        let positions = &self.positions;
        let baseline = self
            .baseline
            .get_or_insert_with(|| positions.iter().map(|p| p[1]).collect());

        let mut changed = false;
        for (pos, base) in self.positions.iter_mut().zip(baseline.iter()) {
            let dx = pos[0] - x;
            let dz = pos[2] - z;
            let dist = (dx * dx + dz * dz).sqrt();
            if dist > radius {
                continue;
            }
            let falloff = 1.0 - dist / radius;
            let floor = base - max_depth;
            let lowered = (pos[1] - max_depth * falloff * strength).max(floor).min(pos[1]);
            if lowered != pos[1] {
                pos[1] = lowered;
                changed = true;
            }
        }

        if changed {
            self.recompute_normals();
        }
        changed
    }

    /// Undo every stamp. Returns whether the chunk had been deformed.
    pub fn restore(&mut self) -> bool {
        let Some(baseline) = self.baseline.take() else {
            return false;
        };
        for (pos, base) in self.positions.iter_mut().zip(baseline) {
            pos[1] = base;
        }
        self.recompute_normals();
        true
    }

    pub fn is_deformed(&self) -> bool {
        self.baseline.is_some()
    }

    /// Pre-deformation height of vertex `index`
    pub fn baseline_height(&self, index: usize) -> Option<f32> {
        match &self.baseline {
            Some(base) => base.get(index).copied(),
            None => self.positions.get(index).map(|p| p[1]),
        }
    }

    /// Vertex heights as rows along +Z, each row running along +X.
    ///
    /// Every quad is split on its top-right/bottom-left diagonal, the same
    /// split Rapier's heightfield makes for cells without flags. A heightfield
    /// built from this grid therefore reproduces `indices` triangle for triangle.
    pub fn height_grid(&self) -> (usize, Vec<f32>) {
        let verts_per_edge = self.segments as usize + 1;
        (verts_per_edge, self.positions.iter().map(|p| p[1]).collect())
    }

    /// Whether world (x, z) lies in this chunk's footprint (edges inclusive)
    pub fn contains_xz(&self, x: f32, z: f32) -> bool {
        let c = self.key.center(self.size);
        let half = self.size * 0.5;
        (x - c.x).abs() <= half && (z - c.z).abs() <= half
    }

    /// Whether a circle around (x, z) overlaps the footprint
    pub fn overlaps_circle(&self, x: f32, z: f32, radius: f32) -> bool {
        let c = self.key.center(self.size);
        let half = self.size * 0.5;
        let dx = ((x - c.x).abs() - half).max(0.0);
        let dz = ((z - c.z).abs() - half).max(0.0);
        dx * dx + dz * dz <= radius * radius
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
