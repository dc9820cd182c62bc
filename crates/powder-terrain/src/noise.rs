//! Lattice value noise and fractal sums

/// Hash an integer lattice point to [0, 1)
pub fn lattice_value(ix: i32, iz: i32, seed: u32) -> f32 {
    let mut h = (ix as u32)
        .wrapping_mul(0x27d4_eb2d)
        .wrapping_add((iz as u32).wrapping_mul(0x1656_67b1))
        .wrapping_add(seed.wrapping_mul(0x9e37_79b9));
    h = (h ^ (h >> 15)).wrapping_mul(0x85eb_ca6b);
    h = (h ^ (h >> 13)).wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    // Top 24 bits fit an f32 mantissa exactly
    (h >> 8) as f32 / 16_777_216.0
}

/// Cubic blend 3t² - 2t³
#[inline]
fn fade(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Value noise at a continuous point, in [0, 1)
///
/// Bilinear blend of the four surrounding lattice values. Continuous across
/// cell edges because the blend weights reach exactly 0 and 1 there.
pub fn value_noise(x: f32, z: f32, seed: u32) -> f32 {
    let x0 = x.floor();
    let z0 = z.floor();
    let tx = fade(x - x0);
    let tz = fade(z - z0);

    let ix = x0 as i32;
    let iz = z0 as i32;

    let v00 = lattice_value(ix, iz, seed);
    let v10 = lattice_value(ix.wrapping_add(1), iz, seed);
    let v01 = lattice_value(ix, iz.wrapping_add(1), seed);
    let v11 = lattice_value(ix.wrapping_add(1), iz.wrapping_add(1), seed);

    let a = v00 + (v10 - v00) * tx;
    let b = v01 + (v11 - v01) * tx;
    a + (b - a) * tz
}

/// Fractal Brownian motion: octaves of value noise at doubling frequency and
/// halving amplitude, normalized by total amplitude to stay in [0, 1)
pub fn fbm(x: f32, z: f32, octaves: u32, seed: u32) -> f32 {
    let mut sum = 0.0;
    let mut total = 0.0;
    let mut amp = 1.0;
    let mut freq = 1.0;

    for octave in 0..octaves {
        let octave_seed = seed.wrapping_add(octave.wrapping_mul(0x68bc_21eb));
        sum += amp * value_noise(x * freq, z * freq, octave_seed);
        total += amp;
        amp *= 0.5;
        freq *= 2.0;
    }

    if total > 0.0 {
        sum / total
    } else {
        0.0
    }
}
