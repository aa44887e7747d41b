//! Hash-based value noise and its fractal variants
//!
//! Everything here is a pure function of (x, z, seed). No tables, no shared
//! state, so samplers can be called from any thread.

#[inline]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Hermite ease between two edges. Reversed edges are allowed and fall off instead.
#[inline]
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = clamp((x - edge0) / (edge1 - edge0), 0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Lattice hash mapped to [0, 1].
#[inline]
pub fn hash2d(x: i32, z: i32, seed: i32) -> f64 {
    let mut h = (x.wrapping_mul(374_761_393) ^ z.wrapping_mul(668_265_263) ^ seed) as u32;
    h ^= h >> 13;
    h = h.wrapping_mul(1_274_126_177);
    h ^= h >> 16;
    h as f64 / u32::MAX as f64
}

pub fn value_noise_2d(x: f64, z: f64, seed: i32) -> f64 {
    let xf = x.floor();
    let zf = z.floor();
    let xi = xf as i32;
    let zi = zf as i32;

    let v00 = hash2d(xi, zi, seed);
    let v10 = hash2d(xi.wrapping_add(1), zi, seed);
    let v01 = hash2d(xi, zi.wrapping_add(1), seed);
    let v11 = hash2d(xi.wrapping_add(1), zi.wrapping_add(1), seed);

    let u = smoothstep(0.0, 1.0, x - xf);
    let v = smoothstep(0.0, 1.0, z - zf);

    lerp(lerp(v00, v10, u), lerp(v01, v11, u), v)
}

/// Octave layout of a fractal sum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fractal {
    pub octaves: u32,
    pub lacunarity: f64,
    pub gain: f64,
}

impl Fractal {
    pub const fn new(octaves: u32, lacunarity: f64, gain: f64) -> Self {
        Fractal {
            octaves,
            lacunarity,
            gain,
        }
    }
}

impl Default for Fractal {
    fn default() -> Self {
        Fractal::new(4, 2.0, 0.5)
    }
}

/// Normalized fractal sum in [0, 1].
pub fn fbm(x: f64, z: f64, seed: i32, fractal: Fractal) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut norm = 0.0;

    for i in 0..fractal.octaves {
        let octave_seed = seed.wrapping_add((i as i32).wrapping_mul(1013));
        total += value_noise_2d(x * frequency, z * frequency, octave_seed) * amplitude;
        norm += amplitude;
        amplitude *= fractal.gain;
        frequency *= fractal.lacunarity;
    }

    if norm > 0.0 { total / norm } else { 0.0 }
}

/// Ridged multifractal in [0, 1]; sharp crests where the base noise crosses its midpoint.
pub fn ridged(x: f64, z: f64, seed: i32, octaves: u32) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 0.9;
    let mut frequency = 1.0;
    let mut norm = 0.0;

    for i in 0..octaves {
        let octave_seed = seed.wrapping_add((i as i32).wrapping_mul(911));
        let n = value_noise_2d(x * frequency, z * frequency, octave_seed) * 2.0 - 1.0;
        let r = 1.0 - n.abs();
        total += r * r * amplitude;
        norm += amplitude;
        amplitude *= 0.58;
        frequency *= 1.95;
    }

    if norm > 0.0 { total / norm } else { 0.0 }
}

/// Distance from point p to the segment a-b.
pub fn distance_to_segment(px: f64, pz: f64, ax: f64, az: f64, bx: f64, bz: f64) -> f64 {
    let abx = bx - ax;
    let abz = bz - az;
    let denom = abx * abx + abz * abz;
    if denom == 0.0 {
        return (px - ax).hypot(pz - az);
    }
    let t = clamp(((px - ax) * abx + (pz - az) * abz) / denom, 0.0, 1.0);
    (px - (ax + abx * t)).hypot(pz - (az + abz * t))
}
