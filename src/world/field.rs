//! Terrain field sampler
//!
//! Maps a world column (x, z) to a height, a biome and an optional landmark
//! tag. Inside the authored core the landmarks (castle plateau, flattened
//! town, the road between them) shape the ground; past the blend ring the
//! terrain is fully procedural.

use serde::{Deserialize, Serialize};

use crate::config::{FieldConfig, WorldConfig};
use crate::constants::MAX_AUTHORED_HEIGHT;
use crate::core::biome::{Biome, StructureTag};
use crate::world::noise::{Fractal, clamp, distance_to_segment, fbm, lerp, ridged, smoothstep};

const ROLLING: Fractal = Fractal::new(5, 2.02, 0.5);
const RIDGE_MASK: Fractal = Fractal::new(3, 2.1, 0.53);
const DETAIL: Fractal = Fractal::new(2, 2.0, 0.55);
const MOISTURE: Fractal = Fractal::new(3, 2.0, 0.52);

// Radius over which the core lifts from a flat meadow toward procedural relief
const CORE_FLATTEN_RADIUS: f64 = 1500.0;
const CORE_BASE_HEIGHT: f64 = 56.0;

const ALPINE_HEIGHT: f64 = 82.0;
const DRY_MOISTURE: f64 = 0.33;
const WET_MOISTURE: f64 = 0.65;

/// Which side of the blend ring a position is on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Zone {
    Core,
    Blend,
    Frontier,
}

impl Zone {
    pub fn from_blend(blend: f64) -> Self {
        if blend <= 0.0 {
            Zone::Core
        } else if blend >= 1.0 {
            Zone::Frontier
        } else {
            Zone::Blend
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Core => "core",
            Zone::Blend => "blend",
            Zone::Frontier => "frontier",
        }
    }
}

/// Everything WorldGen needs for one column, sampled once.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ColumnSample {
    pub height: i32,
    pub biome: Biome,
    pub tag: Option<StructureTag>,
}

#[derive(Clone, Debug)]
pub struct TerrainField {
    config: FieldConfig,
    sea_level: i32,
}

impl TerrainField {
    pub fn new(config: FieldConfig, sea_level: i32) -> Self {
        TerrainField { config, sea_level }
    }

    pub fn from_world_config(config: &WorldConfig) -> Self {
        Self::new(config.field, config.sea_level)
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn seed(&self) -> u32 {
        self.config.seed
    }

    fn seed_offset(&self, offset: i32) -> i32 {
        (self.config.seed as i32).wrapping_add(offset)
    }

    pub fn height_range(&self) -> (f64, f64) {
        (self.config.min_height, self.config.max_height)
    }

    pub fn is_inside_core(&self, x: f64, z: f64) -> bool {
        x.abs() <= self.config.core_half_size && z.abs() <= self.config.core_half_size
    }

    /// 0 inside the square core, 1 beyond core + ring, eased in between.
    pub fn blend_factor(&self, x: f64, z: f64) -> f64 {
        let edge = x.abs().max(z.abs());
        let core = self.config.core_half_size;
        let outer = core + self.config.blend_ring_size;
        if edge <= core {
            0.0
        } else if edge >= outer {
            1.0
        } else {
            smoothstep(core, outer, edge)
        }
    }

    pub fn zone(&self, x: f64, z: f64) -> Zone {
        Zone::from_blend(self.blend_factor(x, z))
    }

    pub fn sample_procedural_height(&self, x: f64, z: f64) -> f64 {
        let rolling = 45.0 + fbm(x * 0.0011, z * 0.0011, self.seed_offset(17), ROLLING) * 28.0;
        let ridge_mask = smoothstep(
            0.42,
            0.82,
            fbm(
                x * 0.00032 + 9.1,
                z * 0.00032 - 3.4,
                self.seed_offset(59),
                RIDGE_MASK,
            ),
        );
        let ridges = ridged(x * 0.00057, z * 0.00057, self.seed_offset(211), 4) * 58.0 * ridge_mask;
        let detail = (fbm(x * 0.006, z * 0.006, self.seed_offset(401), DETAIL) - 0.5) * 4.0;
        clamp(
            rolling + ridges + detail,
            self.config.min_height,
            self.config.max_height,
        )
    }

    pub fn sample_authored_height(&self, x: f64, z: f64) -> f64 {
        self.authored_from(x, z, self.sample_procedural_height(x, z))
    }

    fn authored_from(&self, x: f64, z: f64, procedural: f64) -> f64 {
        let FieldConfig {
            castle, town, road, ..
        } = self.config;

        let core_flatten = smoothstep(0.0, CORE_FLATTEN_RADIUS, x.hypot(z));
        let mut height = lerp(CORE_BASE_HEIGHT, procedural, core_flatten * 0.75);

        let castle_dist = (x - castle.center.x).hypot(z - castle.center.y);
        if castle_dist < castle.radius {
            let t = 1.0 - castle_dist / castle.radius;
            height += t.powf(1.7) * castle.rise;
        }

        let town_dist = (x - town.center.x).hypot(z - town.center.y);
        if town_dist < town.radius {
            let t = smoothstep(town.radius, 0.0, town_dist);
            height = lerp(height, town.target, t * town.strength);
        }

        let road_dist = self.corridor_distance(x, z);
        if road_dist < road.width {
            let t = smoothstep(road.width, 0.0, road_dist);
            height = lerp(height, road.target, t * road.strength);
        }

        clamp(
            height,
            self.config.min_height,
            self.config.max_height.min(MAX_AUTHORED_HEIGHT),
        )
    }

    fn corridor_distance(&self, x: f64, z: f64) -> f64 {
        let a = self.config.castle.center;
        let b = self.config.town.center;
        distance_to_segment(x, z, a.x, a.y, b.x, b.y)
    }

    /// Ground height at (x, z): always an integer inside the configured range.
    pub fn sample_height(&self, x: f64, z: f64) -> f64 {
        let blend = self.blend_factor(x, z);
        let procedural = self.sample_procedural_height(x, z);
        let base = if blend >= 1.0 {
            procedural
        } else {
            lerp(self.authored_from(x, z, procedural), procedural, blend)
        };

        // Micro relief grows toward the procedural frontier
        let micro =
            (fbm(x * 0.008, z * 0.008, self.seed_offset(607), DETAIL) - 0.5) * (2.0 + blend * 2.0);
        clamp(base + micro, self.config.min_height, self.config.max_height).round()
    }

    pub fn sample_biome(&self, x: f64, z: f64) -> Biome {
        self.biome_at_height(x, z, self.sample_height(x, z))
    }

    fn biome_at_height(&self, x: f64, z: f64, height: f64) -> Biome {
        if height <= (self.sea_level + 2) as f64 {
            return Biome::Coast;
        }

        let moisture = fbm(
            x * 0.00145 + 7.5,
            z * 0.00145 - 2.4,
            self.seed_offset(733),
            MOISTURE,
        );
        if height > ALPINE_HEIGHT || moisture < DRY_MOISTURE {
            Biome::Alpine
        } else if moisture > WET_MOISTURE {
            Biome::Forest
        } else {
            Biome::Plains
        }
    }

    pub fn structure_tag(&self, x: f64, z: f64) -> Option<StructureTag> {
        let FieldConfig {
            castle, town, road, ..
        } = self.config;

        if (x - castle.center.x).hypot(z - castle.center.y) < castle.tag_radius {
            return Some(StructureTag::Castle);
        }
        if (x - town.center.x).hypot(z - town.center.y) < town.tag_radius {
            return Some(StructureTag::Town);
        }
        if self.corridor_distance(x, z) < road.tag_width {
            return Some(StructureTag::Road);
        }
        None
    }

    /// Height, biome and tag for one block column, sharing the height sample.
    pub fn sample_column(&self, x: i32, z: i32) -> ColumnSample {
        let (fx, fz) = (x as f64, z as f64);
        let height = self.sample_height(fx, fz);
        ColumnSample {
            height: height as i32,
            biome: self.biome_at_height(fx, fz, height),
            tag: self.structure_tag(fx, fz),
        }
    }
}
