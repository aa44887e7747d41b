//! Construction-time configuration
//!
//! One immutable, typed parameter set for the whole engine. Everything is
//! validated up front so the streaming loop never has to second-guess it.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;
use crate::core::chunk::ChunkDims;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chunk size must be positive, got {0}")]
    ChunkSize(i32),
    #[error("world height must be positive, got {0}")]
    WorldHeight(i32),
    #[error("sea level {sea_level} must lie inside the world height 0..{world_height}")]
    SeaLevel { sea_level: i32, world_height: i32 },
    #[error("load radius must not be negative, got {0}")]
    LoadRadius(i32),
    #[error("unload radius {unload} must be at least the load radius {load}")]
    UnloadRadius { load: i32, unload: i32 },
    #[error("{0} must be at least 1")]
    FrameBudget(&'static str),
    #[error("terrain height range {min}..={max} must be increasing and below the world height {world_height}")]
    HeightRange { min: f64, max: f64, world_height: i32 },
    #[error("{name} must be a positive finite number, got {value}")]
    Extent { name: &'static str, value: f64 },
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config encoding: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Raised plateau around the keep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plateau {
    pub center: DVec2,
    pub radius: f64,
    pub rise: f64,
    pub tag_radius: f64,
}

/// Circular flattening toward a target height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Flatten {
    pub center: DVec2,
    pub radius: f64,
    pub target: f64,
    pub strength: f64,
    pub tag_radius: f64,
}

/// Flattened road along the straight segment between castle and town.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corridor {
    pub width: f64,
    pub target: f64,
    pub strength: f64,
    pub tag_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub seed: u32,
    pub core_half_size: f64,
    pub blend_ring_size: f64,
    pub castle: Plateau,
    pub town: Flatten,
    pub road: Corridor,
    pub min_height: f64,
    pub max_height: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            seed: DEV_SEED,
            core_half_size: CORE_HALF_SIZE,
            blend_ring_size: BLEND_RING_SIZE,
            castle: Plateau {
                center: DVec2::from_array(CASTLE_CENTER),
                radius: CASTLE_PLATEAU_RADIUS,
                rise: 34.0,
                tag_radius: CASTLE_TAG_RADIUS,
            },
            town: Flatten {
                center: DVec2::from_array(TOWN_CENTER),
                radius: TOWN_FLATTEN_RADIUS,
                target: 54.0,
                strength: 0.72,
                tag_radius: TOWN_TAG_RADIUS,
            },
            road: Corridor {
                width: ROAD_FLATTEN_WIDTH,
                target: 51.0,
                strength: 0.45,
                tag_width: ROAD_TAG_WIDTH,
            },
            min_height: MIN_TERRAIN_HEIGHT,
            max_height: MAX_TERRAIN_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub chunk_size: i32,
    pub world_height: i32,
    pub sea_level: i32,
    pub load_radius: i32,
    pub unload_radius: i32,
    pub max_chunk_builds_per_frame: usize,
    pub max_mesh_builds_per_frame: usize,
    #[serde(default)]
    pub field: FieldConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            world_height: WORLD_HEIGHT,
            sea_level: SEA_LEVEL,
            load_radius: LOAD_RADIUS,
            unload_radius: UNLOAD_RADIUS,
            max_chunk_builds_per_frame: MAX_CHUNK_BUILDS_PER_FRAME,
            max_mesh_builds_per_frame: MAX_MESH_BUILDS_PER_FRAME,
            field: FieldConfig::default(),
        }
    }
}

impl WorldConfig {
    pub fn with_seed(seed: u32) -> Self {
        let mut config = Self::default();
        config.field.seed = seed;
        config
    }

    pub fn dims(&self) -> ChunkDims {
        ChunkDims {
            size: self.chunk_size,
            height: self.world_height,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size <= 0 {
            return Err(ConfigError::ChunkSize(self.chunk_size));
        }
        if self.world_height <= 0 {
            return Err(ConfigError::WorldHeight(self.world_height));
        }
        if self.sea_level < 0 || self.sea_level >= self.world_height {
            return Err(ConfigError::SeaLevel {
                sea_level: self.sea_level,
                world_height: self.world_height,
            });
        }
        if self.load_radius < 0 {
            return Err(ConfigError::LoadRadius(self.load_radius));
        }
        if self.unload_radius < self.load_radius {
            return Err(ConfigError::UnloadRadius {
                load: self.load_radius,
                unload: self.unload_radius,
            });
        }
        if self.max_chunk_builds_per_frame == 0 {
            return Err(ConfigError::FrameBudget("max_chunk_builds_per_frame"));
        }
        if self.max_mesh_builds_per_frame == 0 {
            return Err(ConfigError::FrameBudget("max_mesh_builds_per_frame"));
        }
        self.validate_field()
    }

    fn validate_field(&self) -> Result<(), ConfigError> {
        let field = &self.field;
        if !(field.min_height.is_finite()
            && field.max_height.is_finite()
            && field.min_height < field.max_height
            && field.max_height < self.world_height as f64)
        {
            return Err(ConfigError::HeightRange {
                min: field.min_height,
                max: field.max_height,
                world_height: self.world_height,
            });
        }

        let extents = [
            ("core_half_size", field.core_half_size, true),
            ("blend_ring_size", field.blend_ring_size, false),
            ("castle.radius", field.castle.radius, false),
            ("castle.tag_radius", field.castle.tag_radius, true),
            ("town.radius", field.town.radius, false),
            ("town.tag_radius", field.town.tag_radius, true),
            ("road.width", field.road.width, false),
            ("road.tag_width", field.road.tag_width, true),
        ];
        for (name, value, zero_ok) in extents {
            let valid = value.is_finite() && (value > 0.0 || (zero_ok && value == 0.0));
            if !valid {
                return Err(ConfigError::Extent { name, value });
            }
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let config: WorldConfig = bincode::deserialize_from(&mut reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, self)?;
        Ok(())
    }
}
