use glam::DVec3;

use crate::config::{ConfigError, WorldConfig};
use crate::core::block::BlockId;
use crate::world::field::{TerrainField, Zone};
use crate::world::manager::{ChunkManager, DebugStats, MeshSink, NullSink};

const SPAWN_SEARCH_RADIUS: i32 = 50;

/// Field, generator and chunk manager behind the two queries the rest of a
/// game needs: ground height and block lookup.
pub struct VoxelWorld<S: MeshSink = NullSink> {
    field: TerrainField,
    chunks: ChunkManager<S>,
}

impl VoxelWorld<NullSink> {
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        Self::with_sink(config, NullSink)
    }

    pub fn with_seed(seed: u32) -> Result<Self, ConfigError> {
        Self::new(WorldConfig::with_seed(seed))
    }
}

impl<S: MeshSink> VoxelWorld<S> {
    pub fn with_sink(config: WorldConfig, sink: S) -> Result<Self, ConfigError> {
        let chunks = ChunkManager::with_sink(config, sink)?;
        let field = chunks.generator().field().clone();
        tracing::info!(
            "Voxel world ready (seed {}, load radius {}, unload radius {})",
            field.seed(),
            chunks.config().load_radius,
            chunks.config().unload_radius
        );
        Ok(VoxelWorld { field, chunks })
    }

    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.chunks = self.chunks.with_workers(worker_count);
        self
    }

    pub fn seed(&self) -> u32 {
        self.field.seed()
    }

    pub fn field(&self) -> &TerrainField {
        &self.field
    }

    pub fn chunks(&self) -> &ChunkManager<S> {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut ChunkManager<S> {
        &mut self.chunks
    }

    pub fn update(&mut self, x: f64, z: f64) {
        self.chunks.update(x, z);
    }

    /// Ground height at (x, z). Pure; does not depend on what is loaded.
    pub fn height_at(&self, x: f64, z: f64) -> f64 {
        self.field.sample_height(x, z)
    }

    pub fn block_at(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.chunks.block_at_world(x, y, z)
    }

    pub fn debug_stats(&self) -> DebugStats {
        self.chunks.debug_stats()
    }

    /// Stats with the blend reading taken at an arbitrary position.
    pub fn debug_stats_at(&self, x: f64, z: f64) -> DebugStats {
        let blend = self.field.blend_factor(x, z);
        DebugStats {
            blend,
            zone: Zone::from_blend(blend),
            ..self.chunks.debug_stats()
        }
    }

    /// Standing position on the first dry column found spiralling out from
    /// the origin.
    pub fn spawn_point(&self) -> DVec3 {
        let sea_level = self.chunks.config().sea_level as f64;
        for radius in 0..SPAWN_SEARCH_RADIUS {
            for dz in -radius..=radius {
                for dx in -radius..=radius {
                    // Only the ring; the interior was covered by smaller radii
                    if dx.abs() != radius && dz.abs() != radius {
                        continue;
                    }
                    let (x, z) = (dx as f64 + 0.5, dz as f64 + 0.5);
                    let height = self.height_at(x, z);
                    if height >= sea_level {
                        return DVec3::new(x, height + 1.0, z);
                    }
                }
            }
        }
        let (_, max_height) = self.field.height_range();
        DVec3::new(0.5, max_height + 1.0, 0.5)
    }
}
