//! World generation and management modules
//! Contains the terrain field, chunk generation, streaming and the world facade.

pub mod field;
pub mod generator;
pub mod loader;
pub mod manager;
pub mod noise;
pub mod voxel_world;

// Re-export commonly used types
pub use field::{ColumnSample, TerrainField, Zone};
pub use generator::WorldGen;
pub use loader::{ChunkLoader, ChunkSnapshot, JobOutcome, MeshLoader, WorkerPool};
pub use manager::{ChunkManager, DebugStats, MeshSink, NullSink, RecordingSink};
pub use voxel_world::VoxelWorld;
