// Core module with fundamental types
pub mod core;

// Render module with meshing code
pub mod render;

// World module with generation and streaming
pub mod world;

// Other modules
pub mod config;
pub mod constants;

// Re-exports
pub use config::{ConfigError, FieldConfig, WorldConfig};
pub use constants::*;
pub use crate::core::{
    Biome, BlockId, Chunk, ChunkDims, ChunkGeometry, ChunkKey, ChunkState, StructureTag, Vertex,
};
pub use render::VoxelMesher;
pub use world::{
    ChunkManager, DebugStats, MeshSink, NullSink, RecordingSink, TerrainField, VoxelWorld,
    WorldGen, Zone,
};
