//! Core data structures for the terrain engine
//! Contains fundamental types like blocks, biomes, chunks, and vertices.

pub mod biome;
pub mod block;
pub mod chunk;
pub mod vertex;

// Re-export commonly used types
pub use biome::{Biome, StructureTag};
pub use block::BlockId;
pub use chunk::{Chunk, ChunkDims, ChunkKey, ChunkState};
pub use vertex::{ChunkGeometry, Vertex};
