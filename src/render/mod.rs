//! Rendering-side modules
//! Contains quad emission and the face-culled chunk mesher.

pub mod mesh;
pub mod mesher;

// Re-export commonly used types
pub use mesh::write_quad;
pub use mesher::{FACES, FaceDef, VoxelMesher};
