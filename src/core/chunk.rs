use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::block::BlockId;
use crate::core::vertex::ChunkGeometry;

/// Composite integer key of a chunk column.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkKey {
    pub const fn new(cx: i32, cz: i32) -> Self {
        ChunkKey { cx, cz }
    }

    /// Chunk containing the world position, flooring toward negative infinity.
    /// Clamped so block coordinates of the chunk and its surroundings fit in i32.
    pub fn from_world(x: f64, z: f64, chunk_size: i32) -> Self {
        let size = chunk_size as f64;
        let limit = Self::coord_limit(chunk_size);
        ChunkKey {
            cx: ((x / size).floor() as i32).clamp(-limit, limit),
            cz: ((z / size).floor() as i32).clamp(-limit, limit),
        }
    }

    /// Largest chunk coordinate a viewpoint maps to; half the i32 block range.
    pub fn coord_limit(chunk_size: i32) -> i32 {
        i32::MAX / chunk_size.max(1) / 2
    }

    pub fn from_block(x: i32, z: i32, chunk_size: i32) -> Self {
        ChunkKey {
            cx: x.div_euclid(chunk_size),
            cz: z.div_euclid(chunk_size),
        }
    }

    pub fn chebyshev(&self, other: ChunkKey) -> i32 {
        (self.cx - other.cx).abs().max((self.cz - other.cz).abs())
    }

    /// Axis neighbors in +X, -X, +Z, -Z order.
    pub fn neighbors(&self) -> [ChunkKey; 4] {
        [
            ChunkKey::new(self.cx + 1, self.cz),
            ChunkKey::new(self.cx - 1, self.cz),
            ChunkKey::new(self.cx, self.cz + 1),
            ChunkKey::new(self.cx, self.cz - 1),
        ]
    }

    /// Every key within `radius` (Chebyshev) of this one, row by row.
    pub fn square(&self, radius: i32) -> impl Iterator<Item = ChunkKey> + use<> {
        let center = *self;
        (-radius..=radius).flat_map(move |dz| {
            (-radius..=radius).map(move |dx| ChunkKey::new(center.cx + dx, center.cz + dz))
        })
    }
}

/// Horizontal and vertical extent of every chunk.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ChunkDims {
    pub size: i32,
    pub height: i32,
}

impl ChunkDims {
    pub fn volume(&self) -> usize {
        (self.size * self.size * self.height) as usize
    }

    /// x fastest, then z, then y.
    #[inline]
    pub fn index(&self, lx: i32, y: i32, lz: i32) -> usize {
        (lx + self.size * (lz + self.size * y)) as usize
    }

    #[inline]
    pub fn contains_local(&self, lx: i32, y: i32, lz: i32) -> bool {
        lx >= 0 && lx < self.size && lz >= 0 && lz < self.size && y >= 0 && y < self.height
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ChunkState {
    New,
    Generated,
    /// Meshed, but nothing visible to draw.
    Meshed,
    /// Meshed with attached geometry.
    Active,
}

pub struct Chunk {
    pub key: ChunkKey,
    pub dims: ChunkDims,
    blocks: Arc<[BlockId]>,
    pub mesh: Option<Arc<ChunkGeometry>>,
    pub dirty: bool,
    pub state: ChunkState,
    /// Bumped by the manager each time the key is (re)loaded.
    pub epoch: u64,
}

impl Chunk {
    pub fn new(cx: i32, cz: i32, dims: ChunkDims) -> Self {
        Self::from_blocks(cx, cz, dims, vec![BlockId::Air; dims.volume()])
    }

    /// Wraps a finished block array. Wrong-length input is resized with Air.
    pub fn from_blocks(cx: i32, cz: i32, dims: ChunkDims, mut blocks: Vec<BlockId>) -> Self {
        blocks.resize(dims.volume(), BlockId::Air);
        Chunk {
            key: ChunkKey::new(cx, cz),
            dims,
            blocks: blocks.into(),
            mesh: None,
            dirty: true,
            state: ChunkState::New,
            epoch: 0,
        }
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// Cheap shared handle for snapshots handed to workers.
    pub fn shared_blocks(&self) -> Arc<[BlockId]> {
        Arc::clone(&self.blocks)
    }

    /// Read-only copy sharing the block array, without geometry.
    pub fn snapshot(&self) -> Chunk {
        Chunk {
            key: self.key,
            dims: self.dims,
            blocks: self.shared_blocks(),
            mesh: None,
            dirty: false,
            state: self.state,
            epoch: self.epoch,
        }
    }

    pub fn get_block(&self, lx: i32, y: i32, lz: i32) -> BlockId {
        if self.dims.contains_local(lx, y, lz) {
            self.blocks[self.dims.index(lx, y, lz)]
        } else {
            BlockId::Air
        }
    }

    pub fn world_origin(&self) -> (i32, i32) {
        (self.key.cx * self.dims.size, self.key.cz * self.dims.size)
    }
}
