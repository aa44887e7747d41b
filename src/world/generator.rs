//! Thread-safe chunk generation
//!
//! Turns terrain field samples into dense block arrays. Generation only
//! reads the immutable field, so a generator can be cloned onto background
//! threads and chunks can be produced in any order.

use crate::config::WorldConfig;
use crate::constants::{CASTLE_FOUNDATION_DEPTH, SUBSOIL_DEPTH};
use crate::core::biome::StructureTag;
use crate::core::block::BlockId;
use crate::core::chunk::{Chunk, ChunkDims, ChunkState};
use crate::world::field::{ColumnSample, TerrainField};

#[derive(Clone, Debug)]
pub struct WorldGen {
    field: TerrainField,
    dims: ChunkDims,
    sea_level: i32,
}

impl WorldGen {
    pub fn new(field: TerrainField, dims: ChunkDims, sea_level: i32) -> Self {
        WorldGen {
            field,
            dims,
            sea_level,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(
            TerrainField::from_world_config(config),
            config.dims(),
            config.sea_level,
        )
    }

    pub fn field(&self) -> &TerrainField {
        &self.field
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    pub fn seed(&self) -> u32 {
        self.field.seed()
    }

    fn surface_block(column: &ColumnSample) -> BlockId {
        column
            .tag
            .map(|tag| tag.surface_block())
            .unwrap_or_else(|| column.biome.surface_block())
    }

    /// Generate a complete chunk at the given coordinates
    pub fn generate_chunk(&self, cx: i32, cz: i32) -> Chunk {
        let dims = self.dims;
        let mut blocks = vec![BlockId::Air; dims.volume()];
        let base_x = cx * dims.size;
        let base_z = cz * dims.size;

        for lz in 0..dims.size {
            for lx in 0..dims.size {
                let column = self.field.sample_column(base_x + lx, base_z + lz);
                let height = column.height.clamp(1, dims.height - 1);
                let surface = Self::surface_block(&column);
                let subsoil = column.biome.subsoil_block();
                let castle = column.tag == Some(StructureTag::Castle);

                for y in 0..=height {
                    let mut block = if y == height {
                        surface
                    } else if y >= height - SUBSOIL_DEPTH {
                        subsoil
                    } else {
                        BlockId::Stone
                    };

                    // Deeper masonry under the keep
                    if castle && y >= height - CASTLE_FOUNDATION_DEPTH {
                        block = BlockId::Cobble;
                    }

                    blocks[dims.index(lx, y, lz)] = block;
                }

                for y in (height + 1)..=self.sea_level.min(dims.height - 1) {
                    blocks[dims.index(lx, y, lz)] = BlockId::Water;
                }
            }
        }

        let mut chunk = Chunk::from_blocks(cx, cz, dims, blocks);
        chunk.state = ChunkState::Generated;
        chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::core::biome::Biome;

    fn generator() -> WorldGen {
        WorldGen::from_config(&WorldConfig::default())
    }

    fn column_top(chunk: &Chunk, lx: i32, lz: i32) -> i32 {
        (0..chunk.dims.height)
            .rev()
            .find(|&y| {
                let b = chunk.get_block(lx, y, lz);
                b.is_opaque()
            })
            .unwrap()
    }

    #[test]
    fn generation_is_deterministic_and_order_independent() {
        let a = generator();
        let first = a.generate_chunk(3, -2);
        let _ = a.generate_chunk(0, 0);
        let _ = a.generate_chunk(-7, 11);
        let again = a.generate_chunk(3, -2);
        let fresh = generator().generate_chunk(3, -2);
        assert_eq!(first.blocks(), again.blocks());
        assert_eq!(first.blocks(), fresh.blocks());
        assert_eq!(first.state, ChunkState::Generated);
    }

    #[test]
    fn columns_follow_the_sampled_height() {
        let generator = generator();
        let chunk = generator.generate_chunk(40, -35);
        let (bx, bz) = chunk.world_origin();
        for lz in 0..chunk.dims.size {
            for lx in 0..chunk.dims.size {
                let column = generator.field().sample_column(bx + lx, bz + lz);
                let height = column.height.clamp(1, chunk.dims.height - 1);
                assert_eq!(column_top(&chunk, lx, lz), height);
                assert_eq!(chunk.get_block(lx, 0, lz), BlockId::Stone);
                if column.tag.is_none() {
                    assert_eq!(chunk.get_block(lx, height, lz), column.biome.surface_block());
                }
                for y in (height + 1)..chunk.dims.height {
                    let expected = if y <= crate::constants::SEA_LEVEL {
                        BlockId::Water
                    } else {
                        BlockId::Air
                    };
                    assert_eq!(chunk.get_block(lx, y, lz), expected);
                }
            }
        }
    }

    #[test]
    fn subsoil_layers_sit_under_the_surface() {
        let generator = generator();
        let chunk = generator.generate_chunk(-60, 71);
        let (bx, bz) = chunk.world_origin();
        for lz in 0..chunk.dims.size {
            for lx in 0..chunk.dims.size {
                let column = generator.field().sample_column(bx + lx, bz + lz);
                let h = column.height;
                let subsoil = if column.biome == Biome::Coast {
                    BlockId::Sand
                } else {
                    BlockId::Dirt
                };
                for y in (h - SUBSOIL_DEPTH)..h {
                    assert_eq!(chunk.get_block(lx, y, lz), subsoil);
                }
                if h - SUBSOIL_DEPTH - 1 >= 0 {
                    assert_eq!(chunk.get_block(lx, h - SUBSOIL_DEPTH - 1, lz), BlockId::Stone);
                }
            }
        }
    }

    #[test]
    fn castle_columns_are_paved_with_a_foundation() {
        let generator = generator();
        let chunk = generator.generate_chunk(0, 0);
        let column = generator.field().sample_column(0, 0);
        assert_eq!(column.tag, Some(StructureTag::Castle));
        let h = column.height;
        for y in (h - CASTLE_FOUNDATION_DEPTH)..=h {
            assert_eq!(chunk.get_block(0, y, 0), BlockId::Cobble);
        }
        assert_ne!(chunk.get_block(0, h - CASTLE_FOUNDATION_DEPTH - 1, 0), BlockId::Cobble);
    }

    #[test]
    fn road_and_town_surfaces_are_cobble() {
        let generator = generator();
        for (x, z) in [(120, 22), (240, 44)] {
            let key = crate::core::chunk::ChunkKey::from_block(x, z, 16);
            let chunk = generator.generate_chunk(key.cx, key.cz);
            let (lx, lz) = (x.rem_euclid(16), z.rem_euclid(16));
            let h = generator.field().sample_column(x, z).height;
            assert_eq!(chunk.get_block(lx, h, lz), BlockId::Cobble);
            assert_eq!(chunk.get_block(lx, h - 1, lz), BlockId::Dirt);
        }
    }
}
