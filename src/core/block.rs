use serde::{Deserialize, Serialize};

/// Material of a single voxel. Stored as one byte per cell in chunk arrays.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum BlockId {
    #[default]
    Air = 0,
    Grass = 1,
    Dirt = 2,
    Stone = 3,
    Sand = 4,
    Water = 5,
    Cobble = 6,
}

impl BlockId {
    pub const ALL: [BlockId; 7] = [
        BlockId::Air,
        BlockId::Grass,
        BlockId::Dirt,
        BlockId::Stone,
        BlockId::Sand,
        BlockId::Water,
        BlockId::Cobble,
    ];

    /// Unknown ids decode as Air so lookups stay total.
    pub fn from_u8(id: u8) -> Self {
        match id {
            1 => BlockId::Grass,
            2 => BlockId::Dirt,
            3 => BlockId::Stone,
            4 => BlockId::Sand,
            5 => BlockId::Water,
            6 => BlockId::Cobble,
            _ => BlockId::Air,
        }
    }

    pub fn color(&self) -> [f32; 3] {
        match self {
            BlockId::Air => [0.0, 0.0, 0.0],
            BlockId::Grass => [0.31, 0.54, 0.25],
            BlockId::Dirt => [0.43, 0.31, 0.2],
            BlockId::Stone => [0.52, 0.55, 0.58],
            BlockId::Sand => [0.71, 0.65, 0.44],
            BlockId::Water => [0.16, 0.34, 0.58],
            BlockId::Cobble => [0.6, 0.6, 0.62],
        }
    }

    pub fn is_air(&self) -> bool {
        *self == BlockId::Air
    }

    pub fn is_opaque(&self) -> bool {
        !matches!(self, BlockId::Air | BlockId::Water)
    }

    pub fn should_render_face_against(&self, neighbor: BlockId) -> bool {
        match self {
            BlockId::Air => false,
            // Water only shows its surface against open air
            BlockId::Water => neighbor == BlockId::Air,
            // Opaque blocks show through air and water, never against each other
            _ => !neighbor.is_opaque(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_matches_material() {
        assert!(!BlockId::Air.is_opaque());
        assert!(!BlockId::Water.is_opaque());
        for block in [
            BlockId::Grass,
            BlockId::Dirt,
            BlockId::Stone,
            BlockId::Sand,
            BlockId::Cobble,
        ] {
            assert!(block.is_opaque(), "{:?} should be opaque", block);
        }
    }

    #[test]
    fn water_faces_only_against_air() {
        assert!(BlockId::Water.should_render_face_against(BlockId::Air));
        assert!(!BlockId::Water.should_render_face_against(BlockId::Water));
        assert!(!BlockId::Water.should_render_face_against(BlockId::Stone));
    }

    #[test]
    fn opaque_faces_against_air_and_water() {
        assert!(BlockId::Stone.should_render_face_against(BlockId::Air));
        assert!(BlockId::Stone.should_render_face_against(BlockId::Water));
        assert!(!BlockId::Stone.should_render_face_against(BlockId::Grass));
        assert!(!BlockId::Air.should_render_face_against(BlockId::Air));
    }

    #[test]
    fn byte_round_trip_and_unknown_ids() {
        for block in BlockId::ALL {
            assert_eq!(BlockId::from_u8(block as u8), block);
        }
        assert_eq!(BlockId::from_u8(200), BlockId::Air);
    }
}
