use serde::{Deserialize, Serialize};

use crate::core::block::BlockId;

/// Column classification, recomputed from height and moisture on demand.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Biome {
    #[default]
    Plains,
    Forest,
    Alpine,
    Coast,
}

impl Biome {
    pub const ALL: [Biome; 4] = [Biome::Plains, Biome::Forest, Biome::Alpine, Biome::Coast];

    pub fn surface_block(&self) -> BlockId {
        match self {
            Biome::Coast => BlockId::Sand,
            Biome::Alpine => BlockId::Stone,
            Biome::Plains | Biome::Forest => BlockId::Grass,
        }
    }

    pub fn subsoil_block(&self) -> BlockId {
        match self {
            Biome::Coast => BlockId::Sand,
            _ => BlockId::Dirt,
        }
    }
}

/// Landmark membership of a column, independent of biome.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum StructureTag {
    Castle,
    Town,
    Road,
}

impl StructureTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructureTag::Castle => "castle",
            StructureTag::Town => "town",
            StructureTag::Road => "road",
        }
    }

    /// Every tagged column is paved, whatever the biome says.
    pub fn surface_block(&self) -> BlockId {
        BlockId::Cobble
    }
}
