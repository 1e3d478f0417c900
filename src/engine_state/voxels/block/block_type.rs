//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world.
//! It provides functionality for block type identification, conversion, and random generation.

use num_derive::FromPrimitive;
use phf::phf_map;

use super::BlockTypeSize;

/// Enumerates all possible block types in the voxel world.
///
/// The discriminant is the block id stored in a chunk cell and forwarded to the GPU as the
/// material id of a geometry point. `NULL` is the only empty type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u16)]
pub enum BlockType {
    /// Empty cell.
    NULL = 0,

    /// Indestructible floor layer.
    BEDROCK = 1,

    /// Plain stone.
    STONE = 2,

    /// Loose sand, the bulk of the reference terrain.
    SAND = 3,

    /// Compressed sand used for the reference platform.
    SANDSTONE = 4,

    /// Dirt found under the grass layer.
    DIRT = 5,

    /// Grass covered surface block.
    GRASS = 6,
}

/// Lookup of block types by their lowercase name.
pub static BLOCK_TYPES_BY_NAME: phf::Map<&'static str, BlockType> = phf_map! {
    "null" => BlockType::NULL,
    "bedrock" => BlockType::BEDROCK,
    "stone" => BlockType::STONE,
    "sand" => BlockType::SAND,
    "sandstone" => BlockType::SANDSTONE,
    "dirt" => BlockType::DIRT,
    "grass" => BlockType::GRASS,
};

impl BlockType {
    /// Converts a stored block id to a `BlockType`.
    ///
    /// # Arguments
    /// * `block_id` - The block id as stored in a chunk cell
    ///
    /// # Returns
    /// The corresponding `BlockType`, or `None` for ids with no block type.
    pub fn from_block_id(block_id: BlockTypeSize) -> Option<Self> {
        num::FromPrimitive::from_u16(block_id)
    }

    /// The compact id stored in chunk cells.
    pub fn block_id(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// Whether this block occupies its cell.
    pub fn is_solid(self) -> bool {
        self != BlockType::NULL
    }

    /// Resolves a block type from its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        BLOCK_TYPES_BY_NAME.get(name).copied()
    }

    /// Generates a random solid block type.
    ///
    /// # Returns
    /// A random `BlockType` that is not `BlockType::NULL`
    pub fn get_random_type() -> Self {
        Self::from_block_id(fastrand::u16(1..=6)).unwrap_or(BlockType::STONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_ids_round_trip_through_the_compact_form() {
        for block_type in BLOCK_TYPES_BY_NAME.values() {
            assert_eq!(
                BlockType::from_block_id(block_type.block_id()),
                Some(*block_type)
            );
        }
        assert_eq!(BlockType::from_block_id(7), None);
    }

    #[test]
    fn only_null_is_empty() {
        assert!(!BlockType::NULL.is_solid());
        assert!(BlockType::SAND.is_solid());
        assert_eq!(BlockType::from_name("sandstone"), Some(BlockType::SANDSTONE));
        assert_eq!(BlockType::from_name("lava"), None);
    }

    #[test]
    fn random_types_are_solid() {
        for _ in 0..64 {
            assert!(BlockType::get_random_type().is_solid());
        }
    }
}
