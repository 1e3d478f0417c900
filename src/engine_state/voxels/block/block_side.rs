//! # Block Side Module
//!
//! This module defines the six faces of a voxel block, the grid offset towards the
//! neighbour behind each face, and the bit each face owns in a face-visibility mask.

use cgmath::Vector3;

/// Mask with every face visible.
pub const ALL_FACES_MASK: u8 = 0b11_1111;

/// Represents the six possible faces of a voxel block.
///
/// The discriminant is the bit index of the face in a face mask, which is also the order the
/// voxel shader expands faces in. World space is Z-up.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The face looking towards negative Y
    SOUTH = 0,

    /// The face looking towards positive Y
    NORTH = 1,

    /// The face looking towards negative X
    WEST = 2,

    /// The face looking towards positive X
    EAST = 3,

    /// The face looking towards negative Z
    BOTTOM = 4,

    /// The face looking towards positive Z
    TOP = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in mask bit order.
    pub const fn all() -> [BlockSide; 6] {
        [
            BlockSide::SOUTH,
            BlockSide::NORTH,
            BlockSide::WEST,
            BlockSide::EAST,
            BlockSide::BOTTOM,
            BlockSide::TOP,
        ]
    }

    /// The bit this face owns in a face mask.
    pub const fn mask_bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Offset from a cell to the neighbour covering this face.
    pub const fn neighbour_offset(self) -> [i32; 3] {
        match self {
            BlockSide::SOUTH => [0, -1, 0],
            BlockSide::NORTH => [0, 1, 0],
            BlockSide::WEST => [-1, 0, 0],
            BlockSide::EAST => [1, 0, 0],
            BlockSide::BOTTOM => [0, 0, -1],
            BlockSide::TOP => [0, 0, 1],
        }
    }

    /// Outward unit normal of the face.
    pub fn normal(self) -> Vector3<f32> {
        let [x, y, z] = self.neighbour_offset();
        Vector3::new(x as f32, y as f32, z as f32)
    }
}
