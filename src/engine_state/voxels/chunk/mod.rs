//! # Chunk Module
//!
//! This module provides the `Chunk` struct: one dense cubic grid of block ids with edge
//! length `S`, the unit of meshing.
//!
//! ## Storage
//!
//! - `blocks`: one `BlockTypeSize` per cell, in linear order `z * S * S + y * S + x`
//! - `solid_array`: a bit vector (1 bit per cell) mirroring `blocks[i] != NULL`, so
//!   neighbour tests during meshing never touch the block ids
//! - `bodies`: the static collision body owned by each meshed cell, if any
//!
//! ### Performance Characteristics
//! - **Solidity Check**: O(1) - Just check the bit in `solid_array`
//! - **Block Lookup**: O(1) - Direct index into `blocks`
//! - **Memory Usage**: 2 bytes + 1 bit + one `Option<BodyHandle>` per cell

use bitvec::prelude::BitVec;
use cgmath::Point3;
use log::debug;

use super::block::block_side::BlockSide;
use super::block::block_type::BlockType;
use super::block::BlockTypeSize;
use crate::engine_state::physics::BodyHandle;

pub mod generation;

use generation::ChunkGenerator;

/// Dense cubic grid of voxel cells.
///
/// A chunk starts dirty; the mesher regenerates geometry and collision bodies for a dirty
/// chunk in full and then marks it clean. Any edit marks it dirty again.
pub struct Chunk {
    /// Edge length in cells.
    edge: usize,

    /// Block id of every cell.
    blocks: Vec<BlockTypeSize>,

    /// Solidity of every cell.
    solid_array: BitVec,

    /// Static collision body created for each emitted cell during the last meshing pass.
    bodies: Vec<Option<BodyHandle>>,

    /// Whether the derived mesh and bodies are stale.
    dirty: bool,
}

impl Chunk {
    /// Creates an empty chunk.
    ///
    /// # Arguments
    /// * `edge` - Edge length in cells, must be positive
    pub fn new(edge: usize) -> Self {
        assert!(edge > 0, "chunk edge must be positive");
        let cell_count = edge * edge * edge;
        Self {
            edge,
            blocks: vec![BlockType::NULL.block_id(); cell_count],
            solid_array: BitVec::repeat(false, cell_count),
            bodies: vec![None; cell_count],
            dirty: true,
        }
    }

    /// Creates a chunk from raw block ids in linear cell order.
    ///
    /// # Panics
    /// Panics when `block_ids.len()` is not `edge³` or an id names no block type.
    pub fn from_block_ids(edge: usize, block_ids: Vec<BlockTypeSize>) -> Self {
        let mut chunk = Self::new(edge);
        assert_eq!(
            block_ids.len(),
            chunk.blocks.len(),
            "grid size mismatch for a chunk of edge {edge}"
        );
        for (index, block_id) in block_ids.iter().enumerate() {
            let Some(block_type) = BlockType::from_block_id(*block_id) else {
                panic!("unknown block id {block_id} at cell {index}");
            };
            chunk.solid_array.set(index, block_type.is_solid());
        }
        chunk.blocks = block_ids;
        chunk
    }

    /// Creates a chunk by asking `generator` for every cell exactly once.
    pub fn generate(edge: usize, generator: &dyn ChunkGenerator) -> Self {
        let mut chunk = Self::new(edge);
        chunk.populate(generator);
        chunk
    }

    /// Refreshes every cell from `generator` and marks the chunk dirty.
    pub fn populate(&mut self, generator: &dyn ChunkGenerator) {
        let edge = self.edge;
        let mut index = 0;
        for z in 0..edge {
            for y in 0..edge {
                for x in 0..edge {
                    let block_type = generator.block_at(Point3::new(x, y, z), edge);
                    self.blocks[index] = block_type.block_id();
                    self.solid_array.set(index, block_type.is_solid());
                    index += 1;
                }
            }
        }
        self.dirty = true;

        debug!(
            "Generated chunk with edge {} ({} solid cells)",
            edge,
            self.solid_count()
        );
    }

    /// Edge length in cells.
    pub fn edge(&self) -> usize {
        self.edge
    }

    /// Number of cells, `edge³`.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always `false`; a chunk has at least one cell.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Linear index of a cell.
    ///
    /// # Panics
    /// Panics when the cell lies outside the grid.
    pub fn index(&self, cell: Point3<usize>) -> usize {
        assert!(
            cell.x < self.edge && cell.y < self.edge && cell.z < self.edge,
            "cell {:?} outside a chunk of edge {}",
            cell,
            self.edge
        );
        (cell.z * self.edge + cell.y) * self.edge + cell.x
    }

    /// Cell coordinate of a linear index.
    pub fn cell(&self, index: usize) -> Point3<usize> {
        let plane = self.edge * self.edge;
        Point3::new(index % self.edge, (index / self.edge) % self.edge, index / plane)
    }

    /// Block type of a cell.
    pub fn block_at(&self, cell: Point3<usize>) -> BlockType {
        let block_id = self.blocks[self.index(cell)];
        BlockType::from_block_id(block_id).unwrap_or(BlockType::NULL)
    }

    /// Raw block ids in linear order.
    pub fn block_ids(&self) -> &[BlockTypeSize] {
        &self.blocks
    }

    /// Whether a cell is occupied.
    pub fn is_solid(&self, cell: Point3<usize>) -> bool {
        self.solid_array[self.index(cell)]
    }

    /// Whether the linear index refers to an occupied cell.
    pub fn is_solid_index(&self, index: usize) -> bool {
        self.solid_array[index]
    }

    /// Whether the neighbour of `cell` across `side` exists and is occupied.
    ///
    /// Neighbours outside the grid count as absent.
    pub fn neighbour_is_solid(&self, cell: Point3<usize>, side: BlockSide) -> bool {
        let [dx, dy, dz] = side.neighbour_offset();
        let neighbour = [
            cell.x as i64 + dx as i64,
            cell.y as i64 + dy as i64,
            cell.z as i64 + dz as i64,
        ];
        let edge = self.edge as i64;
        if neighbour.iter().any(|v| !(0..edge).contains(v)) {
            return false;
        }
        let index = ((neighbour[2] * edge + neighbour[1]) * edge + neighbour[0]) as usize;
        self.solid_array[index]
    }

    /// Number of occupied cells.
    pub fn solid_count(&self) -> usize {
        self.solid_array.count_ones()
    }

    /// Replaces a cell and marks the chunk dirty.
    pub fn set_block(&mut self, cell: Point3<usize>, block_type: BlockType) {
        let index = self.index(cell);
        self.blocks[index] = block_type.block_id();
        self.solid_array.set(index, block_type.is_solid());
        self.dirty = true;
    }

    /// Collision body owned by a cell.
    pub fn body_at(&self, cell: Point3<usize>) -> Option<BodyHandle> {
        self.bodies[self.index(cell)]
    }

    /// Records the collision body owned by the cell at `index`.
    pub fn set_body(&mut self, index: usize, body: BodyHandle) {
        self.bodies[index] = Some(body);
    }

    /// Releases every collision body handle, leaving all cells without a body.
    pub fn take_bodies(&mut self) -> Vec<BodyHandle> {
        self.bodies.iter_mut().filter_map(Option::take).collect()
    }

    /// Whether the mesh and collision bodies must be regenerated.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forces a full regeneration on the next meshing pass.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Records that derived data matches the grid.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
