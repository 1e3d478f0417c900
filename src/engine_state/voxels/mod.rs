//! # Voxels
//!
//! Voxel data for the world: block types and faces, the dense [`chunk::Chunk`] grid, and the
//! generation policies that fill it.
//!
//! ## Data Flow
//!
//! 1. A [`chunk::generation::ChunkGenerator`] fills every cell of a chunk once
//! 2. Edits through [`chunk::Chunk::set_block`] mark the chunk dirty
//! 3. The mesher regenerates geometry and collision bodies for dirty chunks in full
//!
//! Only one chunk exists; there is no streaming and no inter-chunk face culling, so faces on
//! the chunk boundary are always emitted.

pub mod block;
pub mod chunk;
