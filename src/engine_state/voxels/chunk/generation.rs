//! World-generation policies.
//!
//! A [`ChunkGenerator`] is a total function from a cell to a block type. [`Chunk::generate`]
//! calls it exactly once for every cell of the grid.
//!
//! [`Chunk::generate`]: super::Chunk::generate

use cgmath::Point3;
use noise::{NoiseFn, Perlin};
use phf::phf_map;

use crate::engine_state::voxels::block::block_type::BlockType;

/// Scaling factor applied to cell coordinates when sampling Perlin noise.
pub const PERLIN_SCALE_FACTOR: f64 = 0.03;
/// Number of dirt cells between the grass surface and stone.
pub const DIRT_DEPTH: i64 = 3;

/// Decides the content of every cell of a chunk.
pub trait ChunkGenerator {
    /// Returns the block for `cell` in a chunk with the given edge length.
    fn block_at(&self, cell: Point3<usize>, edge: usize) -> BlockType;
}

impl<F> ChunkGenerator for F
where
    F: Fn(Point3<usize>, usize) -> BlockType,
{
    fn block_at(&self, cell: Point3<usize>, edge: usize) -> BlockType {
        self(cell, edge)
    }
}

/// Generator selectable from configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GeneratorKind {
    /// Sand floor with a small stone and sandstone platform in the middle.
    REFERENCE,
    /// Perlin heightmap with grass, dirt, stone and bedrock layers.
    PERLIN,
    /// Alternating solid and empty cells of the fill block.
    CHECKERBOARD,
    /// The fill block everywhere.
    SOLID,
    /// Nothing at all.
    EMPTY,
}

/// Lookup of generators by their configuration name.
pub static GENERATORS_BY_NAME: phf::Map<&'static str, GeneratorKind> = phf_map! {
    "reference" => GeneratorKind::REFERENCE,
    "perlin" => GeneratorKind::PERLIN,
    "checkerboard" => GeneratorKind::CHECKERBOARD,
    "solid" => GeneratorKind::SOLID,
    "empty" => GeneratorKind::EMPTY,
};

impl GeneratorKind {
    /// Resolves a generator from its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        GENERATORS_BY_NAME.get(name).copied()
    }

    /// Instantiates the generator.
    ///
    /// # Arguments
    /// * `seed` - Seed for generators with a random component
    /// * `fill` - Block used by the checkerboard and solid generators
    pub fn build(self, seed: u32, fill: BlockType) -> Box<dyn ChunkGenerator> {
        match self {
            GeneratorKind::REFERENCE => Box::new(ReferenceTerrain),
            GeneratorKind::PERLIN => Box::new(PerlinTerrain::new(seed)),
            GeneratorKind::CHECKERBOARD => Box::new(Checkerboard(fill)),
            GeneratorKind::SOLID => Box::new(Solid(fill)),
            GeneratorKind::EMPTY => Box::new(Solid(BlockType::NULL)),
        }
    }
}

/// A sand floor filling the lower half, with a 5x5 stone slab and a 3x3x2 sandstone block
/// on top of it, centred on the chunk.
pub struct ReferenceTerrain;

impl ChunkGenerator for ReferenceTerrain {
    fn block_at(&self, cell: Point3<usize>, edge: usize) -> BlockType {
        let centre = (edge / 2) as i64;
        let (x, y, z) = (cell.x as i64, cell.y as i64, cell.z as i64);
        let within = |v: i64, radius: i64| (centre - radius..=centre + radius).contains(&v);

        if z == centre && within(x, 2) && within(y, 2) {
            BlockType::STONE
        } else if (centre + 1..=centre + 2).contains(&z) && within(x, 1) && within(y, 1) {
            BlockType::SANDSTONE
        } else if z < centre {
            BlockType::SAND
        } else {
            BlockType::NULL
        }
    }
}

/// Rolling hills sampled from 2D Perlin noise.
pub struct PerlinTerrain {
    perlin: Perlin,
}

impl PerlinTerrain {
    /// Creates a heightmap generator for the given seed.
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
        }
    }

    /// Surface height of the column at `(x, y)`.
    pub fn height_at(&self, x: usize, y: usize, edge: usize) -> i64 {
        let sample = self.perlin.get([
            x as f64 * PERLIN_SCALE_FACTOR,
            y as f64 * PERLIN_SCALE_FACTOR,
        ]);
        let base = edge as f64 / 2.0;
        let amplitude = edge as f64 / 6.0;
        ((base + sample * amplitude) as i64).clamp(1, edge as i64 - 1)
    }
}

impl ChunkGenerator for PerlinTerrain {
    fn block_at(&self, cell: Point3<usize>, edge: usize) -> BlockType {
        let z = cell.z as i64;
        if z == 0 {
            return BlockType::BEDROCK;
        }

        let height = self.height_at(cell.x, cell.y, edge);
        if z > height {
            BlockType::NULL
        } else if z == height {
            BlockType::GRASS
        } else if z >= height - DIRT_DEPTH {
            BlockType::DIRT
        } else {
            BlockType::STONE
        }
    }
}

/// Every other cell holds the wrapped block type.
pub struct Checkerboard(pub BlockType);

impl ChunkGenerator for Checkerboard {
    fn block_at(&self, cell: Point3<usize>, _edge: usize) -> BlockType {
        if (cell.x + cell.y + cell.z) % 2 == 0 {
            self.0
        } else {
            BlockType::NULL
        }
    }
}

/// Every cell holds the wrapped block type.
pub struct Solid(pub BlockType);

impl ChunkGenerator for Solid {
    fn block_at(&self, _cell: Point3<usize>, _edge: usize) -> BlockType {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_terrain_matches_the_hundred_cell_layout() {
        let terrain = ReferenceTerrain;
        assert_eq!(terrain.block_at(Point3::new(50, 50, 50), 100), BlockType::STONE);
        assert_eq!(terrain.block_at(Point3::new(48, 52, 50), 100), BlockType::STONE);
        assert_eq!(terrain.block_at(Point3::new(47, 50, 50), 100), BlockType::NULL);
        assert_eq!(terrain.block_at(Point3::new(49, 51, 52), 100), BlockType::SANDSTONE);
        assert_eq!(terrain.block_at(Point3::new(48, 50, 51), 100), BlockType::NULL);
        assert_eq!(terrain.block_at(Point3::new(0, 99, 49), 100), BlockType::SAND);
        assert_eq!(terrain.block_at(Point3::new(0, 0, 53), 100), BlockType::NULL);
    }

    #[test]
    fn perlin_columns_are_layered() {
        let terrain = PerlinTerrain::new(7);
        let edge = 32;
        let height = terrain.height_at(4, 9, edge);
        assert_eq!(terrain.block_at(Point3::new(4, 9, 0), edge), BlockType::BEDROCK);
        assert_eq!(
            terrain.block_at(Point3::new(4, 9, height as usize), edge),
            BlockType::GRASS
        );
        assert_eq!(
            terrain.block_at(Point3::new(4, 9, edge - 1), edge).is_solid(),
            height == edge as i64 - 1
        );
    }

    #[test]
    fn generators_resolve_by_name() {
        assert_eq!(GeneratorKind::from_name("perlin"), Some(GeneratorKind::PERLIN));
        assert_eq!(GeneratorKind::from_name("caves"), None);
        let empty = GeneratorKind::EMPTY.build(0, BlockType::STONE);
        assert_eq!(empty.block_at(Point3::new(1, 2, 3), 4), BlockType::NULL);
    }

    #[test]
    fn checkerboard_alternates() {
        let board = Checkerboard(BlockType::DIRT);
        assert_eq!(board.block_at(Point3::new(0, 0, 0), 2), BlockType::DIRT);
        assert_eq!(board.block_at(Point3::new(1, 0, 0), 2), BlockType::NULL);
        assert_eq!(board.block_at(Point3::new(1, 1, 0), 2), BlockType::DIRT);
    }
}
