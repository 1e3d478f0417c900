//! Face-culling mesher for voxel chunks.
//!
//! Turns a [`Chunk`] into one [`GeometryPoint`] per solid cell with at least one visible face,
//! and gives every emitted cell a static unit box in the physics world.
//!
//! # Architecture
//!
//! Meshing is split in three steps so the algorithm can run without a graphics context:
//! 1. [`ChunkMesher::generate`] - pure pass over the grid, fills the reusable point buffer
//! 2. [`ChunkMesher::attach_collision_bodies`] - replaces the chunk's static bodies
//! 3. [`ChunkMesher::commit`] - uploads the point buffer through a [`RenderSubmission`]
//!
//! [`ChunkMesher::remesh`] runs all three for a dirty chunk.
//!
//! # Face visibility
//!
//! A face bit is cleared only when the neighbour across it lies inside the grid and is solid.
//! Faces on the chunk boundary are always visible.

use cgmath::{Point3, Vector3};
use log::{debug, info};

use crate::engine_state::{
    physics::{
        convert::to_physics, PhysicsTransform, PhysicsWorld, Shape, ACTOR_GROUP, WORLD_GROUP,
    },
    rendering::{RenderSubmission, VertexBufferHandle},
    voxels::{
        block::block_side::{BlockSide, ALL_FACES_MASK},
        chunk::Chunk,
    },
};

pub mod geometry_point;

pub use geometry_point::GeometryPoint;

/// Label of the vertex buffer holding chunk points.
pub const CHUNK_VERTEX_BUFFER: &str = "chunk_points";

/// Summary of one meshing pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MeshStats {
    /// Geometry points emitted.
    pub points: usize,
    /// Static collision bodies created.
    pub bodies: usize,
}

/// Owns the point buffer of one chunk and its GPU copy.
#[derive(Default)]
pub struct ChunkMesher {
    /// Points from the last [`ChunkMesher::generate`] call.
    points: Vec<GeometryPoint>,
    /// Linear cell index of every point, in the same order.
    emitted_cells: Vec<usize>,
    /// GPU buffer the points are committed to, created on first commit.
    vertex_buffer: Option<VertexBufferHandle>,
    /// Number of points in the GPU buffer.
    uploaded_points: u32,
}

impl ChunkMesher {
    /// Creates a mesher with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible-face mask of a solid cell.
    pub fn face_mask(chunk: &Chunk, cell: Point3<usize>) -> u8 {
        BlockSide::all()
            .into_iter()
            .filter(|side| chunk.neighbour_is_solid(cell, *side))
            .fold(ALL_FACES_MASK, |mask, side| mask & !side.mask_bit())
    }

    /// Rebuilds the point list from the grid.
    ///
    /// The buffers are cleared and reused between passes. Points come out in linear cell
    /// order, so two passes over the same grid produce identical output.
    pub fn generate(&mut self, chunk: &Chunk) -> &[GeometryPoint] {
        self.points.clear();
        self.emitted_cells.clear();
        self.points.reserve(chunk.solid_count());
        self.emitted_cells.reserve(chunk.solid_count());

        let block_ids = chunk.block_ids();
        for (index, block_id) in block_ids.iter().enumerate() {
            if !chunk.is_solid_index(index) {
                continue;
            }

            let cell = chunk.cell(index);
            let mask = Self::face_mask(chunk, cell);
            if mask == 0 {
                continue;
            }

            self.points
                .push(GeometryPoint::new(cell.x, cell.y, cell.z, mask, *block_id));
            self.emitted_cells.push(index);
        }

        &self.points
    }

    /// Replaces the chunk's static bodies with one unit box per emitted cell.
    ///
    /// Bodies from a previous pass are removed from `physics` first.
    ///
    /// # Returns
    /// The number of bodies created
    pub fn attach_collision_bodies(&self, chunk: &mut Chunk, physics: &mut PhysicsWorld) -> usize {
        for stale in chunk.take_bodies() {
            physics.remove_body(stale);
        }

        for &index in &self.emitted_cells {
            let cell = chunk.cell(index);
            let world = Vector3::new(cell.x as f32, cell.y as f32, cell.z as f32);
            let body = physics.add_static_body(
                Shape::voxel(),
                PhysicsTransform::from_origin(to_physics(world)),
                WORLD_GROUP,
                ACTOR_GROUP,
            );
            chunk.set_body(index, body);
        }

        self.emitted_cells.len()
    }

    /// Uploads the current point list, replacing the previous GPU contents.
    pub fn commit<R: RenderSubmission>(&mut self, submission: &mut R) {
        let buffer = *self
            .vertex_buffer
            .get_or_insert_with(|| submission.create_vertex_buffer(CHUNK_VERTEX_BUFFER));
        submission.upload(buffer, &self.points);
        self.uploaded_points = self.points.len() as u32;
        debug!("Committed {} points to {:?}", self.uploaded_points, buffer);
    }

    /// Regenerates points, collision bodies and the GPU buffer if the chunk is dirty.
    ///
    /// # Returns
    /// Statistics of the pass, or `None` if the chunk was clean
    pub fn remesh<R: RenderSubmission>(
        &mut self,
        chunk: &mut Chunk,
        physics: &mut PhysicsWorld,
        submission: &mut R,
    ) -> Option<MeshStats> {
        if !chunk.is_dirty() {
            return None;
        }

        let points = self.generate(chunk).len();
        let bodies = self.attach_collision_bodies(chunk, physics);
        self.commit(submission);
        chunk.mark_clean();

        info!(
            "Meshed chunk with edge {}: {} points, {} static bodies",
            chunk.edge(),
            points,
            bodies
        );
        Some(MeshStats { points, bodies })
    }

    /// Points from the last pass.
    pub fn points(&self) -> &[GeometryPoint] {
        &self.points
    }

    /// GPU buffer holding the committed points, if any commit happened.
    pub fn vertex_buffer(&self) -> Option<VertexBufferHandle> {
        self.vertex_buffer
    }

    /// Number of points in the GPU buffer.
    pub fn uploaded_points(&self) -> u32 {
        self.uploaded_points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        rendering::recording::{RecordingSubmission, SubmissionCommand},
        voxels::{
            block::block_type::BlockType,
            chunk::generation::{Checkerboard, ReferenceTerrain, Solid},
        },
    };

    fn random_chunk(edge: usize, seed: u64) -> Chunk {
        let mut rng = fastrand::Rng::with_seed(seed);
        let block_ids = (0..edge * edge * edge)
            .map(|_| if rng.bool() { rng.u16(1..=6) } else { 0 })
            .collect();
        Chunk::from_block_ids(edge, block_ids)
    }

    fn populated_neighbour_pairs(chunk: &Chunk, cells: &[Point3<usize>]) -> u32 {
        let mut pairs = 0;
        for &cell in cells {
            for side in BlockSide::all() {
                if chunk.neighbour_is_solid(cell, side) {
                    pairs += 1;
                }
            }
        }
        pairs
    }

    #[test]
    fn cleared_bits_match_populated_neighbours() {
        for seed in 0..8 {
            let chunk = random_chunk(7, seed);
            let mut mesher = ChunkMesher::new();
            let points = mesher.generate(&chunk);

            let cleared: u32 = points
                .iter()
                .map(|point| 6 - point.mask().count_ones())
                .sum();
            let cells: Vec<Point3<usize>> = points
                .iter()
                .map(|point| Point3::new(point.x as usize, point.y as usize, point.z as usize))
                .collect();
            assert_eq!(cleared, populated_neighbour_pairs(&chunk, &cells));
            assert!(points.iter().all(|point| point.mask() != 0));
            assert!(points.len() <= chunk.solid_count());
        }
    }

    #[test]
    fn meshing_is_deterministic() {
        let chunk = random_chunk(9, 42);
        let mut mesher = ChunkMesher::new();
        let first = mesher.generate(&chunk).to_vec();
        let second = mesher.generate(&chunk).to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn isolated_corner_cell_shows_every_face() {
        let mut chunk = Chunk::new(4);
        chunk.set_block(Point3::new(3, 3, 3), BlockType::GRASS);
        let mut mesher = ChunkMesher::new();
        let points = mesher.generate(&chunk);
        assert_eq!(
            points,
            &[GeometryPoint::new(3, 3, 3, 63, BlockType::GRASS.block_id())]
        );
    }

    #[test]
    fn empty_grid_yields_nothing() {
        let mut chunk = Chunk::new(5);
        let mut physics = PhysicsWorld::default();
        let mut submission = RecordingSubmission::default();
        let stats = ChunkMesher::new()
            .remesh(&mut chunk, &mut physics, &mut submission)
            .unwrap();
        assert_eq!(stats, MeshStats { points: 0, bodies: 0 });
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn buried_cells_are_skipped() {
        let chunk = Chunk::generate(3, &Solid(BlockType::STONE));
        let mut mesher = ChunkMesher::new();
        let points = mesher.generate(&chunk);
        assert_eq!(points.len(), 26);
        assert!(!points
            .iter()
            .any(|point| (point.x, point.y, point.z) == (1.0, 1.0, 1.0)));

        let centre_of_face = points
            .iter()
            .find(|point| (point.x, point.y, point.z) == (1.0, 1.0, 2.0))
            .unwrap();
        assert_eq!(centre_of_face.mask(), BlockSide::TOP.mask_bit());
    }

    #[test]
    fn checkerboard_cells_are_fully_exposed() {
        let chunk = Chunk::generate(6, &Checkerboard(BlockType::SAND));
        let mut mesher = ChunkMesher::new();
        let points = mesher.generate(&chunk);
        assert_eq!(points.len(), 108);
        assert!(points.iter().all(|point| point.mask() == ALL_FACES_MASK));
    }

    #[test]
    fn every_emitted_cell_gets_a_static_body() {
        let mut chunk = Chunk::generate(8, &ReferenceTerrain);
        let mut physics = PhysicsWorld::default();
        let mut submission = RecordingSubmission::default();
        let mut mesher = ChunkMesher::new();

        let stats = mesher
            .remesh(&mut chunk, &mut physics, &mut submission)
            .unwrap();
        assert_eq!(stats.points, stats.bodies);
        assert_eq!(physics.body_count(), stats.bodies);
        assert!(!chunk.is_dirty());

        let body = chunk.body_at(Point3::new(2, 5, 0)).unwrap();
        let body = physics.body(body).unwrap();
        assert_eq!(body.transform.origin, Vector3::new(2.0, 0.0, -5.0));
        assert_eq!(body.group, WORLD_GROUP);
        assert_eq!(body.mask, ACTOR_GROUP);
    }

    #[test]
    fn clean_chunks_are_not_remeshed_and_edits_replace_bodies() {
        let mut chunk = Chunk::generate(4, &Solid(BlockType::DIRT));
        let mut physics = PhysicsWorld::default();
        let mut submission = RecordingSubmission::default();
        let mut mesher = ChunkMesher::new();

        let first = mesher
            .remesh(&mut chunk, &mut physics, &mut submission)
            .unwrap();
        assert!(mesher
            .remesh(&mut chunk, &mut physics, &mut submission)
            .is_none());

        chunk.set_block(Point3::new(0, 0, 0), BlockType::NULL);
        let second = mesher
            .remesh(&mut chunk, &mut physics, &mut submission)
            .unwrap();
        assert_eq!(second.points, first.points - 1);
        assert_eq!(physics.body_count(), second.bodies);

        let creations = submission
            .commands()
            .iter()
            .filter(|command| matches!(command, SubmissionCommand::CreateVertexBuffer { .. }))
            .count();
        assert_eq!(creations, 1);
        assert_eq!(mesher.uploaded_points(), second.points as u32);
    }
}
