//! # Rendering
//!
//! The seam between the simulation and the GPU. The engine talks to the GPU only through the
//! [`RenderSubmission`] trait:
//!
//! * [`gpu::WgpuSubmission`] - the wgpu backend used by the application
//! * [`recording::RecordingSubmission`] - records every call, for tests and headless runs
//!
//! [`meshing`] turns voxel chunks into the point buffers both backends consume.

use cgmath::Matrix4;

pub mod gpu;
pub mod meshing;
pub mod recording;

use meshing::GeometryPoint;

/// Program that expands geometry points into voxel faces.
pub const VOXEL_PROGRAM: &str = "voxels";
/// Model matrix uniform.
pub const WORLD_TRANSFORM_UNIFORM: &str = "world_transform";
/// Projection * view * model uniform.
pub const TOTAL_TRANSFORM_UNIFORM: &str = "total_transform";

/// Opaque handle to a vertex buffer owned by a [`RenderSubmission`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexBufferHandle(pub u32);

/// Everything the engine needs from a graphics backend.
///
/// Calls between [`RenderSubmission::begin_frame`] and [`RenderSubmission::finish_frame`]
/// describe one frame. Uniforms set after a program is bound apply to the draws that follow
/// until they are set again.
pub trait RenderSubmission {
    /// Starts a frame. Returns `false` if nothing can be drawn this frame.
    fn begin_frame(&mut self) -> bool;

    /// Selects the program used by subsequent draws.
    fn bind_program(&mut self, name: &str);

    /// Sets a matrix uniform of the bound program.
    fn set_uniform_mat4(&mut self, name: &str, matrix: Matrix4<f32>);

    /// Creates an empty vertex buffer.
    fn create_vertex_buffer(&mut self, label: &str) -> VertexBufferHandle;

    /// Replaces the whole content of a vertex buffer.
    fn upload(&mut self, buffer: VertexBufferHandle, points: &[GeometryPoint]);

    /// Draws the first `count` points of a buffer with the bound program.
    fn draw_points(&mut self, buffer: VertexBufferHandle, count: u32);

    /// Submits and presents the frame.
    fn finish_frame(&mut self);

    /// Adapts to a new output size in pixels.
    fn resize(&mut self, width: u32, height: u32);

    /// Width over height of the output.
    fn aspect_ratio(&self) -> f32;
}
