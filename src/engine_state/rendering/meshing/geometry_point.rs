//! Vertex data produced by the mesher.

/// One visible voxel, as consumed by the voxel program.
///
/// A single point stands for up to six faces; the vertex stage expands every face whose bit
/// is set in `face_mask`.
///
/// # Memory Layout
/// - Position: 3x f32 (12 bytes)
/// - Face mask: f32 holding an integer in 0..=63 (4 bytes)
/// - Material: f32 holding the block id (4 bytes)
///
/// Total size: 20 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GeometryPoint {
    /// Grid x coordinate
    pub x: f32,
    /// Grid y coordinate
    pub y: f32,
    /// Grid z coordinate
    pub z: f32,
    /// Visible-face bits, see `BlockSide::mask_bit`
    pub face_mask: f32,
    /// Block id of the cell
    pub material: f32,
}

impl GeometryPoint {
    /// Packs a cell into a point.
    pub fn new(x: usize, y: usize, z: usize, face_mask: u8, material: u16) -> Self {
        Self {
            x: x as f32,
            y: y as f32,
            z: z as f32,
            face_mask: face_mask as f32,
            material: material as f32,
        }
    }

    /// The face mask as an integer.
    pub fn mask(&self) -> u8 {
        self.face_mask as u8
    }

    /// Returns the vertex buffer layout description for the voxel program.
    ///
    /// Points are stepped per instance; every instance draws the 36 corners of a cube.
    ///
    /// # Shader Attributes
    /// - `location = 0`: position (vec3<f32>)
    /// - `location = 1`: face_mask (f32)
    /// - `location = 2`: material (f32)
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GeometryPoint>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}
