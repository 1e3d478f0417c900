//! # wgpu Render Backend
//!
//! Implements [`RenderSubmission`] on top of a configured wgpu surface.
//!
//! Draw calls are not encoded immediately. Each `draw_points` call snapshots the uniforms
//! currently set and queues the draw; `finish_frame` writes every snapshot into its own slot of
//! a dynamic-offset uniform buffer and encodes all draws in a single render pass.
//!
//! The voxel program draws 36 vertices per geometry point, instanced over the point buffer.

use std::{collections::HashMap, num::NonZeroU64};

use cgmath::{Matrix4, SquareMatrix};
use log::{debug, error, warn};
use wgpu::{util::DeviceExt, Device, Queue, Surface, SurfaceConfiguration};

use super::{
    meshing::GeometryPoint, RenderSubmission, VertexBufferHandle, TOTAL_TRANSFORM_UNIFORM,
    VOXEL_PROGRAM, WORLD_TRANSFORM_UNIFORM,
};

pub mod texture;

use texture::DepthTexture;

/// Uniform slots available per frame.
pub const MAX_DRAWS_PER_FRAME: usize = 64;

/// Vertices emitted per geometry point: six faces of two triangles.
const VERTICES_PER_POINT: u32 = 36;

const CLEAR_COLOUR: wgpu::Color = wgpu::Color {
    r: 0.53,
    g: 0.72,
    b: 0.90,
    a: 1.0,
};

/// GPU layout of the voxel program's uniforms.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VoxelUniforms {
    /// Model matrix
    pub world_transform: [[f32; 4]; 4],
    /// Projection * view * model
    pub total_transform: [[f32; 4]; 4],
}

impl Default for VoxelUniforms {
    fn default() -> Self {
        Self {
            world_transform: Matrix4::<f32>::identity().into(),
            total_transform: Matrix4::<f32>::identity().into(),
        }
    }
}

struct UploadedBuffer {
    buffer: wgpu::Buffer,
    points: u32,
}

struct VertexBufferSlot {
    label: String,
    uploaded: Option<UploadedBuffer>,
}

struct PendingDraw {
    program: String,
    uniforms: VoxelUniforms,
    buffer: VertexBufferHandle,
    count: u32,
}

/// The wgpu render backend.
pub struct WgpuSubmission {
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    device: Device,
    queue: Queue,
    depth_texture: DepthTexture,
    programs: HashMap<&'static str, wgpu::RenderPipeline>,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    vertex_buffers: Vec<VertexBufferSlot>,
    bound_program: Option<String>,
    uniforms: VoxelUniforms,
    pending_draws: Vec<PendingDraw>,
    frame: Option<wgpu::SurfaceTexture>,
}

impl WgpuSubmission {
    /// Builds the programs and per-frame resources for a configured surface.
    ///
    /// # Arguments
    /// * `surface` - Surface already configured with `config`
    /// * `config` - Surface configuration containing size and format
    /// * `device` - The WebGPU device
    /// * `queue` - The WebGPU queue for buffer operations
    pub fn new(
        surface: Surface<'static>,
        config: SurfaceConfiguration,
        device: Device,
        queue: Queue,
    ) -> Self {
        let uniform_size = std::mem::size_of::<VoxelUniforms>() as u64;
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = uniform_size.div_ceil(alignment) * alignment;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("voxel uniforms"),
            size: uniform_stride * MAX_DRAWS_PER_FRAME as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(uniform_size),
                    },
                    count: None,
                }],
                label: Some("voxel uniforms layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: NonZeroU64::new(uniform_size),
                }),
            }],
            label: Some("voxel uniforms"),
        });

        let mut programs = HashMap::new();
        programs.insert(
            VOXEL_PROGRAM,
            Self::create_voxel_pipeline(&device, config.format, &uniform_bind_group_layout),
        );

        let depth_texture = DepthTexture::new(&device, &config, "depth texture");

        Self {
            surface,
            config,
            device,
            queue,
            depth_texture,
            programs,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            vertex_buffers: Vec::new(),
            bound_program: None,
            uniforms: VoxelUniforms::default(),
            pending_draws: Vec::new(),
            frame: None,
        }
    }

    fn create_voxel_pipeline(
        device: &Device,
        texture_format: wgpu::TextureFormat,
        uniform_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("voxel shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("voxels.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("voxel pipeline layout"),
            bind_group_layouts: &[uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("voxel pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[GeometryPoint::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: texture_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(DepthTexture::depth_stencil_state()),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        })
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = DepthTexture::new(&self.device, &self.config, "depth texture");
    }
}

impl RenderSubmission for WgpuSubmission {
    fn begin_frame(&mut self) -> bool {
        self.pending_draws.clear();
        self.bound_program = None;

        match self.surface.get_current_texture() {
            Ok(frame) => {
                self.frame = Some(frame);
                true
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost or outdated, reconfiguring");
                self.reconfigure();
                false
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("Out of memory acquiring the next frame");
                false
            }
            Err(err) => {
                warn!("Skipping frame: {:?}", err);
                false
            }
        }
    }

    fn bind_program(&mut self, name: &str) {
        if self.programs.contains_key(name) {
            self.bound_program = Some(name.to_owned());
        } else {
            warn!("Unknown program '{}'", name);
            self.bound_program = None;
        }
    }

    fn set_uniform_mat4(&mut self, name: &str, matrix: Matrix4<f32>) {
        match name {
            WORLD_TRANSFORM_UNIFORM => self.uniforms.world_transform = matrix.into(),
            TOTAL_TRANSFORM_UNIFORM => self.uniforms.total_transform = matrix.into(),
            _ => warn!("Unknown uniform '{}'", name),
        }
    }

    fn create_vertex_buffer(&mut self, label: &str) -> VertexBufferHandle {
        self.vertex_buffers.push(VertexBufferSlot {
            label: label.to_owned(),
            uploaded: None,
        });
        VertexBufferHandle((self.vertex_buffers.len() - 1) as u32)
    }

    fn upload(&mut self, buffer: VertexBufferHandle, points: &[GeometryPoint]) {
        let Some(slot) = self.vertex_buffers.get_mut(buffer.0 as usize) else {
            warn!("Upload to unknown vertex buffer {:?}", buffer);
            return;
        };

        slot.uploaded = if points.is_empty() {
            None
        } else {
            let gpu_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&slot.label),
                    contents: bytemuck::cast_slice(points),
                    usage: wgpu::BufferUsages::VERTEX,
                });
            Some(UploadedBuffer {
                buffer: gpu_buffer,
                points: points.len() as u32,
            })
        };
        debug!("Uploaded {} points to '{}'", points.len(), slot.label);
    }

    fn draw_points(&mut self, buffer: VertexBufferHandle, count: u32) {
        let Some(program) = self.bound_program.clone() else {
            warn!("Draw without a bound program");
            return;
        };
        if self.pending_draws.len() == MAX_DRAWS_PER_FRAME {
            warn!("More than {} draws in one frame, dropping", MAX_DRAWS_PER_FRAME);
            return;
        }
        self.pending_draws.push(PendingDraw {
            program,
            uniforms: self.uniforms,
            buffer,
            count,
        });
    }

    fn finish_frame(&mut self) {
        let Some(frame) = self.frame.take() else {
            return;
        };

        for (slot, draw) in self.pending_draws.iter().enumerate() {
            self.queue.write_buffer(
                &self.uniform_buffer,
                slot as u64 * self.uniform_stride,
                bytemuck::bytes_of(&draw.uniforms),
            );
        }

        let view = frame.texture.create_view(&Default::default());
        let mut encoder = self.device.create_command_encoder(&Default::default());
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("voxel pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOUR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for (slot, draw) in self.pending_draws.iter().enumerate() {
                let Some(pipeline) = self.programs.get(draw.program.as_str()) else {
                    continue;
                };
                let Some(uploaded) = self
                    .vertex_buffers
                    .get(draw.buffer.0 as usize)
                    .and_then(|vertex_slot| vertex_slot.uploaded.as_ref())
                else {
                    continue;
                };

                let instances = draw.count.min(uploaded.points);
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(
                    0,
                    &self.uniform_bind_group,
                    &[(slot as u64 * self.uniform_stride) as u32],
                );
                rpass.set_vertex_buffer(0, uploaded.buffer.slice(..));
                rpass.draw(0..VERTICES_PER_POINT, 0..instances);
            }
        }

        self.queue.submit([encoder.finish()]);
        frame.present();
        self.pending_draws.clear();
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
    }

    fn aspect_ratio(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }
}
