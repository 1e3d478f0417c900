//! A [`RenderSubmission`] that keeps a log of every call instead of drawing.

use cgmath::Matrix4;

use super::{meshing::GeometryPoint, RenderSubmission, VertexBufferHandle};

/// One recorded call.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmissionCommand {
    /// `begin_frame`
    BeginFrame,
    /// `bind_program`
    BindProgram {
        /// Program name.
        name: String,
    },
    /// `set_uniform_mat4`
    SetUniformMat4 {
        /// Uniform name.
        name: String,
        /// Uploaded value.
        matrix: Matrix4<f32>,
    },
    /// `create_vertex_buffer`
    CreateVertexBuffer {
        /// Returned handle.
        buffer: VertexBufferHandle,
        /// Debug label.
        label: String,
    },
    /// `upload`
    Upload {
        /// Target buffer.
        buffer: VertexBufferHandle,
        /// Number of points uploaded.
        point_count: usize,
    },
    /// `draw_points`
    DrawPoints {
        /// Source buffer.
        buffer: VertexBufferHandle,
        /// Number of points drawn.
        count: u32,
    },
    /// `finish_frame`
    FinishFrame,
    /// `resize`
    Resize {
        /// New width.
        width: u32,
        /// New height.
        height: u32,
    },
}

/// Headless render backend.
pub struct RecordingSubmission {
    commands: Vec<SubmissionCommand>,
    buffers: Vec<Vec<GeometryPoint>>,
    width: u32,
    height: u32,
}

impl RecordingSubmission {
    /// Creates a recorder reporting the given output size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            commands: Vec::new(),
            buffers: Vec::new(),
            width,
            height,
        }
    }

    /// Every call so far, oldest first.
    pub fn commands(&self) -> &[SubmissionCommand] {
        &self.commands
    }

    /// Forgets the recorded calls; buffer contents are kept.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Current content of a buffer.
    pub fn buffer_contents(&self, buffer: VertexBufferHandle) -> Option<&[GeometryPoint]> {
        self.buffers.get(buffer.0 as usize).map(Vec::as_slice)
    }

    /// Number of completed frames.
    pub fn finished_frames(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| **command == SubmissionCommand::FinishFrame)
            .count()
    }
}

impl Default for RecordingSubmission {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl RenderSubmission for RecordingSubmission {
    fn begin_frame(&mut self) -> bool {
        self.commands.push(SubmissionCommand::BeginFrame);
        true
    }

    fn bind_program(&mut self, name: &str) {
        self.commands.push(SubmissionCommand::BindProgram {
            name: name.to_owned(),
        });
    }

    fn set_uniform_mat4(&mut self, name: &str, matrix: Matrix4<f32>) {
        self.commands.push(SubmissionCommand::SetUniformMat4 {
            name: name.to_owned(),
            matrix,
        });
    }

    fn create_vertex_buffer(&mut self, label: &str) -> VertexBufferHandle {
        let buffer = VertexBufferHandle(self.buffers.len() as u32);
        self.buffers.push(Vec::new());
        self.commands.push(SubmissionCommand::CreateVertexBuffer {
            buffer,
            label: label.to_owned(),
        });
        buffer
    }

    fn upload(&mut self, buffer: VertexBufferHandle, points: &[GeometryPoint]) {
        if let Some(contents) = self.buffers.get_mut(buffer.0 as usize) {
            contents.clear();
            contents.extend_from_slice(points);
        }
        self.commands.push(SubmissionCommand::Upload {
            buffer,
            point_count: points.len(),
        });
    }

    fn draw_points(&mut self, buffer: VertexBufferHandle, count: u32) {
        self.commands
            .push(SubmissionCommand::DrawPoints { buffer, count });
    }

    fn finish_frame(&mut self) {
        self.commands.push(SubmissionCommand::FinishFrame);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.commands.push(SubmissionCommand::Resize { width, height });
    }

    fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uploads_replace_buffer_contents() {
        let mut recorder = RecordingSubmission::default();
        let buffer = recorder.create_vertex_buffer("points");
        recorder.upload(buffer, &[GeometryPoint::new(1, 2, 3, 63, 2); 4]);
        recorder.upload(buffer, &[GeometryPoint::new(0, 0, 0, 1, 3)]);

        assert_eq!(recorder.buffer_contents(buffer).unwrap().len(), 1);
        assert_eq!(
            recorder.commands().last(),
            Some(&SubmissionCommand::Upload {
                buffer,
                point_count: 1
            })
        );
    }

    #[test]
    fn aspect_ratio_follows_resizes() {
        let mut recorder = RecordingSubmission::new(800, 600);
        assert!((recorder.aspect_ratio() - 4.0 / 3.0).abs() < 1e-6);
        recorder.resize(1000, 500);
        assert_eq!(recorder.aspect_ratio(), 2.0);
    }
}
