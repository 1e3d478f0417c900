//! # Camera Implementation
//!
//! Point-of-view and projection math.
//!
//! ## Key Components
//! - `Pov`: eye, target and up vector, turned into a look-at view matrix
//! - `Projection`: perspective projection for the current surface aspect
//! - `OrbitAngles`: mouse-driven yaw and pitch of the eye around its target

use cgmath::*;
use std::f32::consts::FRAC_PI_2;

/// Transformation matrix to convert from OpenGL's clip space to WGPU's.
///
/// WGPU's normalized device coordinates range from 0 to 1 in Z, where OpenGL uses -1 to 1.
/// This matrix scales Z by one half and then translates it by one half.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Safe limit for pitch so the eye never reaches the up axis
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

/// A point of view in Z-up world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pov {
    /// Eye position
    pub eye: Point3<f32>,
    /// Point the eye looks at
    pub target: Point3<f32>,
    /// Up direction of the view
    pub up: Vector3<f32>,
}

impl Pov {
    /// Creates a Z-up point of view.
    pub fn new(eye: Point3<f32>, target: Point3<f32>) -> Self {
        Self {
            eye,
            target,
            up: Vector3::unit_z(),
        }
    }

    /// Unit vector from the eye to the target.
    pub fn direction(&self) -> Vector3<f32> {
        (self.target - self.eye).normalize()
    }

    /// Calculates the look-at view matrix.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye, self.target, self.up)
    }
}

/// Represents a camera's projection matrix and related parameters.
#[derive(Debug)]
pub struct Projection {
    /// Aspect ratio (width / height)
    aspect: f32,
    /// Vertical field of view in radians
    fovy: Rad<f32>,
    /// Near clipping plane distance
    znear: f32,
    /// Far clipping plane distance
    zfar: f32,
}

impl Projection {
    /// Creates a new projection with the given parameters.
    ///
    /// # Arguments
    /// * `aspect` - Viewport width over height
    /// * `fovy` - Vertical field of view (can be any type convertible to `Rad<f32>`)
    /// * `znear` - Near clipping plane distance
    /// * `zfar` - Far clipping plane distance
    pub fn new<F: Into<Rad<f32>>>(aspect: f32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Updates the projection's aspect ratio for viewport resizing.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Current aspect ratio.
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Calculates the projection matrix.
    ///
    /// Combines the perspective projection with the OpenGL to WGPU clip-space transform.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Yaw and pitch of an eye orbiting its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitAngles {
    /// Rotation around the world Z axis
    pub yaw: Rad<f32>,
    /// Elevation above the XY plane
    pub pitch: Rad<f32>,
}

impl OrbitAngles {
    /// Creates clamped angles.
    pub fn new<Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(yaw: Y, pitch: P) -> Self {
        let mut angles = Self {
            yaw: yaw.into(),
            pitch: pitch.into(),
        };
        angles.clamp_pitch();
        angles
    }

    /// Applies a mouse delta in pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32, sensitivity: f32) {
        self.yaw -= Rad(dx * sensitivity);
        self.pitch += Rad(dy * sensitivity);
        self.clamp_pitch();
    }

    fn clamp_pitch(&mut self) {
        self.pitch = Rad(self.pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
    }

    /// Unit vector from the target towards the eye.
    pub fn offset_direction(&self) -> Vector3<f32> {
        let (yaw_sin, yaw_cos) = self.yaw.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.sin_cos();
        Vector3::new(pitch_cos * yaw_cos, pitch_cos * yaw_sin, pitch_sin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_matrix_moves_the_eye_to_the_origin() {
        let pov = Pov::new(Point3::new(0.0, -10.0, 5.0), Point3::new(0.0, 0.0, 5.0));
        let eye_in_view = pov.calc_matrix() * pov.eye.to_homogeneous();
        assert!(eye_in_view.truncate().magnitude() < 1e-5);

        let target_in_view = pov.calc_matrix() * pov.target.to_homogeneous();
        assert!((target_in_view.z + 10.0).abs() < 1e-5);
        assert!((pov.direction() - Vector3::unit_y()).magnitude() < 1e-6);
    }

    #[test]
    fn projection_maps_the_near_plane_to_zero_depth() {
        let projection = Projection::new(1.0, Deg(85.0), 0.2, 200.01);
        let near = projection.calc_matrix() * Vector4::new(0.0, 0.0, -0.2, 1.0);
        let far = projection.calc_matrix() * Vector4::new(0.0, 0.0, -200.01, 1.0);
        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn pitch_stays_below_the_pole() {
        let mut angles = OrbitAngles::new(Deg(0.0), Deg(30.0));
        angles.rotate(0.0, 10_000.0, 0.01);
        assert!(angles.pitch.0 < FRAC_PI_2);
        assert!(angles.offset_direction().z < 1.0);
        assert!((angles.offset_direction().magnitude() - 1.0).abs() < 1e-5);
    }
}
