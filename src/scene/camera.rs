//! Camera node payload
//!
//! Derives a view matrix from the owning node's world transform and a
//! projection matrix from the camera parameters and the current viewport
//! aspect ratio. Both are recomputed at every use, so a resize is picked up
//! on the next frame without any invalidation bookkeeping.

use cgmath::{Deg, Matrix4, SquareMatrix};

/// Maps OpenGL clip space (z in [-1, 1]) to wgpu clip space (z in [0, 1]).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Perspective camera parameters.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    near: f32,
    far: f32,
    /// Vertical field of view in degrees.
    fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 100.0,
            fov: 60.0,
        }
    }
}

impl Camera {
    pub fn new(near: f32, far: f32, fov: f32) -> Self {
        Self { near, far, fov }
    }

    pub fn set_near(&mut self, near: f32) {
        self.near = near;
    }

    pub fn set_far(&mut self, far: f32) {
        self.far = far;
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// View matrix: the inverse of the camera node's world transform.
    ///
    /// A non-invertible world transform (zero scale somewhere up the chain)
    /// falls back to identity rather than poisoning the frame.
    pub fn view_matrix(&self, world: &Matrix4<f32>) -> Matrix4<f32> {
        world.invert().unwrap_or_else(Matrix4::identity)
    }

    /// Projection matrix for the given viewport, in wgpu clip space.
    ///
    /// Zero-area viewports are clamped to one pixel so a minimized window
    /// never divides by zero.
    pub fn projection_matrix(&self, width: u32, height: u32) -> Matrix4<f32> {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(Deg(self.fov), aspect, self.near, self.far)
    }

    /// Builds the per-frame camera uniform from the node's world transform.
    pub fn uniform(&self, world: &Matrix4<f32>, width: u32, height: u32) -> CameraUniform {
        CameraUniform {
            view_position: [world.w.x, world.w.y, world.w.z, 1.0],
            view: (self.view_matrix(world)).into(),
            proj: (self.projection_matrix(width, height)).into(),
        }
    }
}

/// GPU-side camera data, shared by every pass that needs a viewpoint.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    /// The eye position of the camera in homogeneous coordinates.
    pub view_position: [f32; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self {
            view_position: [0.0; 4],
            view: Matrix4::identity().into(),
            proj: Matrix4::identity().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    #[test]
    fn view_matrix_inverts_world() {
        let camera = Camera::default();
        let world = Matrix4::from_translation(Vector3::new(0.0, 1.0, 5.0));
        let view = camera.view_matrix(&world);
        let roundtrip = world * view;
        for c in 0..4 {
            for r in 0..4 {
                let expected = if c == r { 1.0 } else { 0.0 };
                assert!((roundtrip[c][r] - expected).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn zero_area_viewport_is_defended() {
        let camera = Camera::default();
        let proj = camera.projection_matrix(0, 0);
        for c in 0..4 {
            for r in 0..4 {
                assert!(proj[c][r].is_finite());
            }
        }
    }

    #[test]
    fn uniform_carries_world_position() {
        let camera = Camera::new(0.5, 200.0, 45.0);
        let world = Matrix4::from_translation(Vector3::new(3.0, -2.0, 7.0));
        let uniform = camera.uniform(&world, 800, 600);
        assert_eq!(uniform.view_position, [3.0, -2.0, 7.0, 1.0]);
    }
}
