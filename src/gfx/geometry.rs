//! Pass geometry owned by the render pipeline
//!
//! The full-screen quad drives the combine and postprocessing passes (one
//! shader invocation per pixel); the skybox cube is drawn with inward-facing
//! winding so the camera always sits inside it.

use wgpu::util::DeviceExt;

/// Vertex of the full-screen quad: NDC position plus UV.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl QuadVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
            0 => Float32x2,
            1 => Float32x2,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Position-only vertex of the skybox cube.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkyVertex {
    pub position: [f32; 3],
}

impl SkyVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![
            0 => Float32x3,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SkyVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Two triangles covering NDC, UV origin at the bottom-left.
pub const FULLSCREEN_QUAD: [QuadVertex; 6] = [
    QuadVertex { position: [-1.0, 1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 0.0] },
    QuadVertex { position: [1.0, -1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [-1.0, 1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [1.0, -1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [1.0, 1.0], uv: [1.0, 1.0] },
];

/// Unit cube around the origin, wound to face inward.
#[rustfmt::skip]
pub const SKYBOX_CUBE: [SkyVertex; 36] = [
    SkyVertex { position: [-1.0,  1.0, -1.0] },
    SkyVertex { position: [-1.0, -1.0, -1.0] },
    SkyVertex { position: [ 1.0, -1.0, -1.0] },
    SkyVertex { position: [ 1.0, -1.0, -1.0] },
    SkyVertex { position: [ 1.0,  1.0, -1.0] },
    SkyVertex { position: [-1.0,  1.0, -1.0] },

    SkyVertex { position: [-1.0, -1.0,  1.0] },
    SkyVertex { position: [-1.0, -1.0, -1.0] },
    SkyVertex { position: [-1.0,  1.0, -1.0] },
    SkyVertex { position: [-1.0,  1.0, -1.0] },
    SkyVertex { position: [-1.0,  1.0,  1.0] },
    SkyVertex { position: [-1.0, -1.0,  1.0] },

    SkyVertex { position: [ 1.0, -1.0, -1.0] },
    SkyVertex { position: [ 1.0, -1.0,  1.0] },
    SkyVertex { position: [ 1.0,  1.0,  1.0] },
    SkyVertex { position: [ 1.0,  1.0,  1.0] },
    SkyVertex { position: [ 1.0,  1.0, -1.0] },
    SkyVertex { position: [ 1.0, -1.0, -1.0] },

    SkyVertex { position: [-1.0, -1.0,  1.0] },
    SkyVertex { position: [-1.0,  1.0,  1.0] },
    SkyVertex { position: [ 1.0,  1.0,  1.0] },
    SkyVertex { position: [ 1.0,  1.0,  1.0] },
    SkyVertex { position: [ 1.0, -1.0,  1.0] },
    SkyVertex { position: [-1.0, -1.0,  1.0] },

    SkyVertex { position: [-1.0,  1.0, -1.0] },
    SkyVertex { position: [ 1.0,  1.0, -1.0] },
    SkyVertex { position: [ 1.0,  1.0,  1.0] },
    SkyVertex { position: [ 1.0,  1.0,  1.0] },
    SkyVertex { position: [-1.0,  1.0,  1.0] },
    SkyVertex { position: [-1.0,  1.0, -1.0] },

    SkyVertex { position: [-1.0, -1.0, -1.0] },
    SkyVertex { position: [-1.0, -1.0,  1.0] },
    SkyVertex { position: [ 1.0, -1.0, -1.0] },
    SkyVertex { position: [ 1.0, -1.0, -1.0] },
    SkyVertex { position: [-1.0, -1.0,  1.0] },
    SkyVertex { position: [ 1.0, -1.0,  1.0] },
];

/// The full-screen quad with its GPU buffer.
pub struct FullscreenQuad {
    vertex_buffer: wgpu::Buffer,
}

impl FullscreenQuad {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fullscreen Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&FULLSCREEN_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { vertex_buffer }
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..FULLSCREEN_QUAD.len() as u32, 0..1);
    }
}

/// The skybox cube with its GPU buffer.
pub struct SkyboxCube {
    vertex_buffer: wgpu::Buffer,
}

impl SkyboxCube {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Skybox Cube Vertex Buffer"),
            contents: bytemuck::cast_slice(&SKYBOX_CUBE),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { vertex_buffer }
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..SKYBOX_CUBE.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_ndc() {
        assert_eq!(FULLSCREEN_QUAD.len(), 6);
        for vertex in FULLSCREEN_QUAD {
            assert!(vertex.position[0].abs() == 1.0);
            assert!(vertex.position[1].abs() == 1.0);
            assert!((0.0..=1.0).contains(&vertex.uv[0]));
            assert!((0.0..=1.0).contains(&vertex.uv[1]));
        }
        // All four corners appear.
        for corner in [[-1.0, -1.0], [-1.0, 1.0], [1.0, -1.0], [1.0, 1.0]] {
            assert!(FULLSCREEN_QUAD.iter().any(|v| v.position == corner));
        }
    }

    #[test]
    fn quad_uv_matches_position() {
        for vertex in FULLSCREEN_QUAD {
            assert_eq!(vertex.uv[0], (vertex.position[0] + 1.0) / 2.0);
            assert_eq!(vertex.uv[1], (vertex.position[1] + 1.0) / 2.0);
        }
    }

    #[test]
    fn cube_is_36_unit_vertices() {
        assert_eq!(SKYBOX_CUBE.len(), 36);
        for vertex in SKYBOX_CUBE {
            for coordinate in vertex.position {
                assert_eq!(coordinate.abs(), 1.0);
            }
        }
    }

    #[test]
    fn cube_triangles_face_inward() {
        // Wound counter-clockwise as seen from inside: the right-hand
        // normal of every triangle points toward the cube interior.
        for triangle in SKYBOX_CUBE.chunks(3) {
            let [a, b, c] = [triangle[0].position, triangle[1].position, triangle[2].position];
            let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let normal = [
                e1[1] * e2[2] - e1[2] * e2[1],
                e1[2] * e2[0] - e1[0] * e2[2],
                e1[0] * e2[1] - e1[1] * e2[0],
            ];
            let centroid = [
                (a[0] + b[0] + c[0]) / 3.0,
                (a[1] + b[1] + c[1]) / 3.0,
                (a[2] + b[2] + c[2]) / 3.0,
            ];
            let dot: f32 =
                normal[0] * centroid[0] + normal[1] * centroid[1] + normal[2] * centroid[2];
            assert!(dot < 0.0, "triangle {a:?} {b:?} {c:?} does not face inward");
        }
    }
}
