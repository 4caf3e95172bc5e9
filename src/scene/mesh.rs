//! Mesh node payload
//!
//! A mesh holds CPU-side geometry produced by the importer plus
//! lazily-created GPU buffers, and draws itself with whatever pipeline is
//! currently bound. Opacity is decided once at load time and never changes;
//! the scene graph uses it to place the mesh in exactly one draw list.

use cgmath::{Matrix, Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::gfx::bindings::{SceneBindings, GROUP_MATERIAL, GROUP_TRANSFORM};
use crate::gfx::uniform_buffer::UniformBuffer;
use crate::gfx::vertex::Vertex3D;

use super::material::{MaterialId, MaterialSet};

/// Per-mesh transform uniform.
///
/// MUST match the `Transform` struct in the geometry shader exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

type TransformUBO = UniformBuffer<TransformUniform>;

struct MeshGpu {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    transform_ubo: TransformUBO,
    transform_bind_group: wgpu::BindGroup,
}

/// Drawable geometry with a material reference.
pub struct Mesh {
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
    material: MaterialId,
    transparent: bool,
    gpu: Option<MeshGpu>,
}

impl Mesh {
    pub fn new(
        vertices: Vec<Vertex3D>,
        indices: Vec<u32>,
        material: MaterialId,
        transparent: bool,
    ) -> Self {
        Self {
            vertices,
            indices,
            material,
            transparent,
            gpu: None,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn set_material(&mut self, material: MaterialId) {
        self.material = material;
    }

    /// Whether this mesh belongs to the transparent draw list.
    ///
    /// Fixed at construction; list membership never migrates.
    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// Creates vertex/index buffers and the transform uniform.
    ///
    /// Must be called after the GPU context is available and before drawing.
    pub fn init_gpu_resources(&mut self, device: &wgpu::Device, bindings: &SceneBindings) {
        if self.gpu.is_some() {
            return;
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let transform_ubo = TransformUBO::new_with_data(
            device,
            &TransformUniform {
                model: Matrix4::identity().into(),
                normal: Matrix4::identity().into(),
            },
        );

        let transform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Transform Bind Group"),
            layout: &bindings.transform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: transform_ubo.binding_resource(),
            }],
        });

        self.gpu = Some(MeshGpu {
            vertex_buffer,
            index_buffer,
            transform_ubo,
            transform_bind_group,
        });
    }

    /// Syncs the node's world transform into the GPU uniform.
    pub fn write_transform(&mut self, queue: &wgpu::Queue, world: &Matrix4<f32>) {
        if let Some(gpu) = &mut self.gpu {
            let normal = world
                .invert()
                .map(|inv| inv.transpose())
                .unwrap_or_else(Matrix4::identity);
            gpu.transform_ubo.update_content(
                queue,
                TransformUniform {
                    model: (*world).into(),
                    normal: normal.into(),
                },
            );
        }
    }

    /// Issues one indexed draw with this mesh's transform and material bound
    /// at the fixed group slots the active shader expects.
    ///
    /// A mesh whose GPU resources were never initialized is skipped.
    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, materials: &'a MaterialSet) {
        let Some(gpu) = &self.gpu else {
            log::debug!("skipping draw of mesh without GPU resources");
            return;
        };

        let material = materials.get(self.material);
        let Some(material_bind_group) = material.bind_group() else {
            log::debug!("skipping draw of mesh whose material has no GPU resources");
            return;
        };

        render_pass.set_bind_group(GROUP_TRANSFORM, &gpu.transform_bind_group, &[]);
        render_pass.set_bind_group(GROUP_MATERIAL, material_bind_group, &[]);
        render_pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
        render_pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.indices.len() as u32, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(position: [f32; 3]) -> Vertex3D {
        Vertex3D {
            position,
            normal: [0.0, 0.0, 1.0],
            tangent: [1.0, 0.0, 0.0],
            uv: [0.0, 0.0],
        }
    }

    #[test]
    fn opacity_is_fixed_at_construction() {
        let mesh = Mesh::new(vec![vertex([0.0; 3])], vec![0], MaterialId::DEFAULT, true);
        assert!(mesh.is_transparent());
        let mesh = Mesh::new(vec![vertex([0.0; 3])], vec![0], MaterialId::DEFAULT, false);
        assert!(!mesh.is_transparent());
    }

    #[test]
    fn counts_reflect_geometry() {
        let mesh = Mesh::new(
            vec![vertex([0.0; 3]), vertex([1.0, 0.0, 0.0]), vertex([0.0, 1.0, 0.0])],
            vec![0, 1, 2],
            MaterialId::DEFAULT,
            false,
        );
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
    }
}
