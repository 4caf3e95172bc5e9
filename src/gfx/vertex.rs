//! # Vertex Data Structures
//!
//! GPU-compatible vertex formats shared by the mesh importer and the
//! geometry pass.

/// A 3D vertex with position, normal, tangent and texture coordinates.
///
/// The `#[repr(C)]` attribute ensures the struct has a C-compatible memory
/// layout, which is required for GPU buffer operations.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3D {
    /// 3D position coordinates [x, y, z]
    pub position: [f32; 3],
    /// Normal vector for lighting calculations
    pub normal: [f32; 3],
    /// Tangent vector for normal mapping
    pub tangent: [f32; 3],
    /// Texture coordinates [u, v]
    pub uv: [f32; 2],
}

impl Vertex3D {
    /// Returns the vertex buffer layout for wgpu rendering.
    ///
    /// - Attribute 0: Position (Float32x3)
    /// - Attribute 1: Normal (Float32x3)
    /// - Attribute 2: Tangent (Float32x3)
    /// - Attribute 3: UV (Float32x2)
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x3,
            3 => Float32x2,
        ];
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex3D>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_covers_whole_struct() {
        let desc = Vertex3D::desc();
        assert_eq!(
            desc.array_stride,
            std::mem::size_of::<Vertex3D>() as wgpu::BufferAddress
        );
        assert_eq!(desc.attributes.len(), 4);
        let last = desc.attributes.last().unwrap();
        assert_eq!(
            last.offset as usize + std::mem::size_of::<[f32; 2]>(),
            std::mem::size_of::<Vertex3D>()
        );
    }
}
