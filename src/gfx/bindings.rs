//! Global uniform bindings and shared bind group layouts
//!
//! Manages the per-frame global uniform (camera + key light) and the bind
//! group layouts that scene-owned resources (mesh transforms, materials)
//! build their bind groups against. The group/binding indices here are part
//! of the wire contract with the WGSL shader stages and must not drift.

use crate::gfx::uniform_buffer::UniformBuffer;
use crate::scene::camera::CameraUniform;

/// Bind group index for the global camera/light uniform.
pub const GROUP_GLOBALS: u32 = 0;
/// Bind group index for the per-mesh transform uniform.
pub const GROUP_TRANSFORM: u32 = 1;
/// Bind group index for the material uniform and its maps.
pub const GROUP_MATERIAL: u32 = 2;
/// Bind group index for the environment (radiance/irradiance/BRDF) bundle.
pub const GROUP_ENVIRONMENT: u32 = 3;

/// Global uniform buffer content.
///
/// MUST match the `Globals` struct in the shaders exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniform {
    view_position: [f32; 4],
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    light_direction: [f32; 4],
    light_color: [f32; 4],
}

/// Built-in key light configuration.
///
/// The combine pass evaluates one directional light on top of the
/// image-based environment term so unlit scenes still read.
#[derive(Copy, Clone, Debug)]
pub struct LightConfig {
    /// Direction the light travels, in world space.
    pub direction: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            direction: [-0.4, -1.0, -0.3],
            color: [1.0, 1.0, 1.0],
            intensity: 2.0,
        }
    }
}

/// Type alias for the global uniform buffer
pub type GlobalUBO = UniformBuffer<GlobalUniform>;

/// The global uniform buffer plus its layout and bind group.
pub struct GlobalBindings {
    ubo: GlobalUBO,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let ubo = GlobalUBO::new(device);

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.binding_resource(),
            }],
        });

        Self {
            ubo,
            layout,
            bind_group,
        }
    }

    /// Updates the global uniform with fresh camera matrices and the current
    /// key light. Called once per frame before any pass is recorded.
    pub fn update(&mut self, queue: &wgpu::Queue, camera: CameraUniform, light: LightConfig) {
        self.ubo.update_content(
            queue,
            GlobalUniform {
                view_position: camera.view_position,
                view: camera.view,
                proj: camera.proj,
                light_direction: [
                    light.direction[0],
                    light.direction[1],
                    light.direction[2],
                    0.0,
                ],
                light_color: [
                    light.color[0] * light.intensity,
                    light.color[1] * light.intensity,
                    light.color[2] * light.intensity,
                    1.0,
                ],
            },
        );
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Bind group layouts the scene builds its own bind groups against.
///
/// Owned by the render pipeline and handed to
/// [`SceneGraph::init_gpu_resources`](crate::scene::SceneGraph::init_gpu_resources).
pub struct SceneBindings {
    pub transform_layout: wgpu::BindGroupLayout,
    pub material_layout: wgpu::BindGroupLayout,
}

impl SceneBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let transform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Transform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // Binding 0 is the material uniform; bindings 1..=6 are the map
        // slots in the fixed order albedo, metalness, roughness, normal,
        // emission, ambient occlusion; binding 7 is the shared sampler.
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for binding in 1..=6 {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            });
        }
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 7,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Layout"),
            entries: &entries,
        });

        Self {
            transform_layout,
            material_layout,
        }
    }
}
