//! Material system for the deferred pipeline
//!
//! Materials describe surface appearance as scalar/map pairs and are shared
//! across meshes by id. They live in a [`MaterialSet`] arena owned by the
//! scene; id 0 is always the fallback material used by meshes that declare
//! none.

use crate::gfx::bindings::SceneBindings;
use crate::gfx::texture::TextureResource;
use crate::gfx::uniform_buffer::UniformBuffer;

/// Handle to a material inside a [`MaterialSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub(crate) usize);

impl MaterialId {
    /// The scene-level fallback material (neutral gray, non-metallic,
    /// fully rough).
    pub const DEFAULT: MaterialId = MaterialId(0);
}

/// GPU uniform data for materials
///
/// MUST match the `Material` struct in the geometry shader exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub albedo: [f32; 4],
    pub emission: [f32; 3],
    pub metalness: f32,
    pub roughness: f32,
    _padding: [f32; 3],
}

type MaterialUBO = UniformBuffer<MaterialUniform>;

struct MaterialGpu {
    ubo: MaterialUBO,
    bind_group: wgpu::BindGroup,
}

/// Surface appearance description.
///
/// Scalar values apply everywhere; an optional map modulates the matching
/// scalar per texel (maps default to neutral placeholders when absent).
/// Setters are plain assignment — a map setter replaces any previously set
/// map without further bookkeeping.
pub struct Material {
    pub albedo: [f32; 4],
    pub metalness: f32,
    pub roughness: f32,
    pub emission: [f32; 3],
    albedo_map: Option<TextureResource>,
    metalness_map: Option<TextureResource>,
    roughness_map: Option<TextureResource>,
    normal_map: Option<TextureResource>,
    emission_map: Option<TextureResource>,
    ambient_occlusion_map: Option<TextureResource>,
    gpu: Option<MaterialGpu>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: [1.0, 1.0, 1.0, 1.0],
            metalness: 0.0,
            roughness: 1.0,
            emission: [0.0, 0.0, 0.0],
            albedo_map: None,
            metalness_map: None,
            roughness_map: None,
            normal_map: None,
            emission_map: None,
            ambient_occlusion_map: None,
            gpu: None,
        }
    }
}

impl Material {
    /// The scene-level fallback: neutral gray, non-metallic, fully rough.
    pub fn fallback() -> Self {
        Self {
            albedo: [0.5, 0.5, 0.5, 1.0],
            ..Default::default()
        }
    }

    pub fn set_albedo(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.albedo = [r, g, b, a];
    }

    pub fn set_metalness(&mut self, metalness: f32) {
        self.metalness = metalness.clamp(0.0, 1.0);
    }

    pub fn set_roughness(&mut self, roughness: f32) {
        self.roughness = roughness.clamp(0.0, 1.0);
    }

    pub fn set_emission(&mut self, r: f32, g: f32, b: f32) {
        self.emission = [r, g, b];
    }

    pub fn set_albedo_map(&mut self, map: TextureResource) {
        self.albedo_map = Some(map);
    }

    pub fn set_metalness_map(&mut self, map: TextureResource) {
        self.metalness_map = Some(map);
    }

    pub fn set_roughness_map(&mut self, map: TextureResource) {
        self.roughness_map = Some(map);
    }

    pub fn set_normal_map(&mut self, map: TextureResource) {
        self.normal_map = Some(map);
    }

    pub fn set_emission_map(&mut self, map: TextureResource) {
        self.emission_map = Some(map);
    }

    pub fn set_ambient_occlusion_map(&mut self, map: TextureResource) {
        self.ambient_occlusion_map = Some(map);
    }

    fn uniform(&self) -> MaterialUniform {
        MaterialUniform {
            albedo: self.albedo,
            emission: self.emission,
            metalness: self.metalness,
            roughness: self.roughness,
            _padding: [0.0; 3],
        }
    }

    /// Creates or refreshes this material's uniform buffer and bind group.
    fn update_gpu_resources(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bindings: &SceneBindings,
        placeholders: &PlaceholderMaps,
    ) {
        if self.gpu.is_none() {
            let ubo = MaterialUBO::new_with_data(device, &self.uniform());

            let maps = [
                self.albedo_map.as_ref().unwrap_or(&placeholders.white),
                self.metalness_map.as_ref().unwrap_or(&placeholders.white),
                self.roughness_map.as_ref().unwrap_or(&placeholders.white),
                self.normal_map.as_ref().unwrap_or(&placeholders.normal),
                self.emission_map.as_ref().unwrap_or(&placeholders.white),
                self.ambient_occlusion_map
                    .as_ref()
                    .unwrap_or(&placeholders.white),
            ];

            let mut entries = vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.binding_resource(),
            }];
            for (i, map) in maps.iter().enumerate() {
                entries.push(wgpu::BindGroupEntry {
                    binding: 1 + i as u32,
                    resource: wgpu::BindingResource::TextureView(&map.view),
                });
            }
            entries.push(wgpu::BindGroupEntry {
                binding: 7,
                resource: wgpu::BindingResource::Sampler(&placeholders.sampler),
            });

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Material Bind Group"),
                layout: &bindings.material_layout,
                entries: &entries,
            });

            self.gpu = Some(MaterialGpu { ubo, bind_group });
        } else {
            let uniform = self.uniform();
            if let Some(gpu) = &mut self.gpu {
                gpu.ubo.update_content(queue, uniform);
            }
        }
    }

    /// Gets the bind group for rendering; `None` until GPU init ran.
    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu.as_ref().map(|gpu| &gpu.bind_group)
    }
}

/// Neutral 1×1 textures bound in place of absent maps.
struct PlaceholderMaps {
    white: TextureResource,
    normal: TextureResource,
    sampler: wgpu::Sampler,
}

impl PlaceholderMaps {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let white = TextureResource::solid_color(device, queue, [255; 4], "placeholder white");
        // The flat-surface color for tangent-space normal maps.
        let normal =
            TextureResource::solid_color(device, queue, [127, 127, 255, 255], "placeholder normal");
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            white,
            normal,
            sampler,
        }
    }
}

/// Arena of materials owned by the scene.
///
/// Materials are shared by id; nothing in the node tree owns one. The whole
/// set is dropped with the scene, releasing each map exactly once.
pub struct MaterialSet {
    materials: Vec<Material>,
    placeholders: Option<PlaceholderMaps>,
}

impl Default for MaterialSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialSet {
    pub fn new() -> Self {
        Self {
            materials: vec![Material::fallback()],
            placeholders: None,
        }
    }

    pub fn add(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Looks a material up, falling back to the default for stale ids.
    pub fn get(&self, id: MaterialId) -> &Material {
        self.materials.get(id.0).unwrap_or(&self.materials[0])
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Creates GPU resources for every material.
    ///
    /// Call again after mutating material values to sync changes.
    pub fn init_gpu_resources(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bindings: &SceneBindings,
    ) {
        if self.placeholders.is_none() {
            self.placeholders = Some(PlaceholderMaps::new(device, queue));
        }
        let placeholders = self.placeholders.as_ref().unwrap();
        for material in &mut self.materials {
            material.update_gpu_resources(device, queue, bindings, placeholders);
        }
    }

    /// Drops every material except the rebuilt default.
    pub fn clear(&mut self) {
        self.materials.clear();
        self.materials.push(Material::fallback());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_neutral_gray_fully_rough() {
        let material = Material::fallback();
        assert_eq!(material.albedo, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(material.metalness, 0.0);
        assert_eq!(material.roughness, 1.0);
    }

    #[test]
    fn default_albedo_is_opaque_white() {
        assert_eq!(Material::default().albedo, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn scalar_setters_clamp() {
        let mut material = Material::default();
        material.set_metalness(2.0);
        material.set_roughness(-1.0);
        assert_eq!(material.metalness, 1.0);
        assert_eq!(material.roughness, 0.0);
    }

    #[test]
    fn set_stores_exact_albedo() {
        let mut material = Material::default();
        material.set_albedo(1.0, 0.0, 0.0, 1.0);
        assert_eq!(material.albedo, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn arena_reserves_default_at_zero() {
        let mut set = MaterialSet::new();
        assert_eq!(set.len(), 1);
        let id = set.add(Material::default());
        assert_ne!(id, MaterialId::DEFAULT);
        assert_eq!(set.get(MaterialId::DEFAULT).albedo, [0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn stale_id_falls_back_to_default() {
        let set = MaterialSet::new();
        let stale = MaterialId(42);
        assert_eq!(set.get(stale).albedo, [0.5, 0.5, 0.5, 1.0]);
    }
}
