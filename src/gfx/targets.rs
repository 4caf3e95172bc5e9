//! Offscreen render targets and the shared depth buffer
//!
//! The G-buffer and forward (HDR) buffer both attach the one shared depth
//! buffer. The depth buffer carries a generation number bumped on every
//! (re)creation; each target records the generation it attached, which makes
//! the strict resize order — depth first, then G-buffer, then forward
//! buffer — observable and checkable. A mismatch is a programming error and
//! is logged, never silently ignored.

use std::sync::atomic::{AtomicU64, Ordering};

/// World-position attachment format.
pub const GBUFFER_POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Albedo (rgb) + metalness (a) attachment format.
pub const GBUFFER_ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Normal (rgb, signed) + roughness (a) attachment format.
pub const GBUFFER_NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Environment light + emission attachment format.
pub const GBUFFER_ENVIRONMENT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Forward/output HDR color format.
pub const FORWARD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Shared depth buffer format.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

static DEPTH_GENERATION: AtomicU64 = AtomicU64::new(0);

fn attachment_descriptor(
    label: &'static str,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    }
}

/// The one depth-stencil buffer shared by both offscreen targets.
///
/// Never owned by a target; the pipeline recreates it strictly before the
/// targets that attach it.
pub struct SharedDepthBuffer {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
    generation: u64,
}

impl SharedDepthBuffer {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let descriptor = attachment_descriptor("Shared Depth Buffer", DEPTH_FORMAT, width, height);
        let texture = device.create_texture(&descriptor);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let generation = DEPTH_GENERATION.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("created depth buffer {width}x{height} (generation {generation})");
        Self {
            texture,
            view,
            width: width.max(1),
            height: height.max(1),
            generation,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Monotonic creation counter; targets record the value they attached.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// The four G-buffer color attachments, in fixed order: world position,
/// albedo+metalness, normal+roughness, environment+emission.
///
/// Attachments use nearest filtering so packed non-color data is never
/// interpolated.
pub struct GBuffer {
    pub position: wgpu::TextureView,
    pub albedo_metalness: wgpu::TextureView,
    pub normal_roughness: wgpu::TextureView,
    pub environment_emission: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    textures: [wgpu::Texture; 4],
    width: u32,
    height: u32,
    depth_generation: u64,
}

impl GBuffer {
    pub fn new(
        device: &wgpu::Device,
        depth: &SharedDepthBuffer,
        width: u32,
        height: u32,
    ) -> Self {
        let descriptors = Self::color_descriptors(width, height);
        let textures = descriptors.map(|descriptor| device.create_texture(&descriptor));
        let [position, albedo_metalness, normal_roughness, environment_emission] = textures
            .each_ref()
            .map(|texture| texture.create_view(&wgpu::TextureViewDescriptor::default()));

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("GBuffer Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let gbuffer = Self {
            position,
            albedo_metalness,
            normal_roughness,
            environment_emission,
            sampler,
            textures,
            width: width.max(1),
            height: height.max(1),
            depth_generation: depth.generation(),
        };
        gbuffer.check_ready(depth);
        gbuffer
    }

    /// Descriptors for the four color attachments at the given size.
    pub fn color_descriptors(width: u32, height: u32) -> [wgpu::TextureDescriptor<'static>; 4] {
        [
            attachment_descriptor("GBuffer Position", GBUFFER_POSITION_FORMAT, width, height),
            attachment_descriptor(
                "GBuffer Albedo Metalness",
                GBUFFER_ALBEDO_FORMAT,
                width,
                height,
            ),
            attachment_descriptor(
                "GBuffer Normal Roughness",
                GBUFFER_NORMAL_FORMAT,
                width,
                height,
            ),
            attachment_descriptor(
                "GBuffer Environment Emission",
                GBUFFER_ENVIRONMENT_FORMAT,
                width,
                height,
            ),
        ]
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn depth_generation(&self) -> u64 {
        self.depth_generation
    }

    /// Verifies attachment sizes and the depth reference immediately after
    /// creation. Failures are logged and rendering continues.
    pub fn check_ready(&self, depth: &SharedDepthBuffer) -> bool {
        let mut ready = true;
        for texture in &self.textures {
            if texture.width() != self.width || texture.height() != self.height {
                log::error!(
                    "G-buffer attachment is {}x{}, expected {}x{}",
                    texture.width(),
                    texture.height(),
                    self.width,
                    self.height
                );
                ready = false;
            }
        }
        if depth.dimensions() != (self.width, self.height) {
            log::error!(
                "G-buffer {}x{} does not match depth buffer {}x{}",
                self.width,
                self.height,
                depth.dimensions().0,
                depth.dimensions().1
            );
            ready = false;
        }
        if depth.generation() != self.depth_generation {
            log::error!(
                "G-buffer attached depth generation {} but {} is live",
                self.depth_generation,
                depth.generation()
            );
            ready = false;
        }
        if !ready {
            log::error!("G-buffer is not ready");
        }
        ready
    }
}

/// Single-attachment HDR buffer the combine and skybox passes write and the
/// postprocessing pass reads. Linear filtering.
pub struct ForwardBuffer {
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    texture: wgpu::Texture,
    width: u32,
    height: u32,
    depth_generation: u64,
}

impl ForwardBuffer {
    pub fn new(
        device: &wgpu::Device,
        depth: &SharedDepthBuffer,
        width: u32,
        height: u32,
    ) -> Self {
        let texture = device.create_texture(&Self::color_descriptor(width, height));
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Forward Buffer Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let buffer = Self {
            view,
            sampler,
            texture,
            width: width.max(1),
            height: height.max(1),
            depth_generation: depth.generation(),
        };
        buffer.check_ready(depth);
        buffer
    }

    pub fn color_descriptor(width: u32, height: u32) -> wgpu::TextureDescriptor<'static> {
        attachment_descriptor("Forward Color Buffer", FORWARD_FORMAT, width, height)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn depth_generation(&self) -> u64 {
        self.depth_generation
    }

    pub fn check_ready(&self, depth: &SharedDepthBuffer) -> bool {
        let mut ready = true;
        if self.texture.width() != self.width || self.texture.height() != self.height {
            log::error!(
                "forward buffer attachment is {}x{}, expected {}x{}",
                self.texture.width(),
                self.texture.height(),
                self.width,
                self.height
            );
            ready = false;
        }
        if depth.generation() != self.depth_generation {
            log::error!(
                "forward buffer attached depth generation {} but {} is live",
                self.depth_generation,
                depth.generation()
            );
            ready = false;
        }
        if !ready {
            log::error!("forward framebuffer is not ready");
        }
        ready
    }
}

/// All offscreen targets, recreated together on resize.
pub struct RenderTargets {
    pub depth: SharedDepthBuffer,
    pub gbuffer: GBuffer,
    pub forward: ForwardBuffer,
}

impl RenderTargets {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let depth = SharedDepthBuffer::new(device, width, height);
        let gbuffer = GBuffer::new(device, &depth, width, height);
        let forward = ForwardBuffer::new(device, &depth, width, height);
        Self {
            depth,
            gbuffer,
            forward,
        }
    }

    /// Recreates everything at the new size, in dependency order: the shared
    /// depth buffer strictly first, then the targets that attach it.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth = SharedDepthBuffer::new(device, width, height);
        self.gbuffer = GBuffer::new(device, &self.depth, width, height);
        self.forward = ForwardBuffer::new(device, &self.depth, width, height);
    }

    /// Both targets must reference the live depth buffer generation.
    pub fn check_consistent(&self) -> bool {
        let generation = self.depth.generation();
        self.gbuffer.depth_generation() == generation
            && self.forward.depth_generation() == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_formats_are_fixed() {
        let [position, albedo, normal, environment] = GBuffer::color_descriptors(800, 600);
        assert_eq!(position.format, GBUFFER_POSITION_FORMAT);
        assert_eq!(albedo.format, GBUFFER_ALBEDO_FORMAT);
        assert_eq!(normal.format, GBUFFER_NORMAL_FORMAT);
        assert_eq!(environment.format, GBUFFER_ENVIRONMENT_FORMAT);
        assert_eq!(
            ForwardBuffer::color_descriptor(800, 600).format,
            FORWARD_FORMAT
        );
    }

    #[test]
    fn descriptors_match_requested_size() {
        for descriptor in GBuffer::color_descriptors(1920, 1080) {
            assert_eq!(descriptor.size.width, 1920);
            assert_eq!(descriptor.size.height, 1080);
            assert!(descriptor
                .usage
                .contains(wgpu::TextureUsages::RENDER_ATTACHMENT));
            assert!(descriptor
                .usage
                .contains(wgpu::TextureUsages::TEXTURE_BINDING));
        }
    }

    #[test]
    fn descriptor_planning_is_idempotent() {
        // Planning the same resize twice yields identical attachments.
        let first = GBuffer::color_descriptors(1024, 768);
        let second = GBuffer::color_descriptors(1024, 768);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.size, b.size);
            assert_eq!(a.format, b.format);
            assert_eq!(a.usage, b.usage);
        }
    }

    #[test]
    fn zero_area_descriptors_are_clamped() {
        for descriptor in GBuffer::color_descriptors(0, 0) {
            assert_eq!(descriptor.size.width, 1);
            assert_eq!(descriptor.size.height, 1);
        }
    }
}
