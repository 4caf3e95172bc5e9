//! Cubemap resources for sky and environment lighting
//!
//! A cubemap is loaded from six face images. The radiance variant carries a
//! mip chain of prefiltered faces, sampled by roughness-dependent level in
//! the geometry pass.

use std::path::Path;

use crate::error::SceneError;

/// Face file names, in wgpu array-layer order (+X, -X, +Y, -Y, +Z, -Z).
const FACE_NAMES: [&str; 6] = ["posx", "negx", "posy", "negy", "posz", "negz"];

/// GPU cubemap with view and sampler.
pub struct Cubemap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    mip_level_count: u32,
}

impl Cubemap {
    /// Number of mip levels; 1 for plain cubemaps, more for prefiltered
    /// radiance chains.
    pub fn mip_level_count(&self) -> u32 {
        self.mip_level_count
    }

    /// Loads a cubemap from a directory of face images.
    ///
    /// Plain cubemaps read `<dir>/<face>.<ext>` for the six faces. With
    /// `with_mips`, prefiltered levels are read from `<dir>/mip<level>/`
    /// subdirectories, starting at `mip0`, until a level is missing; each
    /// level must be square and half the previous size.
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        dir: &Path,
        extension: &str,
        with_mips: bool,
    ) -> Result<Self, SceneError> {
        let mut levels: Vec<[image::RgbaImage; 6]> = Vec::new();

        if with_mips {
            loop {
                let mip_dir = dir.join(format!("mip{}", levels.len()));
                if !mip_dir.is_dir() {
                    break;
                }
                levels.push(Self::load_faces(&mip_dir, extension)?);
            }
            if levels.is_empty() {
                // No mip directories; fall back to a single-level chain.
                levels.push(Self::load_faces(dir, extension)?);
            }
        } else {
            levels.push(Self::load_faces(dir, extension)?);
        }

        let base_size = levels[0][0].width();
        for (level, faces) in levels.iter().enumerate() {
            let expected = (base_size >> level).max(1);
            for (face, img) in faces.iter().enumerate() {
                if img.width() != expected || img.height() != expected {
                    return Err(SceneError::Invalid(format!(
                        "cubemap {} face {} at level {} is {}x{}, expected {expected}x{expected}",
                        dir.display(),
                        FACE_NAMES[face],
                        level,
                        img.width(),
                        img.height(),
                    )));
                }
            }
        }

        let mip_level_count = levels.len() as u32;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("Cubemap {}", dir.display())),
            size: wgpu::Extent3d {
                width: base_size,
                height: base_size,
                depth_or_array_layers: 6,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, faces) in levels.iter().enumerate() {
            let size = (base_size >> level).max(1);
            for (face, img) in faces.iter().enumerate() {
                queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &texture,
                        mip_level: level as u32,
                        origin: wgpu::Origin3d {
                            x: 0,
                            y: 0,
                            z: face as u32,
                        },
                        aspect: wgpu::TextureAspect::All,
                    },
                    img,
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(4 * size),
                        rows_per_image: Some(size),
                    },
                    wgpu::Extent3d {
                        width: size,
                        height: size,
                        depth_or_array_layers: 1,
                    },
                );
            }
        }

        Ok(Self::from_texture(device, texture, mip_level_count))
    }

    fn load_faces(dir: &Path, extension: &str) -> Result<[image::RgbaImage; 6], SceneError> {
        let mut faces = Vec::with_capacity(6);
        for name in FACE_NAMES {
            let path = dir.join(format!("{name}.{extension}"));
            let img = image::open(&path)
                .map_err(|source| SceneError::Image {
                    path: path.clone(),
                    source,
                })?
                .to_rgba8();
            faces.push(img);
        }
        Ok(faces.try_into().expect("six faces were just collected"))
    }

    /// Creates a 1×1 solid-color cubemap.
    ///
    /// Bound in place of absent sky cubemaps so the geometry pass always has
    /// a complete environment bind group; black means no ambient light.
    pub fn solid_color(device: &wgpu::Device, queue: &wgpu::Queue, rgba: [u8; 4]) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Placeholder Cubemap"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for face in 0..6u32 {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d { x: 0, y: 0, z: face },
                    aspect: wgpu::TextureAspect::All,
                },
                &rgba,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4),
                    rows_per_image: Some(1),
                },
                wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
            );
        }

        Self::from_texture(device, texture, 1)
    }

    fn from_texture(device: &wgpu::Device, texture: wgpu::Texture, mip_level_count: u32) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Cubemap Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            mip_level_count,
        }
    }
}
