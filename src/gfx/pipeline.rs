//! Render pipeline orchestrator
//!
//! Owns the surface, device and queue, the offscreen targets, the pass
//! pipelines and the pass geometry, and executes the fixed frame sequence:
//!
//! 1. Geometry pass — opaque meshes into the G-buffer (shared depth cleared
//!    here, once per frame).
//! 2. Combine pass — G-buffer resolved into lit HDR color.
//! 3. Skybox pass — only when the scene has a base skybox cubemap.
//! 4. Postprocessing pass — HDR tone-mapped onto the window surface.
//!
//! A window resize tears down and rebuilds the targets in dependency order
//! (depth buffer first, then G-buffer, then forward buffer) before the next
//! frame is rendered.

use std::path::Path;
use std::sync::Arc;

use crate::gfx::bindings::{
    GlobalBindings, LightConfig, SceneBindings, GROUP_ENVIRONMENT, GROUP_GLOBALS,
};
use crate::gfx::cubemap::Cubemap;
use crate::gfx::geometry::{FullscreenQuad, SkyboxCube};
use crate::gfx::pipeline_manager::{DepthConfig, PipelineConfig, PipelineManager, VertexLayout};
use crate::gfx::targets::{
    RenderTargets, DEPTH_FORMAT, FORWARD_FORMAT, GBUFFER_ALBEDO_FORMAT,
    GBUFFER_ENVIRONMENT_FORMAT, GBUFFER_NORMAL_FORMAT, GBUFFER_POSITION_FORMAT,
};
use crate::gfx::texture::TextureResource;
use crate::scene::SceneGraph;

/// Core renderer managing GPU resources and the per-frame pass sequence.
pub struct RenderPipeline {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    format: wgpu::TextureFormat,

    pipelines: PipelineManager,
    targets: RenderTargets,

    globals: GlobalBindings,
    scene_bindings: SceneBindings,
    light: LightConfig,

    environment_layout: wgpu::BindGroupLayout,
    combine_layout: wgpu::BindGroupLayout,
    skybox_layout: wgpu::BindGroupLayout,
    postprocess_layout: wgpu::BindGroupLayout,

    // Bind groups referencing target attachments; rebuilt on resize.
    combine_bind_group: wgpu::BindGroup,
    postprocess_bind_group: wgpu::BindGroup,
    // Bind groups referencing scene cubemaps; rebuilt by `prepare_environment`.
    environment_bind_group: wgpu::BindGroup,
    skybox_bind_group: Option<wgpu::BindGroup>,

    placeholder_cubemap: Cubemap,
    brdf_lookup: TextureResource,

    quad: FullscreenQuad,
    cube: SkyboxCube,
}

impl RenderPipeline {
    /// Creates the renderer for the given window.
    ///
    /// # Panics
    /// Panics if no adapter or device can be created; startup failure leaves
    /// no partial state behind.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        brdf_path: Option<&Path>,
    ) -> RenderPipeline {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window).unwrap();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("Failed to request adapter!");

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .expect("Failed to request a device!");

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .unwrap_or(surface_capabilities.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_capabilities.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let globals = GlobalBindings::new(&device);
        let scene_bindings = SceneBindings::new(&device);

        let environment_layout = Self::create_environment_layout(&device);
        let combine_layout = Self::create_combine_layout(&device);
        let skybox_layout = Self::create_skybox_layout(&device);
        let postprocess_layout = Self::create_postprocess_layout(&device);

        let targets = RenderTargets::new(&device, config.width, config.height);

        let brdf_lookup = match brdf_path {
            Some(path) => TextureResource::from_file(&device, &queue, path, false)
                .unwrap_or_else(|err| {
                    log::warn!("BRDF lookup unavailable ({err}), using flat response");
                    TextureResource::solid_color(&device, &queue, [255, 0, 0, 255], "brdf fallback")
                }),
            None => TextureResource::solid_color(&device, &queue, [255, 0, 0, 255], "brdf fallback"),
        };

        let placeholder_cubemap = Cubemap::solid_color(&device, &queue, [0, 0, 0, 255]);

        let quad = FullscreenQuad::new(&device);
        let cube = SkyboxCube::new(&device);

        let device: Arc<wgpu::Device> = device.into();
        let queue: Arc<wgpu::Queue> = queue.into();

        let mut pipelines = PipelineManager::new(device.clone());
        pipelines.load_shader("geometry", include_str!("shaders/geometry.wgsl"));
        pipelines.load_shader("combine", include_str!("shaders/combine.wgsl"));
        pipelines.load_shader("skybox", include_str!("shaders/skybox.wgsl"));
        pipelines.load_shader("postprocess", include_str!("shaders/postprocess.wgsl"));

        pipelines.register_pipeline(
            "Geometry",
            PipelineConfig::default()
                .with_label("GEOMETRY")
                .with_shader("geometry")
                .with_vertex_layout(VertexLayout::Mesh)
                .with_bind_group_layouts(vec![
                    globals.layout().clone(),
                    scene_bindings.transform_layout.clone(),
                    scene_bindings.material_layout.clone(),
                    environment_layout.clone(),
                ])
                .with_depth(DepthConfig {
                    format: DEPTH_FORMAT,
                    write_enabled: true,
                    compare: wgpu::CompareFunction::LessEqual,
                })
                .with_color_targets(vec![
                    Some(wgpu::ColorTargetState {
                        format: GBUFFER_POSITION_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                    Some(wgpu::ColorTargetState {
                        format: GBUFFER_ALBEDO_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                    Some(wgpu::ColorTargetState {
                        format: GBUFFER_NORMAL_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                    Some(wgpu::ColorTargetState {
                        format: GBUFFER_ENVIRONMENT_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                ]),
        );

        pipelines.register_pipeline(
            "Combine",
            PipelineConfig::default()
                .with_label("COMBINE")
                .with_shader("combine")
                .with_vertex_layout(VertexLayout::Quad)
                .with_cull_mode(None)
                .with_bind_group_layouts(vec![combine_layout.clone(), globals.layout().clone()])
                .with_color_targets(vec![Some(wgpu::ColorTargetState {
                    format: FORWARD_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })]),
        );

        pipelines.register_pipeline(
            "Skybox",
            PipelineConfig::default()
                .with_label("SKYBOX")
                .with_shader("skybox")
                .with_vertex_layout(VertexLayout::Sky)
                .with_cull_mode(None)
                .with_bind_group_layouts(vec![globals.layout().clone(), skybox_layout.clone()])
                .with_depth(DepthConfig {
                    format: DEPTH_FORMAT,
                    write_enabled: false,
                    compare: wgpu::CompareFunction::LessEqual,
                })
                .with_color_targets(vec![Some(wgpu::ColorTargetState {
                    format: FORWARD_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })]),
        );

        pipelines.register_pipeline(
            "Postprocess",
            PipelineConfig::default()
                .with_label("POSTPROCESS")
                .with_shader("postprocess")
                .with_vertex_layout(VertexLayout::Quad)
                .with_cull_mode(None)
                .with_bind_group_layouts(vec![postprocess_layout.clone()])
                .with_color_targets(vec![Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })]),
        );

        if let Err(errors) = pipelines.create_all_pipelines() {
            for error in errors {
                log::error!("{error}");
            }
        }

        let combine_bind_group =
            Self::create_combine_bind_group(&device, &combine_layout, &targets, &brdf_lookup);
        let postprocess_bind_group =
            Self::create_postprocess_bind_group(&device, &postprocess_layout, &targets);
        let environment_bind_group = Self::create_environment_bind_group(
            &device,
            &environment_layout,
            &placeholder_cubemap,
            &placeholder_cubemap,
            &brdf_lookup,
        );

        RenderPipeline {
            surface,
            device,
            queue,
            config,
            format,
            pipelines,
            targets,
            globals,
            scene_bindings,
            light: LightConfig::default(),
            environment_layout,
            combine_layout,
            skybox_layout,
            postprocess_layout,
            combine_bind_group,
            postprocess_bind_group,
            environment_bind_group,
            skybox_bind_group: None,
            placeholder_cubemap,
            brdf_lookup,
            quad,
            cube,
        }
    }

    fn create_environment_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Environment Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    fn create_combine_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let mut entries = Vec::new();
        for binding in 0..5 {
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
            binding: 5,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Combine Layout"),
            entries: &entries,
        })
    }

    fn create_skybox_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Skybox Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    fn create_postprocess_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Postprocess Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    fn create_combine_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        targets: &RenderTargets,
        brdf_lookup: &TextureResource,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Combine Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.gbuffer.position),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&targets.gbuffer.albedo_metalness),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&targets.gbuffer.normal_roughness),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(
                        &targets.gbuffer.environment_emission,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&brdf_lookup.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&targets.gbuffer.sampler),
                },
            ],
        })
    }

    fn create_postprocess_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        targets: &RenderTargets,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Postprocess Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.forward.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&targets.forward.sampler),
                },
            ],
        })
    }

    fn create_environment_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        radiance: &Cubemap,
        irradiance: &Cubemap,
        brdf_lookup: &TextureResource,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Environment Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&radiance.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&irradiance.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&brdf_lookup.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&radiance.sampler),
                },
            ],
        })
    }

    /// Rebuilds the environment and skybox bind groups from the scene's
    /// cubemaps. Call after (re)loading a scene; absent cubemaps fall back
    /// to a black placeholder.
    pub fn prepare_environment(&mut self, scene: &SceneGraph) {
        let radiance = scene.skybox_radiance().unwrap_or(&self.placeholder_cubemap);
        let irradiance = scene
            .skybox_irradiance()
            .unwrap_or(&self.placeholder_cubemap);
        self.environment_bind_group = Self::create_environment_bind_group(
            &self.device,
            &self.environment_layout,
            radiance,
            irradiance,
            &self.brdf_lookup,
        );

        self.skybox_bind_group = scene.skybox().map(|skybox| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Skybox Bind Group"),
                layout: &self.skybox_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&skybox.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&skybox.sampler),
                    },
                ],
            })
        });
    }

    /// Resizes the surface and rebuilds every target in dependency order.
    ///
    /// Zero-area notifications (minimized window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        // Depth buffer strictly first, then the targets that attach it.
        self.targets.resize(&self.device, width, height);
        if !self.targets.check_consistent() {
            log::error!("render targets reference a stale depth buffer after resize");
        }

        // These bind groups reference the old attachments.
        self.combine_bind_group = Self::create_combine_bind_group(
            &self.device,
            &self.combine_layout,
            &self.targets,
            &self.brdf_lookup,
        );
        self.postprocess_bind_group = Self::create_postprocess_bind_group(
            &self.device,
            &self.postprocess_layout,
            &self.targets,
        );
    }

    /// Renders one frame of the scene.
    ///
    /// Never panics in steady state: an absent camera or an unavailable
    /// surface frame skips the affected work and returns.
    pub fn render(&mut self, scene: &mut SceneGraph) {
        let (width, height) = (self.config.width, self.config.height);

        let camera = scene.camera_uniform(width, height);
        if let Some(camera) = camera {
            self.globals.update(&self.queue, camera, self.light);
        }
        scene.write_transforms(&self.queue);

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(err) => {
                log::error!("skipping frame: {err}");
                return;
            }
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // PASS 1: geometry into the G-buffer. The shared depth buffer gets
        // its once-per-frame clear here.
        {
            let color_attachment = |view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Geometry Pass"),
                color_attachments: &[
                    color_attachment(&self.targets.gbuffer.position),
                    color_attachment(&self.targets.gbuffer.albedo_metalness),
                    color_attachment(&self.targets.gbuffer.normal_roughness),
                    color_attachment(&self.targets.gbuffer.environment_emission),
                ],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(pipeline) = self.pipelines.get_pipeline("Geometry") {
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(GROUP_GLOBALS, self.globals.bind_group(), &[]);
                render_pass.set_bind_group(GROUP_ENVIRONMENT, &self.environment_bind_group, &[]);
                if camera.is_some() {
                    scene.draw_opaque(&mut render_pass);
                }
            }
        }

        // PASS 2: combine the G-buffer into lit HDR color.
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Combine Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.forward.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(pipeline) = self.pipelines.get_pipeline("Combine") {
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.combine_bind_group, &[]);
                render_pass.set_bind_group(1, self.globals.bind_group(), &[]);
                self.quad.draw(&mut render_pass);
            }
        }

        // PASS 3: skybox, only when the scene provides one. Depth is loaded
        // so scene geometry keeps occluding the sky.
        if let (Some(skybox_bind_group), true) = (&self.skybox_bind_group, scene.skybox().is_some())
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Skybox Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.forward.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let (Some(pipeline), true) =
                (self.pipelines.get_pipeline("Skybox"), camera.is_some())
            {
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, self.globals.bind_group(), &[]);
                render_pass.set_bind_group(1, skybox_bind_group, &[]);
                self.cube.draw(&mut render_pass);
            }
        }

        // PASS 4: postprocess onto the window surface — the only pass that
        // writes to the presented target.
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Postprocess Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(pipeline) = self.pipelines.get_pipeline("Postprocess") {
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.postprocess_bind_group, &[]);
                self.quad.draw(&mut render_pass);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }

    /// Layouts the scene builds mesh/material bind groups against.
    pub fn scene_bindings(&self) -> &SceneBindings {
        &self.scene_bindings
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns current surface dimensions
    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn set_light(&mut self, light: LightConfig) {
        self.light = light;
    }

    pub fn light(&self) -> LightConfig {
        self.light
    }

    /// Offscreen targets, exposed for lifecycle inspection.
    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }
}
