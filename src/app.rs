use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes},
};

use crate::config::EngineConfig;
use crate::gfx::pipeline::RenderPipeline;
use crate::scene::loader::{self, GpuAssets};
use crate::scene::SceneGraph;

/// The Ember application: window, render pipeline and scene.
pub struct EmberApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    config: EngineConfig,
    window: Option<Arc<Window>>,
    pipeline: Option<RenderPipeline>,
    scene: SceneGraph,
}

impl EmberApp {
    /// Creates an application from the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let _ = env_logger::try_init();

        let event_loop = EventLoop::new().expect("Failed to create event loop");

        Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                config,
                window: None,
                pipeline: None,
                scene: SceneGraph::new(),
            },
        }
    }

    /// Creates an application from a configuration file path.
    pub fn from_config_file(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(EngineConfig::load(path))
    }

    /// Access to the scene for procedural setup before `run`.
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.app_state.scene
    }

    /// Run the application (consumes self and starts the event loop)
    pub fn run(mut self) {
        let event_loop = self.event_loop.take().expect("Event loop already consumed");
        event_loop.set_control_flow(ControlFlow::Poll);

        event_loop
            .run_app(&mut self.app_state)
            .expect("Failed to run event loop");
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(self.config.window_title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ));

        if let Ok(window) = event_loop.create_window(attributes) {
            let window_handle = Arc::new(window);
            self.window = Some(window_handle.clone());

            let (width, height) = window_handle.inner_size().into();

            let window_clone = window_handle.clone();
            let brdf_path = self.config.brdf_lookup.clone();
            let mut pipeline = pollster::block_on(async move {
                RenderPipeline::new(window_clone, width, height, brdf_path.as_deref()).await
            });

            // Scene loading needs the GPU context, so it runs after pipeline
            // creation. A failed load leaves an empty scene and keeps going.
            if let Some(scene_path) = self.config.scene.clone() {
                let mut assets = GpuAssets {
                    device: pipeline.device(),
                    queue: pipeline.queue(),
                };
                if let Err(err) =
                    loader::load_scene_file(&mut self.scene, &mut assets, &scene_path)
                {
                    log::error!("scene {} failed to load: {err}", scene_path.display());
                }
            }

            self.scene
                .init_gpu_resources(pipeline.device(), pipeline.queue(), pipeline.scene_bindings());
            pipeline.prepare_environment(&self.scene);

            self.pipeline = Some(pipeline);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return;
        };

        match event {
            WindowEvent::KeyboardInput {
                event:
                    winit::event::KeyEvent {
                        physical_key: winit::keyboard::PhysicalKey::Code(key_code),
                        ..
                    },
                ..
            } => {
                if matches!(key_code, winit::keyboard::KeyCode::Escape) {
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                pipeline.resize(width, height);
            }
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                self.scene.update();
                pipeline.render(&mut self.scene);
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}
