// src/lib.rs
//! Ember 3D Engine
//!
//! A real-time deferred rendering engine built on wgpu and winit.
//!
//! Each frame is rendered through a fixed multi-pass pipeline: a geometry
//! pass writes scene attributes into a G-buffer, a combine pass resolves
//! lighting into an HDR buffer, an optional skybox pass fills the far plane,
//! and a postprocessing pass tone-maps onto the window surface. Scene content
//! lives in a hierarchical [`scene::SceneGraph`] fed by a JSON scene
//! description and OBJ mesh import.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod scene;

// Re-export main types for convenience
pub use app::EmberApp;
pub use config::EngineConfig;
pub use error::SceneError;

/// Creates an Ember application with default settings
pub fn default() -> EmberApp {
    EmberApp::new(EngineConfig::default())
}
