//! GPU resources and the deferred render pipeline

pub mod bindings;
pub mod cubemap;
pub mod geometry;
pub mod pipeline;
pub mod pipeline_manager;
pub mod targets;
pub mod texture;
pub mod uniform_buffer;
pub mod vertex;

pub use bindings::LightConfig;
pub use cubemap::Cubemap;
pub use pipeline::RenderPipeline;
pub use targets::RenderTargets;
pub use texture::TextureResource;
pub use vertex::Vertex3D;
