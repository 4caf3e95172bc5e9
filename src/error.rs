//! Error types for scene construction
//!
//! Steady-state rendering has no error path; everything that can fail does so
//! at the load boundary and is surfaced here.

use std::path::PathBuf;

/// Errors raised while loading a scene description or its referenced assets.
///
/// Load failures are reported to the caller and logged; the frame loop keeps
/// running with whatever part of the scene was constructed.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("failed to read scene file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scene description")]
    Parse(#[from] serde_json::Error),

    #[error("failed to import mesh {}", path.display())]
    MeshImport {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("failed to load image {}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("scene description is invalid: {0}")]
    Invalid(String),
}
