//! Engine startup configuration
//!
//! Loads settings from a JSON file or falls back to defaults when the file
//! is missing or malformed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window title
    pub window_title: String,

    /// Window width in pixels
    pub window_width: u32,

    /// Window height in pixels
    pub window_height: u32,

    /// Path of the scene description loaded at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<PathBuf>,

    /// Path of the precomputed BRDF lookup texture
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brdf_lookup: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_title: "ember".to_string(),
            window_width: 1280,
            window_height: 720,
            scene: None,
            brdf_lookup: None,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a JSON file.
    ///
    /// A missing or unreadable file yields the default configuration with a
    /// warning; a present but malformed file is an error the caller should
    /// surface.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                log::warn!(
                    "configuration file {} not readable ({err}), using defaults",
                    path.display()
                );
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                log::error!(
                    "configuration file {} is malformed ({err}), using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert!(config.window_width > 0);
        assert!(config.window_height > 0);
        assert!(config.scene.is_none());
    }

    #[test]
    fn roundtrips_through_json() {
        let config = EngineConfig {
            window_title: "test".into(),
            window_width: 800,
            window_height: 600,
            scene: Some(PathBuf::from("scenes/main.json")),
            brdf_lookup: None,
        };

        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.window_width, 800);
        assert_eq!(back.window_height, 600);
        assert_eq!(back.scene.as_deref(), Some(Path::new("scenes/main.json")));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"window_width": 320}"#).unwrap();
        assert_eq!(config.window_width, 320);
        assert_eq!(config.window_height, EngineConfig::default().window_height);
    }
}
