//! Renderer configuration.
//!
//! Configuration is loaded from an optional TOML file; any missing field
//! falls back to its default, so a partial file is fine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Preferred presentation strategy, mapped to a Vulkan present mode by the
/// swapchain layer. The swapchain falls back along its own preference chain
/// when the surface does not support the requested mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PresentPreference {
    /// Low-latency triple buffering when available.
    #[default]
    Mailbox,
    /// Always-available vsync.
    Fifo,
    /// Uncapped, may tear.
    Immediate,
}

/// Top-level renderer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Window title.
    pub title: String,
    /// Initial window width in logical pixels.
    pub width: u32,
    /// Initial window height in logical pixels.
    pub height: u32,
    /// Enable Vulkan validation layers.
    pub validation: bool,
    /// Fence wait timeout in nanoseconds. `None` waits forever.
    pub fence_timeout_ns: Option<u64>,
    /// Preferred present mode.
    pub present_preference: PresentPreference,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "glint".to_string(),
            width: 1280,
            height: 720,
            validation: cfg!(debug_assertions),
            fence_timeout_ns: None,
            present_preference: PresentPreference::default(),
        }
    }
}

impl RendererConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from a TOML file if it exists, otherwise defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RendererConfig::default();
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 720);
        assert_eq!(config.fence_timeout_ns, None);
        assert_eq!(config.present_preference, PresentPreference::Mailbox);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: RendererConfig = toml::from_str("width = 640\nheight = 480").unwrap();
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 480);
        assert_eq!(config.title, "glint");
        assert_eq!(config.present_preference, PresentPreference::Mailbox);
    }

    #[test]
    fn test_present_preference_parsing() {
        let config: RendererConfig =
            toml::from_str("present_preference = \"immediate\"").unwrap();
        assert_eq!(config.present_preference, PresentPreference::Immediate);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config =
            RendererConfig::load_or_default(Path::new("/nonexistent/glint.toml")).unwrap();
        assert_eq!(config.width, 1280);
    }
}
