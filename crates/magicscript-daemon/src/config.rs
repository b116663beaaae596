//! Configuration loading and validation

use anyhow::{bail, Result};
use magicscript_bridge::EngineConfig;
use magicscript_core::PlaneConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub planes: PlanesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Capacity of the outbound scene event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8090".to_string()
}

fn default_event_buffer() -> usize {
    256
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesConfig {
    /// Base directory for fonts, models, textures and media
    #[serde(default = "default_resources_path")]
    pub path: String,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            path: default_resources_path(),
        }
    }
}

fn default_resources_path() -> String {
    "./assets".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Maximum number of media players in use at once
    #[serde(default = "default_media_pool_size")]
    pub media_pool_size: usize,
    /// Anchor the scene root on the first tapped plane
    #[serde(default = "default_true")]
    pub place_root_on_tap: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            media_pool_size: default_media_pool_size(),
            place_root_on_tap: true,
        }
    }
}

fn default_media_pool_size() -> usize {
    8
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanesConfig {
    /// Plane types detected when scripts start detection without a configuration
    #[serde(default = "default_plane_types")]
    pub types: Vec<String>,
}

impl Default for PlanesConfig {
    fn default() -> Self {
        Self {
            types: default_plane_types(),
        }
    }
}

fn default_plane_types() -> Vec<String> {
    vec!["horizontal".to_string(), "vertical".to_string()]
}

impl Config {
    /// Convert to the scene engine settings
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            media_pool_size: self.scene.media_pool_size,
            place_root_on_tap: self.scene.place_root_on_tap,
            plane_types: PlaneConfig::from_names(self.planes.types.as_slice()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.daemon.event_buffer == 0 {
            bail!("daemon.event_buffer must be greater than zero");
        }
        if self.scene.media_pool_size == 0 {
            bail!("scene.media_pool_size must be greater than zero");
        }
        if let Some(unknown) = self
            .planes
            .types
            .iter()
            .find(|t| !matches!(t.as_str(), "horizontal" | "vertical"))
        {
            bail!("planes.types: unknown plane type '{}'", unknown);
        }
        Ok(())
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        config
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}
