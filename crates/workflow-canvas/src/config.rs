//! Canvas configuration
//!
//! Every section falls back to its defaults, so a partial JSON file (or no
//! file at all) yields a usable configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::execution_order::OrderNumbering;

/// Zoom limits and step sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZoomConfig {
    pub min: f64,
    pub max: f64,
    /// Change per wheel tick
    pub step: f64,
    /// Change per keyboard zoom in/out
    pub keyboard_step: f64,
    /// Zoom after load or reset
    pub default: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min: constants::zoom::MIN,
            max: constants::zoom::MAX,
            step: constants::zoom::WHEEL_STEP,
            keyboard_step: constants::zoom::KEYBOARD_STEP,
            default: constants::zoom::DEFAULT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    /// Cell size in logical units
    pub size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: constants::grid::SIZE,
        }
    }
}

/// Which connections the validator refuses beyond the mandatory rules
///
/// Both checks are off by default; the mandatory self-connection and
/// port-type rules always apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionPolicy {
    pub reject_duplicates: bool,
    pub reject_cycles: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    pub max_snapshots: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_snapshots: constants::history::MAX_SNAPSHOTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClipboardConfig {
    /// Logical offset applied to each successive paste
    pub paste_offset: f64,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            paste_offset: constants::grid::SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FitConfig {
    /// Screen-pixel margin around the fitted graph
    pub padding: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            padding: constants::fit::PADDING,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MinimapConfig {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for MinimapConfig {
    fn default() -> Self {
        Self {
            width: constants::minimap::WIDTH,
            height: constants::minimap::HEIGHT,
            padding: constants::minimap::PADDING,
        }
    }
}

/// Full canvas configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    pub zoom: ZoomConfig,
    pub grid: GridConfig,
    /// Node type tags that mark workflow entry points
    pub trigger_types: Vec<String>,
    /// How execution order numbers are assigned
    pub ordering: OrderNumbering,
    pub connections: ConnectionPolicy,
    pub history: HistoryConfig,
    pub clipboard: ClipboardConfig,
    pub fit: FitConfig,
    pub minimap: MinimapConfig,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomConfig::default(),
            grid: GridConfig::default(),
            trigger_types: vec![
                constants::triggers::MANUAL.to_string(),
                constants::triggers::SCHEDULE.to_string(),
                constants::triggers::WEBHOOK.to_string(),
                constants::triggers::EVENT.to_string(),
            ],
            ordering: OrderNumbering::default(),
            connections: ConnectionPolicy::default(),
            history: HistoryConfig::default(),
            clipboard: ClipboardConfig::default(),
            fit: FitConfig::default(),
            minimap: MinimapConfig::default(),
        }
    }
}

impl CanvasConfig {
    /// Parse and validate a configuration from JSON text
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: CanvasConfig = serde_json::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from disk
    ///
    /// A missing file is not an error; the defaults are returned instead.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No canvas config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        log::info!("Loaded canvas configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents)?;

        log::info!("Canvas configuration saved to {:?}", path);
        Ok(())
    }

    /// Check the numeric ranges the viewport and grid rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zoom = &self.zoom;
        if !(zoom.min > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "zoom.min must be positive, got {}",
                zoom.min
            )));
        }
        if !(zoom.min <= zoom.default && zoom.default <= zoom.max) {
            return Err(ConfigError::Invalid(format!(
                "zoom.default {} must lie within [{}, {}]",
                zoom.default, zoom.min, zoom.max
            )));
        }
        if !(zoom.step > 0.0) || !(zoom.keyboard_step > 0.0) {
            return Err(ConfigError::Invalid("zoom steps must be positive".to_string()));
        }
        if !(self.grid.size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "grid.size must be positive, got {}",
                self.grid.size
            )));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}
