use std::path::Path;

use serde::{Deserialize, Serialize};

/// How node transforms are applied to local primitive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsMode {
    /// Transform only the min and max corners. Cheap, but under-estimates
    /// rotated content.
    #[default]
    ExtremeCorners,
    /// Transform all eight corners of every primitive box.
    AllCorners,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperStyle {
    pub grid_divisions: u32,
    pub axis_colors: [[f32; 4]; 3],
    pub box_color: [f32; 4],
    pub grid_color: [f32; 4],
    /// Edge length of the helper box drawn when there is no content to measure.
    pub empty_extent: f32,
}

impl Default for HelperStyle {
    fn default() -> Self {
        Self {
            grid_divisions: 10,
            axis_colors: [
                [1.0, 0.0, 0.0, 1.0],
                [0.0, 1.0, 0.0, 1.0],
                [0.0, 0.0, 1.0, 1.0],
            ],
            box_color: [0.5, 0.5, 0.5, 1.0],
            grid_color: [0.3, 0.3, 0.3, 1.0],
            empty_extent: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Reserved unit name of the helper geometry.
    pub helper_name: String,
    /// Node extras key holding the unit name.
    pub tag_key: String,
    /// Boxes with a size component above this are considered empty.
    pub empty_threshold: f32,
    pub bounds_mode: BoundsMode,
    pub source_prefix: String,
    pub generator: String,
    /// Publications kept for replay to late subscribers. Live delivery is unaffected.
    pub history_limit: usize,
    pub helpers: HelperStyle,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            helper_name: "__helpers".to_string(),
            tag_key: "__unit".to_string(),
            empty_threshold: 1.0e20,
            bounds_mode: BoundsMode::default(),
            source_prefix: "scene-".to_string(),
            generator: concat!("scene-composer@", env!("CARGO_PKG_VERSION")).to_string(),
            history_limit: 8,
            helpers: HelperStyle::default(),
        }
    }
}

impl ComposerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.helper_name.is_empty() {
            return Err(ConfigError::Invalid("helper_name must not be empty".to_string()));
        }
        if self.tag_key.is_empty() {
            return Err(ConfigError::Invalid("tag_key must not be empty".to_string()));
        }
        if !(self.empty_threshold > 0.0) {
            return Err(ConfigError::Invalid("empty_threshold must be positive".to_string()));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
