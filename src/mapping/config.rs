//! Mapping document model
//!
//! Serde-backed YAML schema for mapping files. A document is parsed into
//! [`MappingConfig`], then compiled into a runtime [`Mapping`](super::Mapping)
//! (which validates autoload patterns). Loading never panics; every failure
//! surfaces as a [`ConfigError`] so a bad file only costs that one mapping.

use super::autoload::AutoloadRule;
use super::{MapSource, TargetSpec};
use crate::motion::GyroConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a mapping document was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read mapping file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed mapping document: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid autoload pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Root mapping document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MappingConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoload: Option<AutoloadRule>,
    /// Gyro settings for the base layer. Layers may override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gyro: Option<GyroConfig>,
    /// Mouse-motion calibration: real-world turn scale, divided by the OS
    /// pointer speed (when countered) and the in-game sensitivity.
    #[serde(default = "default_real_world_calibration")]
    pub real_world_calibration: f32,
    #[serde(default = "default_in_game_sens")]
    pub in_game_sens: f32,
    #[serde(default)]
    pub counter_os_mouse_speed: bool,
    /// Base layer entries, in declaration order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mapping: IndexMap<MapSource, TargetSpec>,
    /// Named overlay layers, in declaration order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub layers: IndexMap<String, LayerConfig>,
}

/// One overlay layer: entries shadowing the base while the layer is active.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LayerConfig {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mapping: IndexMap<MapSource, TargetSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gyro: Option<GyroConfig>,
}

impl MappingConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn default_real_world_calibration() -> f32 {
    16.0 / 3.0
}

fn default_in_game_sens() -> f32 {
    1.0
}
