//! Mapping file management
//!
//! Handles loading and saving of YAML mapping documents, one file per
//! mapping in the configs directory, plus seeding the directory with the
//! default Xbox passthrough mapping.

pub mod watcher;

use crate::mapping::{ConfigError, MappingConfig};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

pub use watcher::ConfigsWatcher;

/// Seed document written by `--write-default`, matching the built-in
/// passthrough mapping.
pub const DEFAULT_XBOX_YAML: &str = r#"name: Default (Xbox)
mapping:
  N: X_Y
  S: X_A
  E: X_B
  W: X_X
  BACK: X_BACK
  GUIDE: X_GUIDE
  START: X_START
  L3: X_L3
  R3: X_R3
  L1: X_L1
  R1: X_R1
  UP: X_UP
  DOWN: X_DOWN
  LEFT: X_LEFT
  RIGHT: X_RIGHT
  L2: X_L2
  R2: X_R2
  LSTICK: X_LSTICK
  RSTICK: X_RSTICK
"#;

/// Load one mapping document.
pub async fn load_mapping(path: &Path) -> Result<MappingConfig, ConfigError> {
    let text = fs::read_to_string(path).await?;
    MappingConfig::from_yaml(&text)
}

/// Save a mapping document, creating parent directories as needed.
pub async fn save_mapping(path: &Path, config: &MappingConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let text = config.to_yaml()?;
    fs::write(path, text)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Write the default mapping into the configs directory unless a file with
/// that name already exists. Returns the file path.
pub async fn ensure_default_config(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("default_xbox.yml");
    if fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(path);
    }
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;
    fs::write(&path, DEFAULT_XBOX_YAML)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote default mapping");
    Ok(path)
}
