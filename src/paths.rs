//! Configs-directory resolution.
//!
//! Precedence: `GYROGATE_CONFIGS` env var, then the per-user config
//! directory (`<config_dir>/gyrogate/configs`), then `./configs` as the
//! development fallback (typical when running with `cargo run`).

use std::path::PathBuf;
use tracing::debug;

const APP_NAME: &str = "gyrogate";

/// Resolve the directory holding mapping documents. Nothing is created
/// here; callers create it when they first write to it.
pub fn configs_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("GYROGATE_CONFIGS") {
        debug!(%dir, "using configs dir from GYROGATE_CONFIGS");
        return PathBuf::from(dir);
    }
    if let Some(base) = dirs::config_dir() {
        let dir = base.join(APP_NAME).join("configs");
        debug!(dir = %dir.display(), "using per-user configs dir");
        return dir;
    }
    debug!("no user config dir available, falling back to ./configs");
    PathBuf::from("configs")
}
