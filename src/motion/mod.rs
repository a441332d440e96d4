//! Motion engine - gyro-to-camera conversion
//!
//! Turns raw angular-velocity samples into 2D camera velocities:
//! calibration offset removal, gravity estimation by sensor fusion, one of
//! five orientation models, then the smoothing/tightening/acceleration
//! post-processing pipeline.

pub mod camera;
pub mod fusion;
pub mod pipeline;

pub use fusion::{GravityEstimator, GyroCalibration};
pub use pipeline::GyroPipeline;

use serde::{Deserialize, Serialize};

/// Orientation model used to convert angular velocity into camera velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GyroMode {
    #[default]
    Off,
    Local,
    LocalOw,
    World,
    PlayerTurn,
    PlayerLean,
}

/// Sensitivity multiplier, uniform or independent per axis (yaw, pitch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sensitivity {
    Single(f32),
    Pair([f32; 2]),
}

impl Default for Sensitivity {
    fn default() -> Self {
        Sensitivity::Single(1.0)
    }
}

impl Sensitivity {
    pub fn x(&self) -> f32 {
        match self {
            Sensitivity::Single(s) => *s,
            Sensitivity::Pair([x, _]) => *x,
        }
    }

    pub fn y(&self) -> f32 {
        match self {
            Sensitivity::Single(s) => *s,
            Sensitivity::Pair([_, y]) => *y,
        }
    }
}

/// Per-mapping gyro configuration. Immutable once loaded; all transient
/// state (the smoothing window contents) lives in [`GyroPipeline`], one per
/// physical pad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GyroConfig {
    #[serde(default)]
    pub mode: GyroMode,
    #[serde(default)]
    pub gyro_sens: Sensitivity,
    /// Sensitivity applied at and beyond `fast_threshold`; interpolated
    /// (unclamped) from `gyro_sens` across the threshold window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_sens: Option<Sensitivity>,
    /// Angular speed (deg/s) at or below which `gyro_sens` applies fully.
    #[serde(default)]
    pub slow_threshold: f32,
    /// Angular speed (deg/s) at which `fast_sens` applies fully.
    #[serde(default = "default_fast_threshold")]
    pub fast_threshold: f32,
    /// Smoothing window length in samples; no smoothing when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smooth_window: Option<usize>,
    /// Speed (deg/s) above which input bypasses smoothing entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smooth_threshold: Option<f32>,
    /// Speed (deg/s) below which input is proportionally suppressed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tightening_threshold: Option<f32>,
    /// LOCAL mode: take yaw from the yaw axis (true) or the roll axis.
    #[serde(default = "default_true")]
    pub yaw_turn_axis: bool,
}

impl Default for GyroConfig {
    fn default() -> Self {
        Self {
            mode: GyroMode::Off,
            gyro_sens: Sensitivity::default(),
            fast_sens: None,
            slow_threshold: 0.0,
            fast_threshold: default_fast_threshold(),
            smooth_window: None,
            smooth_threshold: None,
            tightening_threshold: None,
            yaw_turn_axis: true,
        }
    }
}

fn default_fast_threshold() -> f32 {
    75.0
}

fn default_true() -> bool {
    true
}
