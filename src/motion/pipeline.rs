//! Gyro post-processing pipeline.
//!
//! Applied in fixed order after camera-mode conversion: tiered smoothing,
//! tightening (low-speed suppression), then two-tier acceleration
//! sensitivity. Thresholds are configured in deg/s; camera values are
//! already scaled by dt, so thresholds are compared against `threshold * dt`.

use super::GyroConfig;
use crate::math::{clamp, Vec2};
use std::collections::VecDeque;

/// Transient post-processing state, one per physical pad. The configuration
/// it interprets stays immutable and shareable.
#[derive(Debug, Clone, Default)]
pub struct GyroPipeline {
    window: VecDeque<Vec2>,
}

impl GyroPipeline {
    /// Run one camera sample through the pipeline. `raw_speed_dps` is the
    /// angular speed of the underlying gyro sample, used to pick the
    /// sensitivity tier.
    pub fn process(&mut self, cfg: &GyroConfig, camera: Vec2, raw_speed_dps: f32, dt: f32) -> Vec2 {
        let value = self.smooth(cfg, camera, dt);
        let value = tighten(cfg, value, dt);
        let (sens_x, sens_y) = interpolate_sens(cfg, raw_speed_dps);
        Vec2::new(value.x * sens_x, value.y * sens_y)
    }

    /// Drop buffered samples (on mapping swap or calibration start).
    pub fn reset(&mut self) {
        self.window.clear();
    }

    fn smooth(&mut self, cfg: &GyroConfig, value: Vec2, dt: f32) -> Vec2 {
        let Some(window) = cfg.smooth_window else {
            return value;
        };
        if window == 0 {
            return value;
        }
        match cfg.smooth_threshold {
            None => self.push_and_average(window, value),
            Some(threshold) => {
                // Fast motion passes straight through, slow motion is fully
                // smoothed, with a linear blend from half- to full-threshold.
                let full = threshold * dt;
                let half = full * 0.5;
                let direct_weight = if full - half <= 0.0 {
                    1.0
                } else {
                    clamp((value.length() - half) / (full - half), 0.0, 1.0)
                };
                let direct = value * direct_weight;
                let smoothed = self.push_and_average(window, value * (1.0 - direct_weight));
                direct + smoothed
            }
        }
    }

    fn push_and_average(&mut self, window: usize, value: Vec2) -> Vec2 {
        self.window.push_back(value);
        while self.window.len() > window {
            self.window.pop_front();
        }
        let mut sum = Vec2::ZERO;
        for sample in &self.window {
            sum += *sample;
        }
        sum / self.window.len() as f32
    }
}

fn tighten(cfg: &GyroConfig, value: Vec2, dt: f32) -> Vec2 {
    let Some(threshold) = cfg.tightening_threshold else {
        return value;
    };
    let full = threshold * dt;
    if full <= 0.0 {
        return value;
    }
    let length = value.length();
    if length < full {
        value * (length / full)
    } else {
        value
    }
}

/// Interpolate per-axis sensitivity between the slow and fast tiers.
///
/// The factor is deliberately unclamped: speeds outside the threshold window
/// extrapolate beyond either tier, matching observed behavior.
fn interpolate_sens(cfg: &GyroConfig, speed_dps: f32) -> (f32, f32) {
    let slow = cfg.gyro_sens;
    let Some(fast) = cfg.fast_sens else {
        return (slow.x(), slow.y());
    };
    let span = cfg.fast_threshold - cfg.slow_threshold;
    let factor = if span == 0.0 {
        if speed_dps >= cfg.fast_threshold {
            1.0
        } else {
            0.0
        }
    } else {
        (speed_dps - cfg.slow_threshold) / span
    };
    (
        slow.x() + (fast.x() - slow.x()) * factor,
        slow.y() + (fast.y() - slow.y()) * factor,
    )
}

/// Convert a camera velocity into mouse pixels: zero when either divisor is
/// zero, otherwise `real_world_calibration / os_mouse_speed / in_game_sens`.
pub fn mouse_calibration(real_world_calibration: f32, os_mouse_speed: f32, in_game_sens: f32) -> f32 {
    if os_mouse_speed == 0.0 || in_game_sens == 0.0 {
        return 0.0;
    }
    real_world_calibration / os_mouse_speed / in_game_sens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::Sensitivity;

    const EPS: f32 = 1e-5;

    fn cfg() -> GyroConfig {
        GyroConfig::default()
    }

    #[test]
    fn no_options_is_passthrough_at_unit_sens() {
        let mut pipeline = GyroPipeline::default();
        let out = pipeline.process(&cfg(), Vec2::new(3.0, -2.0), 10.0, 0.001);
        assert!((out.x - 3.0).abs() < EPS);
        assert!((out.y - -2.0).abs() < EPS);
    }

    #[test]
    fn smoothing_averages_over_the_window() {
        let mut config = cfg();
        config.smooth_window = Some(2);
        let mut pipeline = GyroPipeline::default();
        pipeline.process(&config, Vec2::new(2.0, 0.0), 10.0, 0.001);
        let out = pipeline.process(&config, Vec2::new(4.0, 0.0), 10.0, 0.001);
        assert!((out.x - 3.0).abs() < EPS);
    }

    #[test]
    fn fast_motion_bypasses_tiered_smoothing() {
        let mut config = cfg();
        config.smooth_window = Some(4);
        config.smooth_threshold = Some(10.0); // full threshold = 10 * dt
        let mut pipeline = GyroPipeline::default();
        // Magnitude far above threshold*dt: direct weight saturates at 1.
        let out = pipeline.process(&config, Vec2::new(5.0, 0.0), 100.0, 0.001);
        assert!((out.x - 5.0).abs() < EPS);
    }

    #[test]
    fn tightening_scales_below_threshold() {
        let mut config = cfg();
        config.tightening_threshold = Some(10.0);
        let mut pipeline = GyroPipeline::default();
        // threshold*dt = 10, input length 5 -> scaled by 5/10.
        let out = pipeline.process(&config, Vec2::new(5.0, 0.0), 5.0, 1.0);
        assert!((out.x - 2.5).abs() < EPS);
    }

    #[test]
    fn sens_interpolates_between_tiers() {
        let mut config = cfg();
        config.gyro_sens = Sensitivity::Single(1.0);
        config.fast_sens = Some(Sensitivity::Single(3.0));
        config.slow_threshold = 0.0;
        config.fast_threshold = 100.0;
        let (x, _) = interpolate_sens(&config, 50.0);
        assert!((x - 2.0).abs() < EPS);
    }

    #[test]
    fn sens_extrapolates_beyond_fast_threshold() {
        let mut config = cfg();
        config.gyro_sens = Sensitivity::Single(1.0);
        config.fast_sens = Some(Sensitivity::Single(2.0));
        config.slow_threshold = 0.0;
        config.fast_threshold = 100.0;
        // 200 deg/s is past the fast tier; the factor stays unclamped.
        let (x, _) = interpolate_sens(&config, 200.0);
        assert!((x - 3.0).abs() < EPS);
    }

    #[test]
    fn asymmetric_sens_pair() {
        let mut config = cfg();
        config.gyro_sens = Sensitivity::Pair([2.0, 4.0]);
        let mut pipeline = GyroPipeline::default();
        let out = pipeline.process(&config, Vec2::new(1.0, 1.0), 10.0, 0.001);
        assert!((out.x - 2.0).abs() < EPS);
        assert!((out.y - 4.0).abs() < EPS);
    }

    #[test]
    fn zero_divisors_yield_zero_calibration() {
        assert_eq!(mouse_calibration(16.0 / 3.0, 0.0, 1.0), 0.0);
        assert_eq!(mouse_calibration(16.0 / 3.0, 1.0, 0.0), 0.0);
        assert!((mouse_calibration(8.0, 2.0, 2.0) - 2.0).abs() < EPS);
    }
}
