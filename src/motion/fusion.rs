//! Gyro calibration and gravity estimation by sensor fusion.
//!
//! Gravity is stationary in world space while the device rotates under it,
//! so the previous estimate is rotated by the *reverse* of the measured
//! angular velocity, then nudged toward the accelerometer's down-vector to
//! correct integration drift.

use crate::math::{Quat, Vec3};

/// Fraction of the accelerometer correction applied per sample.
pub const GRAVITY_NUDGE: f32 = 0.02;

/// Running mean of angular velocity while the device is held still.
///
/// Reset when calibration mode starts, fed one sample per gyro event while
/// calibrating, and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct GyroCalibration {
    sum: Vec3,
    count: u32,
}

impl GyroCalibration {
    pub fn reset(&mut self) {
        self.sum = Vec3::ZERO;
        self.count = 0;
    }

    pub fn record(&mut self, sample: Vec3) {
        self.sum += sample;
        self.count += 1;
    }

    /// Mean drift, zero when nothing has been recorded.
    pub fn offset(&self) -> Vec3 {
        if self.count == 0 {
            Vec3::ZERO
        } else {
            self.sum / self.count as f32
        }
    }

    /// Remove the calibration drift from a live sample.
    pub fn apply(&self, sample: Vec3) -> Vec3 {
        sample - self.offset()
    }

    pub fn sample_count(&self) -> u32 {
        self.count
    }
}

/// Per-device running estimate of the true-down direction in device-local
/// space. Survives tick resets; it is the integral of all prior rotations.
#[derive(Debug, Clone, Default)]
pub struct GravityEstimator {
    gravity: Vec3,
}

impl GravityEstimator {
    /// Fuse one gyro sample (deg/s) with the latest acceleration reading.
    ///
    /// `dt` of zero (first sample) degenerates to the accelerometer nudge
    /// alone. The estimate is deliberately not renormalized here; callers
    /// use [`GravityEstimator::normalized`] for directional reads.
    pub fn update(&mut self, gyro_dps: Vec3, accel: Vec3, dt: f32) {
        let angle = (gyro_dps.length() * dt).to_radians();
        let rotation = Quat::angle_axis(angle, -gyro_dps);
        self.gravity.rotate(rotation);

        let measured_down = -accel;
        self.gravity += (measured_down - self.gravity) * GRAVITY_NUDGE;
    }

    pub fn raw(&self) -> Vec3 {
        self.gravity
    }

    pub fn normalized(&self) -> Vec3 {
        self.gravity.normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibration_reset_yields_zero_offset() {
        let mut cal = GyroCalibration::default();
        cal.record(Vec3::new(1.0, 2.0, 3.0));
        cal.reset();
        assert_eq!(cal.offset(), Vec3::ZERO);
    }

    #[test]
    fn calibration_offset_is_running_mean() {
        let mut cal = GyroCalibration::default();
        cal.record(Vec3::new(2.0, 0.0, -4.0));
        cal.record(Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(cal.offset(), Vec3::new(3.0, 0.0, -2.0));
        assert_eq!(cal.apply(Vec3::new(3.0, 0.0, -2.0)), Vec3::ZERO);
    }

    #[test]
    fn gravity_converges_monotonically_toward_accel_down() {
        let mut estimator = GravityEstimator::default();
        let down = Vec3::new(0.0, -1.0, 0.0);
        let mut last_error = (estimator.raw() - down).length();
        for _ in 0..200 {
            estimator.update(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0), 0.001);
            let error = (estimator.raw() - down).length();
            assert!(error <= last_error);
            last_error = error;
        }
        assert!(last_error < 0.1);
    }

    #[test]
    fn zero_dt_applies_nudge_only() {
        let mut estimator = GravityEstimator::default();
        estimator.update(Vec3::new(90.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 0.0);
        let expected = Vec3::new(0.0, -GRAVITY_NUDGE, 0.0);
        assert!((estimator.raw() - expected).length() < 1e-6);
    }
}
