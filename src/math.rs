//! Small vector/quaternion math used by the motion engine.
//!
//! Everything is `f32` and `Copy`; `Vec3` additionally supports in-place
//! mutation so per-sample sensor accumulation does not allocate.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// Clamp `value` into `[min, max]`.
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Linear interpolation with the factor clamped to [0, 1].
pub fn lerp(start: f32, end: f32, factor: f32) -> f32 {
    let t = clamp(factor, 0.0, 1.0);
    start * (1.0 - t) + end * t
}

/// Sign convention used by the camera-mode math: zero maps to +1.
pub fn sign(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// 2D vector (stick positions, camera velocities, touch points).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Angle in degrees in [0, 360), with 0° pointing up at (0, 1) and
    /// growing toward the left: (-1, 0) is 90°, (0, -1) is 180°, (1, 0)
    /// is 270°. This is the reference frame the D-pad windows are defined in.
    pub fn angle(&self) -> f32 {
        (-self.x).atan2(self.y).to_degrees().rem_euclid(360.0)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// 3D vector (angular velocity, acceleration, gravity estimates).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn set(&mut self, x: f32, y: f32, z: f32) {
        self.x = x;
        self.y = y;
        self.z = z;
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn dot(&self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - other.y * self.z,
            self.z * other.x - other.z * self.x,
            self.x * other.y - other.x * self.y,
        )
    }

    /// Normalize in place. A zero-length vector is left unchanged; callers
    /// relying on direction must check `is_zero` first.
    pub fn normalize(&mut self) -> &mut Self {
        let len = self.length();
        if len != 0.0 {
            self.x /= len;
            self.y /= len;
            self.z /= len;
        }
        self
    }

    pub fn normalized(&self) -> Vec3 {
        let mut out = *self;
        out.normalize();
        out
    }

    pub fn lerp(start: Vec3, end: Vec3, factor: f32) -> Vec3 {
        let t = clamp(factor, 0.0, 1.0);
        start * (1.0 - t) + end * t
    }

    /// Rotate by a unit quaternion: `q * (0, v) * q⁻¹`.
    pub fn rotate(&mut self, q: Quat) {
        let p = Quat {
            w: 0.0,
            x: self.x,
            y: self.y,
            z: self.z,
        };
        let rotated = q * p * q.inverse();
        self.set(rotated.x, rotated.y, rotated.z);
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f32> for Vec3 {
    type Output = Vec3;
    fn div(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

/// Rotation quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Conjugate; equals the inverse for unit quaternions.
    pub fn inverse(&self) -> Quat {
        Quat {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Build a rotation of `angle_rad` radians about `axis`. A zero axis
    /// yields the identity rotation.
    pub fn angle_axis(angle_rad: f32, axis: Vec3) -> Quat {
        if axis.is_zero() {
            return Quat::IDENTITY;
        }
        let half = angle_rad * 0.5;
        let unit = axis.normalized() * half.sin();
        Quat {
            w: half.cos(),
            x: unit.x,
            y: unit.y,
            z: unit.z,
        }
    }
}

impl Mul for Quat {
    type Output = Quat;
    fn mul(self, rhs: Quat) -> Quat {
        Quat {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn normalize_zero_vector_is_identity() {
        let mut v = Vec3::ZERO;
        v.normalize();
        assert_eq!(v, Vec3::ZERO);
    }

    #[test]
    fn angle_reference_frame() {
        assert!((Vec2::new(0.0, 1.0).angle() - 0.0).abs() < EPS);
        assert!((Vec2::new(-1.0, 0.0).angle() - 90.0).abs() < EPS);
        assert!((Vec2::new(0.0, -1.0).angle() - 180.0).abs() < EPS);
        assert!((Vec2::new(1.0, 0.0).angle() - 270.0).abs() < EPS);
    }

    #[test]
    fn quarter_turn_about_y_moves_x_to_negative_z() {
        let q = Quat::angle_axis(std::f32::consts::FRAC_PI_2, Vec3::new(0.0, 1.0, 0.0));
        let mut v = Vec3::new(1.0, 0.0, 0.0);
        v.rotate(q);
        assert!((v.x - 0.0).abs() < EPS);
        assert!((v.z - -1.0).abs() < EPS);
    }

    #[test]
    fn zero_angle_rotation_is_identity() {
        let q = Quat::angle_axis(0.0, Vec3::new(0.0, 1.0, 0.0));
        let mut v = Vec3::new(0.3, -0.2, 0.9);
        let before = v;
        v.rotate(q);
        assert!((v.x - before.x).abs() < EPS);
        assert!((v.y - before.y).abs() < EPS);
        assert!((v.z - before.z).abs() < EPS);
    }

    #[test]
    fn lerp_is_clamped() {
        assert_eq!(lerp(0.0, 10.0, 2.0), 10.0);
        assert_eq!(lerp(0.0, 10.0, -1.0), 0.0);
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
    }

    proptest! {
        #[test]
        fn normalized_nonzero_vector_has_unit_length(
            x in -1000.0f32..1000.0,
            y in -1000.0f32..1000.0,
            z in -1000.0f32..1000.0,
        ) {
            let v = Vec3::new(x, y, z);
            prop_assume!(v.length() > 1e-3);
            prop_assert!((v.normalized().length() - 1.0).abs() < 1e-4);
        }
    }
}
