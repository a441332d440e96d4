//! Camera-mode converters.
//!
//! Pure functions mapping (angular velocity in deg/s, normalized gravity
//! direction, elapsed seconds) to a 2D camera velocity `(yaw, pitch)` for
//! this tick. Formulas follow JibbSmart's player-space gyro write-ups.
//! Sensitivity is applied *after* conversion, in the pipeline, never here.

use super::GyroMode;
use crate::math::{clamp, sign, Vec2, Vec3};

/// Tilt window over which pitch fades out as the controller rolls onto its
/// side (WORLD and PLAYER_LEAN modes).
const SIDE_REDUCTION_THRESHOLD: f32 = 0.125;

/// PLAYER_TURN: how far world yaw may be relaxed toward local magnitude.
const YAW_RELAX_FACTOR: f32 = 1.41;

/// PLAYER_LEAN: relax factor for the roll reference axis.
const ROLL_RELAX_FACTOR: f32 = 1.15;

/// Dispatch on the configured mode. `yaw_turn_axis` only affects LOCAL.
pub fn convert(
    mode: GyroMode,
    yaw_turn_axis: bool,
    gyro: Vec3,
    grav_norm: Vec3,
    dt: f32,
) -> Vec2 {
    match mode {
        GyroMode::Off => Vec2::ZERO,
        GyroMode::Local => local(gyro, dt, yaw_turn_axis),
        GyroMode::LocalOw => local_ow(gyro, dt),
        GyroMode::World => world(gyro, grav_norm, dt),
        GyroMode::PlayerTurn => player_turn(gyro, grav_norm, dt),
        GyroMode::PlayerLean => player_lean(gyro, grav_norm, dt),
    }
}

/// Controller-local axes, no gravity dependency.
pub fn local(gyro: Vec3, dt: f32, yaw_turn_axis: bool) -> Vec2 {
    let yaw = if yaw_turn_axis { gyro.y } else { gyro.z };
    Vec2::new(yaw * dt, gyro.x * dt)
}

/// Local "on-wheel": yaw direction from the dominant of the yaw/roll axes,
/// magnitude from their combined length.
pub fn local_ow(gyro: Vec3, dt: f32) -> Vec2 {
    let yaw_axes = Vec2::new(gyro.y, gyro.z);
    let direction = if yaw_axes.x.abs() > yaw_axes.y.abs() {
        sign(yaw_axes.x)
    } else {
        sign(yaw_axes.y)
    };
    Vec2::new(yaw_axes.length() * direction * dt, gyro.x * dt)
}

/// World space: yaw about true down, pitch about the gravity-plane
/// projection of the local pitch axis.
pub fn world(gyro: Vec3, grav_norm: Vec3, dt: f32) -> Vec2 {
    let side_reduction = side_reduction(grav_norm);

    // Negative because gravity points down.
    let yaw = -gyro.dot(grav_norm) * dt;

    // Project the local pitch axis (1, 0, 0) onto the gravity plane.
    let grav_dot_pitch_axis = grav_norm.x;
    let mut pitch_axis = Vec3::new(1.0, 0.0, 0.0) - grav_norm * grav_dot_pitch_axis;

    // Zero when pitch and gravity are parallel; pitch is ignored then.
    let mut pitch = 0.0;
    if !pitch_axis.is_zero() {
        pitch_axis.normalize();
        pitch = gyro.dot(pitch_axis) * side_reduction * dt;
    }
    Vec2::new(yaw, pitch)
}

/// Player space "turn": world yaw for direction, local combined yaw for
/// magnitude, capped at full local magnitude.
pub fn player_turn(gyro: Vec3, grav_norm: Vec3, dt: f32) -> Vec2 {
    let world_yaw = gyro.y * grav_norm.y + gyro.z * grav_norm.z;
    let local_magnitude = Vec2::new(gyro.y, gyro.z).length();
    let yaw = -sign(world_yaw) * (world_yaw.abs() * YAW_RELAX_FACTOR).min(local_magnitude) * dt;
    Vec2::new(yaw, gyro.x * dt)
}

/// Player space "lean": like turn, but the yaw reference axis is the roll
/// vector (projected pitch axis × gravity), with its own side fade.
pub fn player_lean(gyro: Vec3, grav_norm: Vec3, dt: f32) -> Vec2 {
    let side_reduction = side_reduction(grav_norm);

    let grav_dot_pitch_axis = grav_norm.x;
    let pitch_axis = Vec3::new(1.0, 0.0, 0.0) - grav_norm * grav_dot_pitch_axis;

    let mut yaw = 0.0;
    if !pitch_axis.is_zero() {
        let mut roll_axis = pitch_axis.cross(grav_norm);
        if !roll_axis.is_zero() {
            roll_axis.normalize();
            let world_roll = gyro.y * roll_axis.y + gyro.z * roll_axis.z;
            let local_magnitude = Vec2::new(gyro.y, gyro.z).length();
            yaw = -sign(world_roll)
                * side_reduction
                * (world_roll.abs() * ROLL_RELAX_FACTOR).min(local_magnitude)
                * dt;
        }
    }
    Vec2::new(yaw, gyro.x * dt)
}

/// 1 when the controller is flat or upright, fading to 0 as it tilts onto
/// its side past the threshold window.
fn side_reduction(grav_norm: Vec3) -> f32 {
    let flatness = grav_norm.y.abs();
    let upness = grav_norm.z.abs();
    clamp(
        (flatness.max(upness) - SIDE_REDUCTION_THRESHOLD) / SIDE_REDUCTION_THRESHOLD,
        0.0,
        1.0,
    )
}
