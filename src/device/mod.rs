//! Device event interface
//!
//! Typed samples produced by gamepad backends. The runtime consumes a
//! single [`DeviceEvent`] stream; [`gilrs_provider`] is the bundled backend
//! for buttons and axes, and the enum is the seam for platform backends
//! (motion sensors, touchpads) the core does not own.

pub mod gilrs_provider;

use crate::mapping::{PadAxis, PadButton};
use crate::math::{Vec2, Vec3};

pub type DeviceId = u64;

/// Lifecycle of one touchpad contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Began,
    Moved,
    Ended,
}

/// One typed input sample from a physical device.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSample {
    Button {
        id: PadButton,
        pressed: bool,
    },
    /// Normalized axis value in [-1, 1] (triggers in [0, 1]).
    Axis {
        id: PadAxis,
        value: f32,
    },
    /// Angular velocity in deg/s with the sensor's own timestamp.
    Gyro {
        vec: Vec3,
        timestamp_us: u64,
    },
    /// Latest accelerometer reading in g.
    Accel {
        vec: Vec3,
    },
    Touch {
        finger: u64,
        /// Normalized pad position, (0,0) top-left to (1,1) bottom-right.
        pos: Vec2,
        phase: TouchPhase,
    },
}

/// Device lifecycle and sample stream, as seen by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Connected { id: DeviceId, name: String },
    Disconnected { id: DeviceId },
    Sample { id: DeviceId, sample: InputSample },
}
