//! gilrs-backed device provider.
//!
//! Runs a dedicated polling thread (gilrs is not async) translating gilrs
//! events into [`DeviceEvent`]s on an unbounded channel. The thread exits
//! when the runtime drops its receiver.

use super::{DeviceEvent, DeviceId, InputSample};
use crate::mapping::{PadAxis, PadButton};
use anyhow::{Context, Result};
use gilrs::{Axis, Button, EventType, Gilrs};
use std::collections::HashSet;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Virtual pads created by output backends; enumerating them would feed the
/// engine its own output. (vendor id, product id) pairs.
pub const VID_PID_IGNORE_LIST: &[(u16, u16)] = &[
    // ViGEm virtual Xbox 360 pad
    (0x045e, 0x028e),
    // ViGEm virtual DualShock 4
    (0x054c, 0x05c4),
];

/// List connected (non-ignored) gamepads as (id, name).
pub fn list_devices() -> Result<Vec<(DeviceId, String)>> {
    let gilrs = Gilrs::new()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to initialize gamepad backend")?;
    Ok(gilrs
        .gamepads()
        .filter(|(_, pad)| !is_ignored(pad.vendor_id(), pad.product_id()))
        .map(|(id, pad)| (usize::from(id) as DeviceId, pad.name().to_string()))
        .collect())
}

/// Spawn the polling thread. Already-connected pads are announced before the
/// first poll so the runtime sees them without a replug.
pub fn spawn(events: UnboundedSender<DeviceEvent>) -> Result<thread::JoinHandle<()>> {
    let mut gilrs = Gilrs::new()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to initialize gamepad backend")?;

    let handle = thread::Builder::new()
        .name("gilrs-poll".into())
        .spawn(move || {
            let mut ignored: HashSet<DeviceId> = HashSet::new();

            let connected: Vec<(DeviceId, String, Option<u16>, Option<u16>)> = gilrs
                .gamepads()
                .map(|(id, pad)| {
                    (
                        usize::from(id) as DeviceId,
                        pad.name().to_string(),
                        pad.vendor_id(),
                        pad.product_id(),
                    )
                })
                .collect();
            for (id, name, vid, pid) in connected {
                if is_ignored(vid, pid) {
                    debug!(id, %name, "skipping ignored (virtual) pad");
                    ignored.insert(id);
                    continue;
                }
                if events.send(DeviceEvent::Connected { id, name }).is_err() {
                    return;
                }
            }

            loop {
                while let Some(event) = gilrs.next_event() {
                    let id = usize::from(event.id) as DeviceId;
                    let translated = match event.event {
                        EventType::Connected => {
                            let pad = gilrs.gamepad(event.id);
                            if is_ignored(pad.vendor_id(), pad.product_id()) {
                                debug!(id, name = %pad.name(), "skipping ignored (virtual) pad");
                                ignored.insert(id);
                                continue;
                            }
                            ignored.remove(&id);
                            Some(DeviceEvent::Connected {
                                id,
                                name: pad.name().to_string(),
                            })
                        }
                        EventType::Disconnected => {
                            if ignored.remove(&id) {
                                continue;
                            }
                            Some(DeviceEvent::Disconnected { id })
                        }
                        _ if ignored.contains(&id) => None,
                        EventType::ButtonPressed(button, _) => {
                            translate_button(button).map(|id_| DeviceEvent::Sample {
                                id,
                                sample: InputSample::Button {
                                    id: id_,
                                    pressed: true,
                                },
                            })
                        }
                        EventType::ButtonReleased(button, _) => {
                            translate_button(button).map(|id_| DeviceEvent::Sample {
                                id,
                                sample: InputSample::Button {
                                    id: id_,
                                    pressed: false,
                                },
                            })
                        }
                        EventType::ButtonChanged(button, value, _) => {
                            translate_trigger(button).map(|axis| DeviceEvent::Sample {
                                id,
                                sample: InputSample::Axis { id: axis, value },
                            })
                        }
                        EventType::AxisChanged(axis, value, _) => {
                            translate_axis(axis).map(|axis| DeviceEvent::Sample {
                                id,
                                sample: InputSample::Axis { id: axis, value },
                            })
                        }
                        _ => None,
                    };
                    if let Some(event) = translated {
                        if events.send(event).is_err() {
                            info!("device event channel closed, stopping gamepad poll");
                            return;
                        }
                    }
                }
                thread::sleep(Duration::from_millis(1));
            }
        })
        .context("failed to spawn gamepad polling thread")?;

    Ok(handle)
}

fn is_ignored(vid: Option<u16>, pid: Option<u16>) -> bool {
    match (vid, pid) {
        (Some(vid), Some(pid)) => VID_PID_IGNORE_LIST.contains(&(vid, pid)),
        _ => false,
    }
}

fn translate_button(button: Button) -> Option<PadButton> {
    let id = match button {
        Button::South => PadButton::S,
        Button::East => PadButton::E,
        Button::North => PadButton::N,
        Button::West => PadButton::W,
        Button::LeftTrigger => PadButton::L1,
        Button::RightTrigger => PadButton::R1,
        Button::LeftThumb => PadButton::L3,
        Button::RightThumb => PadButton::R3,
        Button::Select => PadButton::Back,
        Button::Start => PadButton::Start,
        Button::Mode => PadButton::Guide,
        Button::DPadUp => PadButton::Up,
        Button::DPadDown => PadButton::Down,
        Button::DPadLeft => PadButton::Left,
        Button::DPadRight => PadButton::Right,
        // Triggers arrive as ButtonChanged and map to axes.
        Button::LeftTrigger2 | Button::RightTrigger2 => return None,
        other => {
            debug!(?other, "unmapped gamepad button");
            return None;
        }
    };
    Some(id)
}

fn translate_trigger(button: Button) -> Option<PadAxis> {
    match button {
        Button::LeftTrigger2 => Some(PadAxis::L2),
        Button::RightTrigger2 => Some(PadAxis::R2),
        _ => None,
    }
}

fn translate_axis(axis: Axis) -> Option<PadAxis> {
    match axis {
        Axis::LeftStickX => Some(PadAxis::LStickX),
        Axis::LeftStickY => Some(PadAxis::LStickY),
        Axis::RightStickX => Some(PadAxis::RStickX),
        Axis::RightStickY => Some(PadAxis::RStickY),
        Axis::LeftZ => Some(PadAxis::L2),
        Axis::RightZ => Some(PadAxis::R2),
        _ => None,
    }
}
