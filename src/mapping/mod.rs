//! Mapping module - sources, targets and the resolution engine
//!
//! A mapping turns physical input sources (buttons, axes, sticks, the
//! synthetic gyro and touch sources) into output targets (virtual controller
//! controls, keyboard keys, mouse buttons, relative mouse motion, layer
//! toggles). Direct targets are terminal; composite targets (`AIM`, `DPAD`,
//! `GRID_STICKS`, `AND`, `LAYER`) synthesize sub-targets and are resolved
//! recursively by [`resolver`].

pub mod autoload;
pub mod config;
pub mod layers;
pub mod resolver;

#[cfg(test)]
mod tests;

pub use autoload::{select_autoload, AutoloadRule, CompiledAutoload, FocusContext};
pub use config::{ConfigError, LayerConfig, MappingConfig};
pub use layers::{Layer, Mapping};
pub use resolver::{resolve_source, ResolveCtx, ResolvedOutput, ResolverState};

use crate::math::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Physical buttons, named after their SDL gamepad positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadButton {
    N,
    S,
    E,
    W,
    Back,
    Guide,
    Start,
    L3,
    R3,
    L1,
    R1,
    Up,
    Down,
    Left,
    Right,
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    Rp1,
    Lp1,
    Rp2,
    Lp2,
    /// Touchpad click (the physical button, not the touch surface).
    Touchpad,
}

/// Physical analog axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadAxis {
    LStickX,
    LStickY,
    RStickX,
    RStickY,
    L2,
    R2,
}

impl PadAxis {
    /// The stick this axis belongs to, with its component slot (0 = x, 1 = y).
    pub fn stick_component(&self) -> Option<(PadStick, usize)> {
        match self {
            PadAxis::LStickX => Some((PadStick::LStick, 0)),
            PadAxis::LStickY => Some((PadStick::LStick, 1)),
            PadAxis::RStickX => Some((PadStick::RStick, 0)),
            PadAxis::RStickY => Some((PadStick::RStick, 1)),
            PadAxis::L2 | PadAxis::R2 => None,
        }
    }
}

/// Logical 2D stick sources (paired axes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadStick {
    LStick,
    RStick,
}

/// Anything a mapping entry can read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapSource {
    Button(PadButton),
    Axis(PadAxis),
    Stick(PadStick),
    /// Synthetic source fed by the gyro pipeline each sensor sample.
    Gyro,
    /// Synthetic source holding the set of active touchpad contacts.
    Touch,
}

impl FromStr for MapSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use MapSource::*;
        use PadButton::*;
        let source = match s.to_ascii_uppercase().as_str() {
            "N" => Button(N),
            "S" => Button(S),
            "E" => Button(E),
            "W" => Button(W),
            "BACK" => Button(Back),
            "GUIDE" => Button(Guide),
            "START" => Button(Start),
            "L3" => Button(L3),
            "R3" => Button(R3),
            "L1" => Button(L1),
            "R1" => Button(R1),
            "UP" => Button(Up),
            "DOWN" => Button(Down),
            "LEFT" => Button(Left),
            "RIGHT" => Button(Right),
            "M1" => Button(M1),
            "M2" => Button(M2),
            "M3" => Button(M3),
            "M4" => Button(M4),
            "M5" => Button(M5),
            "M6" => Button(M6),
            "RP1" => Button(Rp1),
            "LP1" => Button(Lp1),
            "RP2" => Button(Rp2),
            "LP2" => Button(Lp2),
            "TOUCHPAD" => Button(Touchpad),
            "LSTICK_X" => Axis(PadAxis::LStickX),
            "LSTICK_Y" => Axis(PadAxis::LStickY),
            "RSTICK_X" => Axis(PadAxis::RStickX),
            "RSTICK_Y" => Axis(PadAxis::RStickY),
            "L2" => Axis(PadAxis::L2),
            "R2" => Axis(PadAxis::R2),
            "LSTICK" => Stick(PadStick::LStick),
            "RSTICK" => Stick(PadStick::RStick),
            "GYRO" => Gyro,
            "TOUCH" => Touch,
            other => return Err(format!("unknown input source '{other}'")),
        };
        Ok(source)
    }
}

impl fmt::Display for MapSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use MapSource::*;
        use PadButton::*;
        let name = match self {
            Button(N) => "N",
            Button(S) => "S",
            Button(E) => "E",
            Button(W) => "W",
            Button(Back) => "BACK",
            Button(Guide) => "GUIDE",
            Button(Start) => "START",
            Button(L3) => "L3",
            Button(R3) => "R3",
            Button(L1) => "L1",
            Button(R1) => "R1",
            Button(Up) => "UP",
            Button(Down) => "DOWN",
            Button(Left) => "LEFT",
            Button(Right) => "RIGHT",
            Button(M1) => "M1",
            Button(M2) => "M2",
            Button(M3) => "M3",
            Button(M4) => "M4",
            Button(M5) => "M5",
            Button(M6) => "M6",
            Button(Rp1) => "RP1",
            Button(Lp1) => "LP1",
            Button(Rp2) => "RP2",
            Button(Lp2) => "LP2",
            Button(Touchpad) => "TOUCHPAD",
            Axis(PadAxis::LStickX) => "LSTICK_X",
            Axis(PadAxis::LStickY) => "LSTICK_Y",
            Axis(PadAxis::RStickX) => "RSTICK_X",
            Axis(PadAxis::RStickY) => "RSTICK_Y",
            Axis(PadAxis::L2) => "L2",
            Axis(PadAxis::R2) => "R2",
            Stick(PadStick::LStick) => "LSTICK",
            Stick(PadStick::RStick) => "RSTICK",
            Gyro => "GYRO",
            Touch => "TOUCH",
        };
        f.write_str(name)
    }
}

impl Serialize for MapSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MapSource {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Virtual controller buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualButton {
    A,
    B,
    X,
    Y,
    Up,
    Down,
    Left,
    Right,
    L1,
    R1,
    L3,
    R3,
    Start,
    Back,
    Guide,
}

/// Virtual controller single axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualAxis {
    L2,
    R2,
    LStickX,
    LStickY,
    RStickX,
    RStickY,
}

/// Virtual controller paired stick axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualStick {
    LStick,
    RStick,
}

impl VirtualStick {
    pub fn axes(&self) -> (VirtualAxis, VirtualAxis) {
        match self {
            VirtualStick::LStick => (VirtualAxis::LStickX, VirtualAxis::LStickY),
            VirtualStick::RStick => (VirtualAxis::RStickX, VirtualAxis::RStickY),
        }
    }
}

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Keyboard keys that may not appear as single-character names.
const NAMED_KEYS: &[&str] = &[
    "space", "enter", "esc", "tab", "backspace", "delete", "insert", "home", "end", "pageup",
    "pagedown", "up", "down", "left", "right", "shift", "shiftleft", "shiftright", "ctrl",
    "ctrlleft", "ctrlright", "alt", "altleft", "altright", "win", "winleft", "winright",
    "capslock", "numlock", "scrolllock", "printscreen", "pause", "f1", "f2", "f3", "f4", "f5",
    "f6", "f7", "f8", "f9", "f10", "f11", "f12",
];

/// A validated keyboard key name, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyName(String);

impl KeyName {
    pub fn parse(name: &str) -> Option<KeyName> {
        let lower = name.to_ascii_lowercase();
        let single_char = lower.len() == 1
            && lower
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c.is_ascii_punctuation());
        if single_char || NAMED_KEYS.contains(&lower.as_str()) {
            Some(KeyName(lower))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Terminal output actions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DirectTarget {
    Button(VirtualButton),
    Axis(VirtualAxis),
    Stick(VirtualStick),
    Key(KeyName),
    MouseButton(MouseButton),
    /// Relative mouse motion sink; values are per-tick velocity vectors.
    MouseMotion,
}

impl FromStr for DirectTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use DirectTarget::*;
        let target = match s.to_ascii_uppercase().as_str() {
            "X_A" => Button(VirtualButton::A),
            "X_B" => Button(VirtualButton::B),
            "X_X" => Button(VirtualButton::X),
            "X_Y" => Button(VirtualButton::Y),
            "X_UP" => Button(VirtualButton::Up),
            "X_DOWN" => Button(VirtualButton::Down),
            "X_LEFT" => Button(VirtualButton::Left),
            "X_RIGHT" => Button(VirtualButton::Right),
            "X_L1" => Button(VirtualButton::L1),
            "X_R1" => Button(VirtualButton::R1),
            "X_L3" => Button(VirtualButton::L3),
            "X_R3" => Button(VirtualButton::R3),
            "X_START" => Button(VirtualButton::Start),
            "X_BACK" => Button(VirtualButton::Back),
            "X_GUIDE" => Button(VirtualButton::Guide),
            "X_L2" => Axis(VirtualAxis::L2),
            "X_R2" => Axis(VirtualAxis::R2),
            "X_LSTICK_X" => Axis(VirtualAxis::LStickX),
            "X_LSTICK_Y" => Axis(VirtualAxis::LStickY),
            "X_RSTICK_X" => Axis(VirtualAxis::RStickX),
            "X_RSTICK_Y" => Axis(VirtualAxis::RStickY),
            "X_LSTICK" => Stick(VirtualStick::LStick),
            "X_RSTICK" => Stick(VirtualStick::RStick),
            "LMOUSE" => MouseButton(self::MouseButton::Left),
            "MMOUSE" => MouseButton(self::MouseButton::Middle),
            "RMOUSE" => MouseButton(self::MouseButton::Right),
            "MOUSE" => MouseMotion,
            other => match KeyName::parse(other) {
                Some(key) => Key(key),
                None => return Err(format!("unknown output target '{other}'")),
            },
        };
        Ok(target)
    }
}

impl fmt::Display for DirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DirectTarget::*;
        match self {
            Button(b) => f.write_str(match b {
                VirtualButton::A => "X_A",
                VirtualButton::B => "X_B",
                VirtualButton::X => "X_X",
                VirtualButton::Y => "X_Y",
                VirtualButton::Up => "X_UP",
                VirtualButton::Down => "X_DOWN",
                VirtualButton::Left => "X_LEFT",
                VirtualButton::Right => "X_RIGHT",
                VirtualButton::L1 => "X_L1",
                VirtualButton::R1 => "X_R1",
                VirtualButton::L3 => "X_L3",
                VirtualButton::R3 => "X_R3",
                VirtualButton::Start => "X_START",
                VirtualButton::Back => "X_BACK",
                VirtualButton::Guide => "X_GUIDE",
            }),
            Axis(a) => f.write_str(match a {
                VirtualAxis::L2 => "X_L2",
                VirtualAxis::R2 => "X_R2",
                VirtualAxis::LStickX => "X_LSTICK_X",
                VirtualAxis::LStickY => "X_LSTICK_Y",
                VirtualAxis::RStickX => "X_RSTICK_X",
                VirtualAxis::RStickY => "X_RSTICK_Y",
            }),
            Stick(s) => f.write_str(match s {
                VirtualStick::LStick => "X_LSTICK",
                VirtualStick::RStick => "X_RSTICK",
            }),
            Key(k) => write!(f, "{}", k.as_str().to_ascii_uppercase()),
            MouseButton(m) => f.write_str(match m {
                self::MouseButton::Left => "LMOUSE",
                self::MouseButton::Middle => "MMOUSE",
                self::MouseButton::Right => "RMOUSE",
            }),
            MouseMotion => f.write_str("MOUSE"),
        }
    }
}

impl Serialize for DirectTarget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DirectTarget {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A mapping entry's target: terminal, or a composite resolved recursively.
///
/// Composite targets are written in YAML with a `map_as` discriminator:
///
/// ```yaml
/// LSTICK:
///   map_as: DPAD
///   UP: w
///   LEFT: a
///   DOWN: s
///   RIGHT: d
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapTarget {
    Direct(DirectTarget),
    Composite(Box<CompositeTarget>),
}

/// Composite targets carrying nested sub-targets.
///
/// Behavioral state (aim acceleration, touch start points) is *not* stored
/// here; it lives in the pad-owned [`ResolverState`] keyed by target
/// identity, so configs stay immutable and shareable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "map_as")]
pub enum CompositeTarget {
    /// Stick-to-velocity response curve feeding a nested target.
    #[serde(rename = "AIM")]
    Aim {
        output: MapTarget,
        #[serde(default = "default_aim_sens")]
        sens: f32,
        #[serde(default = "default_power")]
        power: f32,
        #[serde(default)]
        deadzone_inner: f32,
        #[serde(default = "default_deadzone_outer")]
        deadzone_outer: f32,
        #[serde(default)]
        accel_rate: f32,
        #[serde(default = "default_accel_cap")]
        accel_cap: f32,
        #[serde(default)]
        invert_x: bool,
        #[serde(default)]
        invert_y: bool,
    },
    /// Stick-to-four-booleans with overlapping 50° windows per cardinal.
    #[serde(rename = "DPAD")]
    Dpad {
        #[serde(rename = "UP", default, skip_serializing_if = "Option::is_none")]
        up: Option<MapTarget>,
        #[serde(rename = "RIGHT", default, skip_serializing_if = "Option::is_none")]
        right: Option<MapTarget>,
        #[serde(rename = "DOWN", default, skip_serializing_if = "Option::is_none")]
        down: Option<MapTarget>,
        #[serde(rename = "LEFT", default, skip_serializing_if = "Option::is_none")]
        left: Option<MapTarget>,
    },
    /// Touchpad split into a grid of virtual sticks, one per cell.
    #[serde(rename = "GRID_STICKS")]
    GridSticks { grid: Vec<Vec<MapTarget>> },
    /// Gate: resolves nested targets only for truthy input, nothing otherwise.
    #[serde(rename = "AND")]
    And { targets: TargetSpec },
    /// Toggles a named layer on the owning mapping.
    #[serde(rename = "LAYER")]
    Layer { layer: String },
}

fn default_aim_sens() -> f32 {
    360.0
}

fn default_power() -> f32 {
    1.0
}

fn default_deadzone_outer() -> f32 {
    1.0
}

fn default_accel_cap() -> f32 {
    2.0
}

/// One target or an ordered fan-out list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSpec {
    One(MapTarget),
    Many(Vec<MapTarget>),
}

impl TargetSpec {
    pub fn iter(&self) -> impl Iterator<Item = &MapTarget> {
        match self {
            TargetSpec::One(target) => std::slice::from_ref(target).iter(),
            TargetSpec::Many(targets) => targets.iter(),
        }
    }
}

/// The latest value observed for a source.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Bool(bool),
    Float(f32),
    Vec2(Vec2),
    /// Active touchpad contacts by finger index.
    Touches(BTreeMap<u64, Vec2>),
}

impl InputValue {
    /// Boolean coercion: floats and vectors count as pressed above a small
    /// magnitude, touch sets when non-empty.
    pub fn as_bool(&self) -> bool {
        match self {
            InputValue::Bool(b) => *b,
            InputValue::Float(f) => f.abs() >= 0.01,
            InputValue::Vec2(v) => v.length() >= 0.01,
            InputValue::Touches(t) => !t.is_empty(),
        }
    }

    pub fn as_float(&self) -> f32 {
        match self {
            InputValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            InputValue::Float(f) => *f,
            InputValue::Vec2(v) => v.length(),
            InputValue::Touches(_) => 0.0,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            InputValue::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_touches(&self) -> Option<&BTreeMap<u64, Vec2>> {
        match self {
            InputValue::Touches(t) => Some(t),
            _ => None,
        }
    }
}
