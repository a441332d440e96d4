//! Output sink interface
//!
//! Direct-target writes leave the engine through [`OutputSink`]. The crate
//! ships only the logging [`console::ConsoleSink`]; OS injection backends
//! (virtual pad, keyboard, mouse) implement the same trait out of tree.

pub mod console;

use crate::mapping::{KeyName, MouseButton, VirtualAxis, VirtualButton, VirtualStick};
use crate::math::Vec2;
use anyhow::Result;
use async_trait::async_trait;

pub use console::ConsoleSink;

/// Where resolved outputs go. Errors are fatal for the owning pad only.
#[async_trait]
pub trait OutputSink: Send {
    async fn virtual_button(&mut self, button: VirtualButton, pressed: bool) -> Result<()>;
    async fn virtual_axis(&mut self, axis: VirtualAxis, value: f32) -> Result<()>;
    async fn virtual_stick(&mut self, stick: VirtualStick, value: Vec2) -> Result<()>;
    async fn key(&mut self, key: &KeyName, down: bool) -> Result<()>;
    async fn mouse_button(&mut self, button: MouseButton, down: bool) -> Result<()>;
    /// Relative mouse motion in (possibly fractional) pixels; the sink
    /// carries the sub-pixel remainder between calls.
    async fn mouse_move(&mut self, delta: Vec2) -> Result<()>;
    /// Opaque notification that a mapping layer flipped.
    async fn layer_changed(&mut self, mapping: &str, layer: &str, active: bool) -> Result<()>;
}
