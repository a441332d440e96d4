//! Console sink - logs all output writes for testing and debugging
//!
//! Useful for validating mappings without an OS injection backend, and for
//! development without a virtual-pad driver installed.

use super::OutputSink;
use crate::mapping::{KeyName, MouseButton, VirtualAxis, VirtualButton, VirtualStick};
use crate::math::Vec2;
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct ConsoleSink {
    remainder: Vec2,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Split a fractional delta into whole pixels plus the carried remainder.
fn carry_pixels(delta: Vec2, remainder: Vec2) -> ((i32, i32), Vec2) {
    let total = delta + remainder;
    let pixels = (total.x.trunc() as i32, total.y.trunc() as i32);
    (pixels, Vec2::new(total.x.fract(), total.y.fract()))
}

#[async_trait]
impl OutputSink for ConsoleSink {
    async fn virtual_button(&mut self, button: VirtualButton, pressed: bool) -> Result<()> {
        info!(?button, pressed, "🎮 virtual button");
        Ok(())
    }

    async fn virtual_axis(&mut self, axis: VirtualAxis, value: f32) -> Result<()> {
        debug!(?axis, value, "virtual axis");
        Ok(())
    }

    async fn virtual_stick(&mut self, stick: VirtualStick, value: Vec2) -> Result<()> {
        debug!(?stick, x = value.x, y = value.y, "virtual stick");
        Ok(())
    }

    async fn key(&mut self, key: &KeyName, down: bool) -> Result<()> {
        info!(key = key.as_str(), down, "⌨️ key");
        Ok(())
    }

    async fn mouse_button(&mut self, button: MouseButton, down: bool) -> Result<()> {
        info!(?button, down, "🖱️ mouse button");
        Ok(())
    }

    async fn mouse_move(&mut self, delta: Vec2) -> Result<()> {
        let (pixels, remainder) = carry_pixels(delta, self.remainder);
        self.remainder = remainder;
        if pixels != (0, 0) {
            debug!(dx = pixels.0, dy = pixels.1, "mouse move");
        }
        Ok(())
    }

    async fn layer_changed(&mut self, mapping: &str, layer: &str, active: bool) -> Result<()> {
        info!(mapping, layer, active, "layer changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_motion_carries_between_calls() {
        let (pixels, remainder) = carry_pixels(Vec2::new(0.6, -0.6), Vec2::ZERO);
        assert_eq!(pixels, (0, 0));

        let (pixels, remainder) = carry_pixels(Vec2::new(0.6, -0.6), remainder);
        assert_eq!(pixels, (1, -1));
        assert!(remainder.x.abs() < 0.21);
        assert!(remainder.y.abs() < 0.21);
    }

    #[test]
    fn whole_pixels_pass_straight_through() {
        let (pixels, remainder) = carry_pixels(Vec2::new(3.0, -2.0), Vec2::ZERO);
        assert_eq!(pixels, (3, -2));
        assert_eq!(remainder, Vec2::ZERO);
    }
}
