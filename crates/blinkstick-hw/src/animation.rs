//! Color animations: morph, pulse and blink.
//!
//! Animations write a sequence of colors through an [`RgbWriter`] and sleep
//! on the tokio timer between writes. A failed write ends the animation.

use crate::color::Rgb;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

/// Sink for color writes.
pub trait RgbWriter: Send + Sync {
    /// Shows `color` on the device.
    fn write_rgb(&self, color: Rgb) -> Result<()>;

    /// The color most recently written.
    fn current(&self) -> Rgb;
}

/// Options for morph and pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FadeOptions {
    /// Total time of one fade in milliseconds.
    pub duration_ms: u64,
    /// Number of intermediate colors written.
    pub steps: u32,
}

impl Default for FadeOptions {
    fn default() -> Self {
        Self {
            duration_ms: 1000,
            steps: 50,
        }
    }
}

impl FadeOptions {
    /// Steps actually taken; zero steps behaves like one.
    pub fn effective_steps(&self) -> u32 {
        self.steps.max(1)
    }

    /// Time between two writes.
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.duration_ms / u64::from(self.effective_steps()))
    }
}

/// Options for blink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlinkOptions {
    /// Number of on/off cycles.
    pub repeats: u32,
    /// Time the LED stays on, and then off, in milliseconds.
    pub delay_ms: u64,
}

impl Default for BlinkOptions {
    fn default() -> Self {
        Self {
            repeats: 1,
            delay_ms: 500,
        }
    }
}

/// Shows `color` immediately.
pub async fn set<W: RgbWriter + ?Sized>(writer: &W, color: Rgb) -> Result<()> {
    writer.write_rgb(color)
}

/// Fades from the current color to `target` and stays there.
pub async fn morph<W: RgbWriter + ?Sized>(
    writer: &W,
    target: Rgb,
    options: FadeOptions,
) -> Result<()> {
    let start = writer.current();
    let steps = options.effective_steps();
    let delay = options.step_delay();

    for step in 1..=steps {
        let color = start.lerp(target, step, steps);
        trace!("morph step {}/{}: {}", step, steps, color);
        writer.write_rgb(color)?;
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

/// Fades to `target` and back to black.
pub async fn pulse<W: RgbWriter + ?Sized>(
    writer: &W,
    target: Rgb,
    options: FadeOptions,
) -> Result<()> {
    morph(writer, target, options).await?;
    morph(writer, Rgb::BLACK, options).await
}

/// Toggles between `target` and black `repeats` times.
pub async fn blink<W: RgbWriter + ?Sized>(
    writer: &W,
    target: Rgb,
    options: BlinkOptions,
) -> Result<()> {
    let delay = Duration::from_millis(options.delay_ms);

    for _ in 0..options.repeats {
        writer.write_rgb(target)?;
        tokio::time::sleep(delay).await;
        writer.write_rgb(Rgb::BLACK)?;
        tokio::time::sleep(delay).await;
    }
    Ok(())
}
