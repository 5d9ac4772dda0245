//! Device traits and the hidapi-backed BlinkStick implementation.
//!
//! Animation calls are fire-and-forget: they either fail synchronously, or
//! return at once and report the outcome later through a [`Completion`].

mod hid;

pub use hid::{HidBlinkStick, HidFinder};

use crate::animation::{BlinkOptions, FadeOptions};
use crate::Result;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Outcome of an animation, delivered through its [`Completion`].
pub type AnimationResult = std::result::Result<(), AnimationError>;

/// Failure reported once an animation has started.
#[derive(Error, Debug)]
pub enum AnimationError {
    /// Internal fault in the animation task, the device itself is fine.
    #[error("internal animation error: {0}")]
    Reference(String),

    /// Talking to the device failed, usually because it was unplugged.
    #[error("device communication failed: {0}")]
    Communication(#[source] crate::Error),
}

impl AnimationError {
    /// True for internal faults that leave the device handle usable.
    pub fn is_reference(&self) -> bool {
        matches!(self, AnimationError::Reference(_))
    }
}

/// One-shot notification fired when an animation ends.
pub struct Completion(Box<dyn FnOnce(AnimationResult) + Send + 'static>);

impl Completion {
    /// Wraps a callback.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(AnimationResult) + Send + 'static,
    {
        Self(Box::new(f))
    }

    /// Fires the notification, consuming it.
    pub fn complete(self, result: AnimationResult) {
        (self.0)(result)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Completion")
    }
}

/// A connected device as seen during enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub serial: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub path: String,
}

/// An open LED device.
pub trait LedDevice: Send {
    /// USB serial number of the device.
    fn serial(&self) -> &str;

    /// Shows `color` immediately.
    fn set_color(&mut self, color: &str, done: Completion) -> Result<()>;

    /// Fades to `color` and back to black.
    fn pulse(&mut self, color: &str, options: FadeOptions, done: Completion) -> Result<()>;

    /// Fades to `color` and holds it.
    fn morph(&mut self, color: &str, options: FadeOptions, done: Completion) -> Result<()>;

    /// Toggles `color` on and off.
    fn blink(&mut self, color: &str, options: BlinkOptions, done: Completion) -> Result<()>;

    /// Releases the handle. Animations already running are not cancelled.
    fn close(&mut self);
}

/// Locates devices on the bus.
pub trait DeviceFinder: Send {
    /// Opens the device with the given serial number.
    fn find_by_serial(&self, serial: &str) -> Option<Box<dyn LedDevice>>;

    /// Opens the first device found.
    fn find_first(&self) -> Option<Box<dyn LedDevice>>;

    /// Lists connected devices without opening them.
    fn find_all(&self) -> Vec<DeviceInfo>;
}
