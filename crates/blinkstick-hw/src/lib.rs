//! BlinkStick Hardware Library
//!
//! Provides discovery, color parsing and animations for BlinkStick USB LED
//! devices, plus the device traits the flow node drives.

pub mod animation;
pub mod color;
pub mod device;
pub mod error;
pub mod mock;
pub mod protocol;

pub use animation::{BlinkOptions, FadeOptions};
pub use color::Rgb;
pub use device::{
    AnimationError, AnimationResult, Completion, DeviceFinder, DeviceInfo, HidBlinkStick,
    HidFinder, LedDevice,
};
pub use error::{Error, Result};

/// USB VID:PID for BlinkStick devices
pub const BLINKSTICK_VID: u16 = 0x20A0;
pub const BLINKSTICK_PID: u16 = 0x41E5;
