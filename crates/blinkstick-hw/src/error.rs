//! Error types for the BlinkStick hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when interacting with the hardware.
#[derive(Error, Debug)]
pub enum Error {
    /// No BlinkStick matched the lookup.
    #[error("BlinkStick not found")]
    NotFound,

    /// USB HID communication error.
    #[error("USB HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    /// Color string is not a hex value or a known color name.
    #[error("Invalid color: {0:?}")]
    InvalidColor(String),

    /// The device handle was closed before the call.
    #[error("BlinkStick {0} is closed")]
    Closed(String),

    /// Animations need a tokio runtime to run on.
    #[error("No async runtime available to run the animation")]
    NoRuntime,

    /// A device lock was poisoned by a panicking animation.
    #[error("Device state poisoned")]
    Poisoned,
}
