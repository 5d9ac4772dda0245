//! Device handle resolution.

use blinkstick_hw::{DeviceFinder, LedDevice};
use tracing::debug;

use crate::error::{NodeError, Result};

/// Opens the device with `serial`, or the first device when no serial is set.
pub fn resolve(finder: &dyn DeviceFinder, serial: Option<&str>) -> Result<Box<dyn LedDevice>> {
    let device = match serial {
        Some(serial) => finder.find_by_serial(serial),
        None => finder.find_first(),
    };

    match device {
        Some(device) => {
            debug!("Resolved BlinkStick {}", device.serial());
            Ok(device)
        }
        None => Err(NodeError::DeviceNotFound {
            serial: serial.map(str::to_string),
        }),
    }
}
