//! BlinkStick communication via USB HID.

use super::{AnimationError, Completion, DeviceFinder, DeviceInfo, LedDevice};
use crate::animation::{self, BlinkOptions, FadeOptions, RgbWriter};
use crate::color::Rgb;
use crate::protocol::{build_color_report, color_report_buffer, parse_color_report};
use crate::{Error, Result, BLINKSTICK_PID, BLINKSTICK_VID};
use hidapi::HidApi;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Device state shared between the handle and its running animations.
struct Shared {
    device: Mutex<hidapi::HidDevice>,
    current: Mutex<Rgb>,
}

impl RgbWriter for Shared {
    fn write_rgb(&self, color: Rgb) -> Result<()> {
        let report = build_color_report(color);
        let device = self.device.lock().map_err(|_| Error::Poisoned)?;
        device.send_feature_report(&report)?;
        drop(device);

        *self.current.lock().map_err(|_| Error::Poisoned)? = color;
        Ok(())
    }

    fn current(&self) -> Rgb {
        self.current.lock().map(|c| *c).unwrap_or_default()
    }
}

/// Animation requested from the device.
#[derive(Debug, Clone, Copy)]
enum Job {
    Set,
    Pulse(FadeOptions),
    Morph(FadeOptions),
    Blink(BlinkOptions),
}

impl Job {
    async fn run(self, writer: &Shared, target: Rgb) -> Result<()> {
        match self {
            Job::Set => animation::set(writer, target).await,
            Job::Pulse(options) => animation::pulse(writer, target, options).await,
            Job::Morph(options) => animation::morph(writer, target, options).await,
            Job::Blink(options) => animation::blink(writer, target, options).await,
        }
    }
}

/// BlinkStick device controller.
pub struct HidBlinkStick {
    serial: String,
    shared: Option<Arc<Shared>>,
}

impl HidBlinkStick {
    /// Opens the device described by `info`.
    fn open(api: &HidApi, info: &hidapi::DeviceInfo) -> Result<Self> {
        let device = info.open_device(api)?;
        let serial = info.serial_number().unwrap_or_default().to_string();

        let mut report = color_report_buffer();
        let current = match device.get_feature_report(&mut report) {
            Ok(len) => parse_color_report(&report[..len]).unwrap_or_default(),
            Err(e) => {
                debug!("Could not read current color of {}: {}", serial, e);
                Rgb::BLACK
            }
        };

        info!(
            "BlinkStick opened (serial={}, path={:?}, color={})",
            serial,
            info.path(),
            current
        );

        Ok(Self {
            serial,
            shared: Some(Arc::new(Shared {
                device: Mutex::new(device),
                current: Mutex::new(current),
            })),
        })
    }

    /// Validates the request and spawns the animation.
    fn start(&mut self, color: &str, job: Job, done: Completion) -> Result<()> {
        let shared = self
            .shared
            .clone()
            .ok_or_else(|| Error::Closed(self.serial.clone()))?;
        let target = Rgb::parse(color)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        debug!("BlinkStick {}: {:?} {}", self.serial, job, target);

        runtime.spawn(async move {
            let task = tokio::spawn(async move { job.run(&shared, target).await });
            let result = match task.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(Error::Poisoned)) => {
                    Err(AnimationError::Reference("device state poisoned".to_string()))
                }
                Ok(Err(e)) => Err(AnimationError::Communication(e)),
                Err(e) => Err(AnimationError::Reference(e.to_string())),
            };
            done.complete(result);
        });

        Ok(())
    }
}

impl LedDevice for HidBlinkStick {
    fn serial(&self) -> &str {
        &self.serial
    }

    fn set_color(&mut self, color: &str, done: Completion) -> Result<()> {
        self.start(color, Job::Set, done)
    }

    fn pulse(&mut self, color: &str, options: FadeOptions, done: Completion) -> Result<()> {
        self.start(color, Job::Pulse(options), done)
    }

    fn morph(&mut self, color: &str, options: FadeOptions, done: Completion) -> Result<()> {
        self.start(color, Job::Morph(options), done)
    }

    fn blink(&mut self, color: &str, options: BlinkOptions, done: Completion) -> Result<()> {
        self.start(color, Job::Blink(options), done)
    }

    fn close(&mut self) {
        // Running animations hold their own reference and finish on their own
        if self.shared.take().is_some() {
            info!("BlinkStick {} closed", self.serial);
        }
    }
}

/// Finds BlinkSticks on the USB bus.
#[derive(Debug, Clone, Copy, Default)]
pub struct HidFinder;

impl HidFinder {
    /// Creates a finder.
    pub fn new() -> Self {
        Self
    }

    /// Enumerates the bus and opens the first BlinkStick accepted by `filter`.
    fn open_matching<F>(&self, filter: F) -> Option<Box<dyn LedDevice>>
    where
        F: Fn(&hidapi::DeviceInfo) -> bool,
    {
        let api = match HidApi::new() {
            Ok(api) => api,
            Err(e) => {
                warn!("Failed to initialize HID API: {}", e);
                return None;
            }
        };

        let info = api
            .device_list()
            .filter(|d| d.vendor_id() == BLINKSTICK_VID && d.product_id() == BLINKSTICK_PID)
            .find(|d| filter(d))?;

        match HidBlinkStick::open(&api, info) {
            Ok(device) => Some(Box::new(device)),
            Err(e) => {
                debug!("Failed to open BlinkStick at {:?}: {}", info.path(), e);
                None
            }
        }
    }
}

impl DeviceFinder for HidFinder {
    fn find_by_serial(&self, serial: &str) -> Option<Box<dyn LedDevice>> {
        self.open_matching(|d| d.serial_number() == Some(serial))
    }

    fn find_first(&self) -> Option<Box<dyn LedDevice>> {
        self.open_matching(|_| true)
    }

    fn find_all(&self) -> Vec<DeviceInfo> {
        let api = match HidApi::new() {
            Ok(api) => api,
            Err(e) => {
                warn!("Failed to initialize HID API: {}", e);
                return Vec::new();
            }
        };

        api.device_list()
            .filter(|d| d.vendor_id() == BLINKSTICK_VID && d.product_id() == BLINKSTICK_PID)
            .map(|d| DeviceInfo {
                serial: d.serial_number().unwrap_or_default().to_string(),
                manufacturer: d.manufacturer_string().map(str::to_string),
                product: d.product_string().map(str::to_string),
                path: d.path().to_string_lossy().into_owned(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hardware tests are skipped by default
    #[test]
    #[ignore]
    fn test_find_first() {
        assert!(HidFinder::new().find_first().is_some());
    }

    #[tokio::test]
    #[ignore]
    async fn test_set_color_completes() {
        let mut device = HidFinder::new().find_first().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        device
            .set_color("#00ff00", Completion::new(move |r| drop(tx.send(r.is_ok()))))
            .unwrap();
        assert!(rx.await.unwrap());
    }
}
