//! Mock USB bus for testing code that drives BlinkSticks.
//!
//! The bus records every operation issued to its devices and holds the
//! completions of started animations until the test fires them.
//!
//! # Example
//!
//! ```
//! use blinkstick_hw::mock::{MockBus, Operation};
//! use blinkstick_hw::{Completion, DeviceFinder, LedDevice};
//!
//! let bus = MockBus::with_devices(&["BS000001-3.0"]);
//! let mut device = bus.finder().find_first().unwrap();
//! device.set_color("#ff0000", Completion::new(|_| {})).unwrap();
//!
//! assert_eq!(
//!     bus.operations(),
//!     vec![Operation::SetColor { color: "#ff0000".into() }]
//! );
//! assert!(bus.complete_next(Ok(())));
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use crate::animation::{BlinkOptions, FadeOptions};
use crate::color::Rgb;
use crate::device::{AnimationResult, Completion, DeviceFinder, DeviceInfo, LedDevice};
use crate::{Error, Result};

/// Recorded operation for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    SetColor {
        color: String,
    },
    Pulse {
        color: String,
        options: FadeOptions,
    },
    Morph {
        color: String,
        options: FadeOptions,
    },
    Blink {
        color: String,
        options: BlinkOptions,
    },
    Close,
}

#[derive(Default)]
struct BusState {
    plugged: Vec<String>,
    operations: Vec<(String, Operation)>,
    completions: VecDeque<Completion>,
    lookups: usize,
}

/// Simulated USB bus shared by a finder and the devices it opens.
#[derive(Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<BusState>>,
}

impl MockBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus with the given devices plugged in.
    pub fn with_devices(serials: &[&str]) -> Self {
        let bus = Self::new();
        for serial in serials {
            bus.plug(serial);
        }
        bus
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        // A panicking test thread must not hide the recorded state
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Plugs a device in.
    pub fn plug(&self, serial: &str) {
        self.lock().plugged.push(serial.to_string());
    }

    /// Unplugs a device; open handles to it start failing.
    pub fn unplug(&self, serial: &str) {
        self.lock().plugged.retain(|s| s != serial);
    }

    /// Returns a finder over this bus.
    pub fn finder(&self) -> MockFinder {
        MockFinder { bus: self.clone() }
    }

    /// All operations issued so far, across devices.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock()
            .operations
            .iter()
            .map(|(_, op)| op.clone())
            .collect()
    }

    /// Operations issued to one device.
    pub fn operations_for(&self, serial: &str) -> Vec<Operation> {
        self.lock()
            .operations
            .iter()
            .filter(|(s, _)| s == serial)
            .map(|(_, op)| op.clone())
            .collect()
    }

    /// Number of `find_*` lookups performed.
    pub fn lookups(&self) -> usize {
        self.lock().lookups
    }

    /// Number of animations started whose completion has not fired.
    pub fn in_flight(&self) -> usize {
        self.lock().completions.len()
    }

    /// Fires the oldest outstanding completion. Returns false if none.
    pub fn complete_next(&self, result: AnimationResult) -> bool {
        let completion = self.lock().completions.pop_front();
        match completion {
            Some(done) => {
                done.complete(result);
                true
            }
            None => false,
        }
    }

    fn is_plugged(&self, serial: &str) -> bool {
        self.lock().plugged.iter().any(|s| s == serial)
    }

    fn open(&self, serial: &str) -> Box<dyn LedDevice> {
        Box::new(MockDevice {
            serial: serial.to_string(),
            bus: self.clone(),
            closed: false,
        })
    }
}

/// Finder over a [`MockBus`].
#[derive(Clone)]
pub struct MockFinder {
    bus: MockBus,
}

impl DeviceFinder for MockFinder {
    fn find_by_serial(&self, serial: &str) -> Option<Box<dyn LedDevice>> {
        self.bus.lock().lookups += 1;
        self.bus
            .is_plugged(serial)
            .then(|| self.bus.open(serial))
    }

    fn find_first(&self) -> Option<Box<dyn LedDevice>> {
        let first = {
            let mut state = self.bus.lock();
            state.lookups += 1;
            state.plugged.first().cloned()
        };
        first.map(|serial| self.bus.open(&serial))
    }

    fn find_all(&self) -> Vec<DeviceInfo> {
        self.bus
            .lock()
            .plugged
            .iter()
            .map(|serial| DeviceInfo {
                serial: serial.clone(),
                manufacturer: Some("Agile Innovative Ltd".to_string()),
                product: Some("BlinkStick".to_string()),
                path: format!("mock:{serial}"),
            })
            .collect()
    }
}

/// Handle to a device on a [`MockBus`].
pub struct MockDevice {
    serial: String,
    bus: MockBus,
    closed: bool,
}

impl MockDevice {
    fn start(&mut self, color: &str, op: Operation, done: Completion) -> Result<()> {
        if self.closed {
            return Err(Error::Closed(self.serial.clone()));
        }
        if !self.bus.is_plugged(&self.serial) {
            return Err(Error::NotFound);
        }
        Rgb::parse(color)?;

        trace!("mock {}: {:?}", self.serial, op);
        let mut state = self.bus.lock();
        state.operations.push((self.serial.clone(), op));
        state.completions.push_back(done);
        Ok(())
    }
}

impl LedDevice for MockDevice {
    fn serial(&self) -> &str {
        &self.serial
    }

    fn set_color(&mut self, color: &str, done: Completion) -> Result<()> {
        let op = Operation::SetColor {
            color: color.to_string(),
        };
        self.start(color, op, done)
    }

    fn pulse(&mut self, color: &str, options: FadeOptions, done: Completion) -> Result<()> {
        let op = Operation::Pulse {
            color: color.to_string(),
            options,
        };
        self.start(color, op, done)
    }

    fn morph(&mut self, color: &str, options: FadeOptions, done: Completion) -> Result<()> {
        let op = Operation::Morph {
            color: color.to_string(),
            options,
        };
        self.start(color, op, done)
    }

    fn blink(&mut self, color: &str, options: BlinkOptions, done: Completion) -> Result<()> {
        let op = Operation::Blink {
            color: color.to_string(),
            options,
        };
        self.start(color, op, done)
    }

    fn close(&mut self) {
        self.closed = true;
        self.bus
            .lock()
            .operations
            .push((self.serial.clone(), Operation::Close));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Completion {
        Completion::new(|_| {})
    }

    #[test]
    fn test_find_by_serial() {
        let bus = MockBus::with_devices(&["A", "B"]);
        let finder = bus.finder();
        assert_eq!(finder.find_by_serial("B").unwrap().serial(), "B");
        assert!(finder.find_by_serial("C").is_none());
        assert_eq!(finder.find_first().unwrap().serial(), "A");
        assert_eq!(bus.lookups(), 3);
    }

    #[test]
    fn test_unplugged_device_rejects_calls() {
        let bus = MockBus::with_devices(&["A"]);
        let mut device = bus.finder().find_first().unwrap();
        bus.unplug("A");
        assert!(device.set_color("red", noop()).is_err());
        assert!(bus.operations().is_empty());
        assert_eq!(bus.in_flight(), 0);
    }

    #[test]
    fn test_invalid_color_rejected() {
        let bus = MockBus::with_devices(&["A"]);
        let mut device = bus.finder().find_first().unwrap();
        assert!(matches!(
            device.set_color("nocolor", noop()),
            Err(Error::InvalidColor(_))
        ));
    }

    #[test]
    fn test_closed_device_rejects_calls() {
        let bus = MockBus::with_devices(&["A"]);
        let mut device = bus.finder().find_first().unwrap();
        device.close();
        assert!(device.blink("red", BlinkOptions::default(), noop()).is_err());
        assert_eq!(bus.operations_for("A"), vec![Operation::Close]);
    }

    #[test]
    fn test_complete_next_in_order() {
        let bus = MockBus::with_devices(&["A"]);
        let mut device = bus.finder().find_first().unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        for n in 0..2 {
            let tx = tx.clone();
            device
                .set_color("red", Completion::new(move |_| tx.send(n).unwrap()))
                .unwrap();
        }
        assert!(bus.complete_next(Ok(())));
        assert!(bus.complete_next(Ok(())));
        assert!(!bus.complete_next(Ok(())));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1]);
    }
}
