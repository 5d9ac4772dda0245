//! Single-slot pending color.

use crate::encoder::Color;

/// Holds at most one color waiting for the running animation to end.
///
/// Setting a color replaces whatever was waiting; there is no backlog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingColor {
    slot: Option<Color>,
}

impl PendingColor {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `color`, replacing any waiting color.
    pub fn set(&mut self, color: Color) {
        self.slot = Some(color);
    }

    /// Removes and returns the waiting color.
    pub fn take_and_clear(&mut self) -> Option<Color> {
        self.slot.take()
    }

    /// Drops the waiting color.
    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// The waiting color, if any.
    pub fn peek(&self) -> Option<&Color> {
        self.slot.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
