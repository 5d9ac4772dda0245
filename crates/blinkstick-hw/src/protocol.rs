//! BlinkStick HID protocol definitions and encoding.
//!
//! Protocol structure:
//! - Feature report 0x01: color of LED 0, `[0x01, r, g, b]`
//! - Reading report 0x01 returns the color currently shown

use crate::color::Rgb;

/// Report ID for single-LED color reads and writes.
pub const COLOR_REPORT_ID: u8 = 0x01;

/// Size of the color feature report, including the report ID.
pub const COLOR_REPORT_SIZE: usize = 4;

/// Builds the feature report that sets LED 0.
pub fn build_color_report(color: Rgb) -> [u8; COLOR_REPORT_SIZE] {
    [COLOR_REPORT_ID, color.r, color.g, color.b]
}

/// Returns an empty buffer for reading the color feature report.
pub fn color_report_buffer() -> [u8; COLOR_REPORT_SIZE] {
    [COLOR_REPORT_ID, 0, 0, 0]
}

/// Decodes a color feature report read back from the device.
///
/// Short reads yield `None`.
pub fn parse_color_report(report: &[u8]) -> Option<Rgb> {
    match report {
        [COLOR_REPORT_ID, r, g, b, ..] => Some(Rgb::new(*r, *g, *b)),
        _ => None,
    }
}
