//! Payload to color encoding.
//!
//! Two payload shapes are understood:
//! - a decimal triple `r,g,b`, turned into `#rrggbb` with each value masked
//!   to a byte (`300` becomes `0x2c`, `-1` becomes `0xff`);
//! - anything else, passed on as a color literal after lowercasing it and
//!   removing all whitespace. Literals are not checked here; the device
//!   library rejects the ones it does not know.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{NodeError, Result};

/// Searched anywhere in the payload, not anchored.
static DECIMAL_TRIPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+,[0-9]+,[0-9]+").expect("valid pattern"));

/// Normalized color string handed to the device library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// The color as passed to the device.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encodes a message payload into a color.
pub fn encode(payload: &Value) -> Result<Color> {
    let text = match payload {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => return Err(NodeError::InvalidPayload("payload is missing".into())),
        other => {
            return Err(NodeError::InvalidPayload(format!(
                "expected a color string, got {}",
                other
            )))
        }
    };
    encode_str(&text)
}

/// Encodes a payload string into a color.
pub fn encode_str(payload: &str) -> Result<Color> {
    if DECIMAL_TRIPLE.is_match(payload) {
        let mut fields = payload.split(',');
        let mut channel = || fields.next().map(parse_int_byte).unwrap_or(0);
        let (r, g, b) = (channel(), channel(), channel());
        return Ok(Color(format!("#{:02x}{:02x}{:02x}", r, g, b)));
    }

    let literal: String = payload
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if literal.is_empty() {
        return Err(NodeError::InvalidPayload(format!(
            "{:?} is not a color",
            payload
        )));
    }
    Ok(Color(literal))
}

/// Parses the leading integer of `field` and returns its low byte.
///
/// Leading whitespace and one sign are accepted, a `0x` prefix switches to
/// hexadecimal, parsing stops at the first non-digit, and a field without
/// digits reads as zero. The byte is exact for any length of digits since
/// only the value modulo 256 is kept.
fn parse_int_byte(field: &str) -> u8 {
    let field = field.trim_start();
    let (negative, digits) = match field.as_bytes().first() {
        Some(b'-') => (true, &field[1..]),
        Some(b'+') => (false, &field[1..]),
        _ => (false, field),
    };
    let (radix, digits) = match digits.get(..2) {
        Some("0x" | "0X") => (16, &digits[2..]),
        _ => (10, digits),
    };

    let magnitude = digits
        .chars()
        .map_while(|c| c.to_digit(radix))
        .fold(0u8, |acc, d| {
            acc.wrapping_mul(radix as u8).wrapping_add(d as u8)
        });

    if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enc(s: &str) -> String {
        encode_str(s).unwrap().to_string()
    }

    #[test]
    fn test_decimal_triple() {
        assert_eq!(enc("255,0,0"), "#ff0000");
        assert_eq!(enc("0,128,255"), "#0080ff");
        assert_eq!(enc("1,2,3"), "#010203");
    }

    #[test]
    fn test_decimal_triple_masks_to_byte() {
        assert_eq!(enc("300,10,5"), "#2c0a05");
        assert_eq!(enc("256,512,257"), "#000001");
        assert_eq!(enc("-1,2,3"), "#ff0203");
        assert_eq!(enc("99999999999999999999,0,0"), "#ff0000");
    }

    #[test]
    fn test_decimal_triple_fields_accept_hex_prefix() {
        assert_eq!(enc("0x10,20,30"), "#10141e");
        assert_eq!(enc("10,20,0x1ff"), "#0a14ff");
    }

    #[test]
    fn test_decimal_triple_matches_anywhere() {
        assert_eq!(enc("x 10,20,30"), "#00141e");
        assert_eq!(enc("10,20,30,40"), "#0a141e");
        assert_eq!(enc("rgb(255,0,0)"), "#000000");
    }

    #[test]
    fn test_literal_is_lowercased_without_whitespace() {
        assert_eq!(enc(" Re D "), "red");
        assert_eq!(enc("#FF00aa"), "#ff00aa");
        assert_eq!(enc("Light\tBlue\n"), "lightblue");
        assert_eq!(enc("1,2"), "1,2");
        assert_eq!(enc(" 10, 20,30"), "10,20,30");
    }

    #[test]
    fn test_literal_not_validated() {
        assert_eq!(enc("not a color"), "notacolor");
    }

    #[test]
    fn test_empty_literal_rejected() {
        assert!(encode_str("").is_err());
        assert!(encode_str("  \n").is_err());
    }

    #[test]
    fn test_payload_coercion() {
        assert_eq!(encode(&json!("blue")).unwrap().as_str(), "blue");
        assert_eq!(encode(&json!(true)).unwrap().as_str(), "true");
        assert_eq!(encode(&json!(12)).unwrap().as_str(), "12");
        assert!(encode(&json!(null)).is_err());
        assert!(encode(&json!({"r": 1})).is_err());
        assert!(encode(&json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_parse_int_byte() {
        assert_eq!(parse_int_byte("44"), 44);
        assert_eq!(parse_int_byte("  7abc"), 7);
        assert_eq!(parse_int_byte("abc"), 0);
        assert_eq!(parse_int_byte("-256"), 0);
        assert_eq!(parse_int_byte("+300"), 44);
        assert_eq!(parse_int_byte(""), 0);
        assert_eq!(parse_int_byte("0x10"), 16);
        assert_eq!(parse_int_byte("0XfF"), 255);
        assert_eq!(parse_int_byte("-0x01"), 255);
        assert_eq!(parse_int_byte("0x"), 0);
        assert_eq!(parse_int_byte("0xzz"), 0);
    }
}
