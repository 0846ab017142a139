//! Field validation shared by request types
//!
//! Validation always runs before the first write of an operation.

use mixreview_common::{Error, Result};

/// Trim `value` and require 1..=`max` characters
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        return Err(Error::BadRequest(format!("{} must not be empty", field)));
    }
    if len > max {
        return Err(Error::BadRequest(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(trimmed.to_string())
}

/// Require a `#RRGGBB` color
pub fn hex_color(field: &str, value: &str) -> Result<()> {
    let bytes = value.as_bytes();
    let valid = bytes.len() == 7 && bytes[0] == b'#' && bytes[1..].iter().all(u8::is_ascii_hexdigit);
    if valid {
        Ok(())
    } else {
        Err(Error::BadRequest(format!(
            "{} must be a color in #RRGGBB form, got {:?}",
            field, value
        )))
    }
}

/// Require a finite, non-negative timecode in seconds
pub fn timecode(value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::BadRequest("timecode must be a number >= 0".to_string()))
    }
}
