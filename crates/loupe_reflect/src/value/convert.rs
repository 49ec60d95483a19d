//! Scalar conversion rules between value kinds.
//!
//! These free functions are the single place where cross-kind coercion
//! semantics live; the [`FromValue`] implementations for the built-in scalar
//! types all funnel through here.
//!
//! [`FromValue`]: crate::value::FromValue

// -----------------------------------------------------------------------------
// String parsing

/// Parses a boolean from its textual forms.
///
/// Accepts `"true"`/`"false"` (case-insensitive) and `"1"`/`"0"`.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" => Some(true),
        "0" => Some(false),
        _ if text.eq_ignore_ascii_case("true") => Some(true),
        _ if text.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Parses a signed 64-bit integer from decimal text.
///
/// Falls back to parsing as a real and truncating, so `"2.0"` converts.
pub fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Some(n);
    }
    parse_real(text).map(|f| f as i64)
}

/// Parses a floating-point number from text.
pub fn parse_real(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

// -----------------------------------------------------------------------------
// Numeric coercion

/// Converts a boolean to its numeric form.
#[inline]
pub fn bool_to_integer(value: bool) -> i64 {
    i64::from(value)
}

/// Truncates a real towards zero.
#[inline]
pub fn real_to_integer(value: f64) -> i64 {
    value as i64
}

/// Interprets any non-zero integer as `true`.
#[inline]
pub fn integer_to_bool(value: i64) -> bool {
    value != 0
}

/// Interprets any non-zero real as `true`.
#[inline]
pub fn real_to_bool(value: f64) -> bool {
    value != 0.0
}
