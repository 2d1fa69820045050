//! Coordinate Codec
//!
//! Conversions between decimal-degree text, fixed-point degrees and the
//! big-endian byte fields carried in the advertising payload.
//!
//! ## Fixed-point format
//!
//! ```text
//! "60.1234567"  ->  601234567   (units of 1e-7 degree, i32)
//! "-90.0"       -> -900000000
//! "24"          ->  240000000
//! ```
//!
//! At 1e-7 degree the worst-case resolution is roughly 11 mm at the equator,
//! which uses the full width of the 4-byte fields in the packet.

use thiserror::Error;

/// Fixed-point units per whole degree
pub const FIXED_POINT_SCALE: i64 = 10_000_000;

/// Fractional digits representable at 1e-7 degree resolution
pub const MAX_FRACTION_DIGITS: usize = 7;

/// Signed coordinate in units of 1e-7 degree
pub type FixedPointDegree = i32;

/// Coordinate text that could not be converted to fixed-point degrees
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    #[error("too many '.' separators in \"{0}\"")]
    TooManyParts(String),
    #[error("malformed degrees in \"{0}\"")]
    MalformedDegrees(String),
    #[error("malformed fraction in \"{0}\" (expected 1-7 digits)")]
    MalformedFraction(String),
    #[error("\"{0}\" does not fit in a 32-bit fixed-point value")]
    Overflow(String),
}

/// Convert a decimal-degree string to fixed-point degrees
///
/// The fractional digits take the sign of the integer degrees. Note that this
/// makes `"-0.5"` positive, because the integer part `-0` carries no sign.
pub fn parse_coordinate(text: &str) -> Result<FixedPointDegree, CoordinateError> {
    let mut parts = text.split('.');
    let degrees_text = parts.next().unwrap_or_default();
    let fraction_text = parts.next();
    if parts.next().is_some() {
        return Err(CoordinateError::TooManyParts(text.to_string()));
    }

    let degrees: i64 = degrees_text
        .parse()
        .map_err(|_| CoordinateError::MalformedDegrees(text.to_string()))?;
    let mut fixed = degrees
        .checked_mul(FIXED_POINT_SCALE)
        .ok_or_else(|| CoordinateError::Overflow(text.to_string()))?;

    if let Some(fraction_text) = fraction_text {
        let fraction = parse_fraction(fraction_text)
            .ok_or_else(|| CoordinateError::MalformedFraction(text.to_string()))?;
        if degrees < 0 {
            fixed -= fraction;
        } else {
            fixed += fraction;
        }
    }

    FixedPointDegree::try_from(fixed).map_err(|_| CoordinateError::Overflow(text.to_string()))
}

/// Parse fractional digits and align them to 1e-7 degree units
fn parse_fraction(digits: &str) -> Option<i64> {
    if digits.is_empty()
        || digits.len() > MAX_FRACTION_DIGITS
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let value: i64 = digits.parse().ok()?;
    Some(value * 10i64.pow((MAX_FRACTION_DIGITS - digits.len()) as u32))
}

/// Render fixed-point degrees back as decimal text (always 7 fractional digits)
pub fn format_coordinate(value: FixedPointDegree) -> String {
    let value = value as i64;
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.abs();
    format!(
        "{}{}.{:07}",
        sign,
        magnitude / FIXED_POINT_SCALE,
        magnitude % FIXED_POINT_SCALE
    )
}

/// Emit the low `N` bytes of `value`'s two's complement form, most significant first
///
/// Widths above 4 bytes are sign-extended.
pub fn pack_be<const N: usize>(value: i32) -> [u8; N] {
    let bytes = value.to_be_bytes();
    let fill = if value < 0 { 0xFF } else { 0x00 };
    let mut out = [fill; N];
    let take = N.min(bytes.len());
    out[N - take..].copy_from_slice(&bytes[bytes.len() - take..]);
    out
}

/// Inverse of [`pack_be`]: read `N` big-endian bytes as a sign-extended `i32`
pub fn unpack_be<const N: usize>(bytes: [u8; N]) -> i32 {
    let negative = N > 0 && bytes[0] & 0x80 != 0;
    let mut buf = if negative { [0xFF; 4] } else { [0x00; 4] };
    let take = N.min(buf.len());
    buf[4 - take..].copy_from_slice(&bytes[N - take..]);
    i32::from_be_bytes(buf)
}
