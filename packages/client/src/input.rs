//! Parsing of typed position lines.
//!
//! Pure functions without side effects, making them easy to test.

use crate::error::ClientError;

/// Parse a "lat,lng" line into a coordinate pair.
///
/// Both fields must parse as finite numbers; whitespace around either field
/// is tolerated.
///
/// # Arguments
///
/// * `line` - The line typed by the delivery partner (e.g., "12.9,77.6")
///
/// # Returns
///
/// The `(lat, lng)` pair, or `ClientError::InvalidInput` describing the
/// rejected line.
pub fn parse_coordinate_line(line: &str) -> Result<(f64, f64), ClientError> {
    let invalid = || ClientError::InvalidInput(line.to_string());

    let (lat_str, lng_str) = line.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat_str.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng_str.trim().parse().map_err(|_| invalid())?;

    if !lat.is_finite() || !lng.is_finite() {
        return Err(invalid());
    }

    Ok((lat, lng))
}
