use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};

/// Convert DMS (Degrees:Minutes[:Seconds]) format to decimal degrees
///
/// # Examples
/// ```
/// use metar_processor::utils::dms_to_decimal;
///
/// let decimal = dms_to_decimal("32:53:48").unwrap();
/// assert!((decimal - 32.896667).abs() < 0.000001);
/// ```
pub fn dms_to_decimal(dms: &str) -> Result<f64> {
    let parts: Vec<&str> = dms.split(':').collect();

    if parts.len() != 2 && parts.len() != 3 {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Invalid DMS format: '{}'. Expected format: 'DD:MM[:SS]'",
            dms
        )));
    }

    let is_negative = dms.starts_with('-');

    let degrees = parts[0].parse::<f64>().map_err(|_| {
        ProcessingError::InvalidCoordinate(format!("Invalid degrees value: '{}'", parts[0]))
    })?;

    let minutes = parts[1].parse::<f64>().map_err(|_| {
        ProcessingError::InvalidCoordinate(format!("Invalid minutes value: '{}'", parts[1]))
    })?;

    let seconds = match parts.get(2) {
        Some(s) => s.parse::<f64>().map_err(|_| {
            ProcessingError::InvalidCoordinate(format!("Invalid seconds value: '{}'", s))
        })?,
        None => 0.0,
    };

    if !(0.0..60.0).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Minutes and seconds must be below 60 in '{}'",
            dms
        )));
    }

    let decimal_value = degrees.abs() + minutes / 60.0 + seconds / 3600.0;

    if is_negative {
        Ok(-decimal_value)
    } else {
        Ok(decimal_value)
    }
}

/// Parse a coordinate in decimal or DMS form
pub fn parse_coordinate(coord_str: &str) -> Result<f64> {
    let trimmed = coord_str.trim();

    if trimmed.contains(':') {
        return dms_to_decimal(trimmed);
    }

    let value = trimmed.parse::<f64>().map_err(|_| {
        ProcessingError::InvalidCoordinate(format!("Invalid coordinate value: '{}'", coord_str))
    })?;

    if !value.is_finite() {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Non-finite coordinate value: '{}'",
            coord_str
        )));
    }

    Ok(value)
}

/// Latitude/longitude rectangle, edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Box extending `lat_half_width` and `lon_half_width` degrees around a point.
    pub fn around(latitude: f64, longitude: f64, lat_half_width: f64, lon_half_width: f64) -> Self {
        Self {
            south: latitude - lat_half_width,
            north: latitude + lat_half_width,
            west: longitude - lon_half_width,
            east: longitude + lon_half_width,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.south..=self.north).contains(&latitude) && (self.west..=self.east).contains(&longitude)
    }
}
