//! Per-field decoding shared by both observation sources.
//!
//! Every decoder here is total: bad input becomes `None` (Missing), never an
//! error. Only the station id and observation time are mandatory, and those
//! are enforced by the assembler.

use chrono::{DateTime, Utc};

use crate::models::{FieldValue, ParameterKind};
use crate::utils::constants::{
    MAX_PRESSURE_FRAGMENT, MAX_TEMPERATURE_FRAGMENT, MAX_WIND_DIRECTION_FRAGMENT,
    MAX_WIND_SPEED_FRAGMENT, MISSING_SENTINEL, MISSING_TEXT,
};

pub fn is_sentinel(value: f64) -> bool {
    value == MISSING_SENTINEL
}

fn usable(value: f64) -> Option<f64> {
    if value.is_finite() && !is_sentinel(value) {
        Some(value)
    } else {
        None
    }
}

/// Decode a numeric field delivered either as a number or as text.
pub fn decode_number(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Number(n) => usable(*n),
        FieldValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() || s == MISSING_TEXT {
                return None;
            }
            s.parse::<f64>().ok().and_then(usable)
        }
        FieldValue::Missing => None,
    }
}

/// Decode a free-text field such as a station id or weather code.
pub fn decode_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() || s == MISSING_TEXT {
                None
            } else {
                Some(s.to_string())
            }
        }
        FieldValue::Number(n) if n.is_finite() && !is_sentinel(*n) => Some(n.to_string()),
        _ => None,
    }
}

/// Observation time given as milliseconds since the Unix epoch.
pub fn decode_timestamp_millis(value: &FieldValue) -> Option<DateTime<Utc>> {
    let millis = decode_number(value)?;
    if millis.fract() != 0.0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Longest fragment accepted for a text-encoded field, if the kind has a limit.
pub fn max_fragment_len(kind: ParameterKind) -> Option<usize> {
    match kind {
        ParameterKind::Temperature | ParameterKind::Dewpoint => Some(MAX_TEMPERATURE_FRAGMENT),
        ParameterKind::WindDirection => Some(MAX_WIND_DIRECTION_FRAGMENT),
        ParameterKind::WindSpeed => Some(MAX_WIND_SPEED_FRAGMENT),
        ParameterKind::SeaLevelPressure => Some(MAX_PRESSURE_FRAGMENT),
        _ => None,
    }
}

fn fragment_fits(kind: ParameterKind, fragment: &str) -> bool {
    max_fragment_len(kind).map_or(true, |max| fragment.chars().count() <= max)
}

/// Decode a numeric fragment cut out of a text report.
///
/// Over-long fragments mean the field boundaries were misread and are dropped.
pub fn decode_fragment(kind: ParameterKind, fragment: &str) -> Option<f64> {
    let fragment = fragment.trim();
    if !fragment_fits(kind, fragment) {
        return None;
    }
    decode_number(&FieldValue::Text(fragment.to_string()))
}

/// Decode a compass-point wind direction token such as `NNE`.
pub fn decode_direction_token(fragment: &str) -> Option<String> {
    let token = fragment.trim();
    if token.is_empty() || token == MISSING_TEXT {
        return None;
    }
    if !fragment_fits(ParameterKind::WindDirection, token) {
        return None;
    }
    Some(token.to_ascii_uppercase())
}

/// Fraction of sky covered for a cover code.
///
/// OVC → 1, BKN → 6/8, SCT → 4/8, FEW → 2/8, anything else → 0.
pub fn sky_cover_fraction(code: Option<&str>) -> f64 {
    let Some(code) = code else {
        return 0.0;
    };

    if code.contains("OVC") {
        1.0
    } else if code.contains("BKN") {
        6.0 / 8.0
    } else if code.contains("SCT") {
        4.0 / 8.0
    } else if code.contains("FEW") {
        2.0 / 8.0
    } else {
        0.0
    }
}

/// Sky cover of a multi-layer report: the most extensive layer wins.
pub fn layered_sky_cover_fraction(codes: &[String]) -> f64 {
    codes
        .iter()
        .map(|code| sky_cover_fraction(Some(code)))
        .fold(0.0, f64::max)
}
