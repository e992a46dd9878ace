use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::config::{SourceKind, WindConfig};
use crate::decoders::fields::{is_sentinel, layered_sky_cover_fraction};
use crate::error::{ProcessingError, Result};
use crate::models::{
    DerivedDataset, DerivedRecord, ReconciledRecord, StationMetadata, WindDirection,
};
use crate::utils::constants::{
    DEFAULT_WIND_COMPONENT_LIMIT, MAX_PLAUSIBLE_TEMP_C, MIN_PLAUSIBLE_TEMP_C, RIGHT_TRIANGLE,
};

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Knots, with missing or sentinel speeds treated as calm.
pub fn normalize_wind_speed(speed: Option<f64>) -> f64 {
    match speed {
        Some(s) if s.is_finite() && !is_sentinel(s) => s,
        _ => 0.0,
    }
}

/// Eight-way compass sector used for text-report winds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Octant {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Octant {
    /// Sixteen-point names fold into the diagonal between their neighbours.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "N" => Some(Octant::N),
            "NNE" | "NE" | "ENE" => Some(Octant::NE),
            "E" => Some(Octant::E),
            "ESE" | "SE" | "SSE" => Some(Octant::SE),
            "S" => Some(Octant::S),
            "SSW" | "SW" | "WSW" => Some(Octant::SW),
            "W" => Some(Octant::W),
            "WNW" | "NW" | "NNW" => Some(Octant::NW),
            _ => None,
        }
    }

    /// (u, v) for a wind of `speed` blowing from this sector.
    pub fn components(self, speed: f64) -> (f64, f64) {
        let diagonal = RIGHT_TRIANGLE * speed;
        match self {
            Octant::N => (0.0, -speed),
            Octant::E => (-speed, 0.0),
            Octant::S => (0.0, speed),
            Octant::W => (speed, 0.0),
            Octant::NE => (-diagonal, -diagonal),
            Octant::SE => (-diagonal, diagonal),
            Octant::SW => (diagonal, diagonal),
            Octant::NW => (diagonal, -diagonal),
        }
    }
}

/// (u, v) for a wind of `speed` from `degrees`; components beyond `limit` are zeroed.
pub fn vector_components(speed: f64, degrees: f64, limit: f64) -> (f64, f64) {
    let radians = degrees.to_radians();
    let clamp = |component: f64| if component.abs() > limit { 0.0 } else { component };
    (
        clamp(-speed * radians.sin()),
        clamp(-speed * radians.cos()),
    )
}

/// Whole oktas for a sky-cover fraction.
pub fn cloud_oktas(fraction: f64) -> u8 {
    if !fraction.is_finite() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * 8.0).round() as u8
}

/// Three-character station-plot pressure code: 1013.2 → "132", 998.7 → "987".
pub fn pressure_display_code(station_id: &str, hpa: f64) -> Result<String> {
    // Classify on the value as rendered, so 999.96 counts as 1000.0
    let hpa = (hpa * 10.0).round() / 10.0;
    let rendered = format!("{:.1}", hpa);
    let pick = |start: usize, end: usize, tenths: usize| {
        let head = rendered.get(start..end)?;
        let tail = rendered.get(tenths..tenths + 1)?;
        Some(format!("{}{}", head, tail))
    };

    let code = if hpa >= 1000.0 {
        pick(2, 4, 5)
    } else if hpa < 1000.0 {
        pick(1, 3, 4)
    } else {
        None
    };

    code.ok_or_else(|| ProcessingError::FatalDecode {
        station_id: station_id.to_string(),
        field: "sea-level pressure",
        message: format!("{} hPa has no display code", rendered),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeriveStats {
    /// Stations dropped for an undisplayable pressure.
    pub fatal_decodes: usize,
    /// Stations with no position in the table or the report.
    pub unlocated: usize,
    pub implausible_temperatures: usize,
}

/// Turns reconciled reports into plot-ready quantities.
#[derive(Debug, Clone)]
pub struct DerivedQuantityEngine {
    component_limit: f64,
}

impl DerivedQuantityEngine {
    pub fn new() -> Self {
        Self {
            component_limit: DEFAULT_WIND_COMPONENT_LIMIT,
        }
    }

    pub fn with_component_limit(mut self, limit: f64) -> Self {
        self.component_limit = limit;
        self
    }

    pub fn from_config(config: &WindConfig) -> Self {
        Self::new().with_component_limit(config.component_limit)
    }

    pub fn wind_components(&self, direction: Option<&WindDirection>, speed: Option<f64>) -> (f64, f64) {
        let speed = normalize_wind_speed(speed);
        match direction {
            Some(WindDirection::Degrees(degrees)) => {
                vector_components(speed, *degrees, self.component_limit)
            }
            Some(WindDirection::Compass(token)) => Octant::from_token(token)
                .map_or((0.0, 0.0), |octant| octant.components(speed)),
            None => (0.0, 0.0),
        }
    }

    fn plausible_fahrenheit(&self, station_id: &str, celsius: Option<f64>, stats: &mut DeriveStats) -> Option<f64> {
        let celsius = celsius?;
        if !(MIN_PLAUSIBLE_TEMP_C..=MAX_PLAUSIBLE_TEMP_C).contains(&celsius) {
            debug!("{}: {}°C discarded as implausible", station_id, celsius);
            stats.implausible_temperatures += 1;
            return None;
        }
        Some(celsius_to_fahrenheit(celsius))
    }

    /// Derive one station's quantities at the given position.
    pub fn derive_record(
        &self,
        reconciled: &ReconciledRecord,
        latitude: f64,
        longitude: f64,
        stats: &mut DeriveStats,
    ) -> Result<DerivedRecord> {
        let record = &reconciled.record;
        let station_id = record.station_id.as_str();

        let pressure_code = record
            .sea_level_pressure
            .map(|hpa| pressure_display_code(station_id, hpa))
            .transpose()?;

        let (eastward_wind, northward_wind) =
            self.wind_components(record.wind_direction.as_ref(), record.wind_speed);

        Ok(DerivedRecord {
            station_id: station_id.to_string(),
            latitude,
            longitude,
            observed_at: record.observed_at,
            air_temperature: self.plausible_fahrenheit(station_id, record.temperature, stats),
            dew_point: self.plausible_fahrenheit(station_id, record.dewpoint, stats),
            sea_level_pressure: record.sea_level_pressure,
            pressure_code,
            eastward_wind,
            northward_wind,
            cloud_oktas: cloud_oktas(layered_sky_cover_fraction(&record.sky_cover)),
            present_weather: record.present_weather.clone(),
        })
    }

    /// Derive every locatable station. Position comes from the station table,
    /// falling back to the report's own coordinates.
    pub fn derive(
        &self,
        reconciled: &[ReconciledRecord],
        stations: &HashMap<String, StationMetadata>,
        source: SourceKind,
        valid_time: Option<String>,
    ) -> (DerivedDataset, DeriveStats) {
        let mut dataset = DerivedDataset::new(source, valid_time);
        let mut stats = DeriveStats::default();

        for entry in reconciled {
            let record = &entry.record;
            let position = stations
                .get(&record.station_id)
                .map(|station| (station.latitude, station.longitude))
                .or_else(|| record.latitude.zip(record.longitude));

            let Some((latitude, longitude)) = position else {
                debug!("{} has no known position", record.station_id);
                stats.unlocated += 1;
                continue;
            };

            match self.derive_record(entry, latitude, longitude, &mut stats) {
                Ok(derived) => dataset.records.push(derived),
                Err(e) => {
                    warn!("Dropping station: {}", e);
                    stats.fatal_decodes += 1;
                }
            }
        }

        info!(
            "Derived {} stations ({} unlocated, {} undecodable)",
            dataset.len(),
            stats.unlocated,
            stats.fatal_decodes
        );

        (dataset, stats)
    }
}

impl Default for DerivedQuantityEngine {
    fn default() -> Self {
        Self::new()
    }
}
