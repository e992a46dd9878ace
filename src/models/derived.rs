use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SourceKind;

/// Plot-ready values for one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRecord {
    pub station_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,

    /// Degrees Fahrenheit; `None` leaves the station out of the temperature field.
    pub air_temperature: Option<f64>,
    /// Degrees Fahrenheit.
    pub dew_point: Option<f64>,

    /// Hectopascals.
    pub sea_level_pressure: Option<f64>,
    /// Three-character station-plot code, tenths of hPa without the leading digits.
    pub pressure_code: Option<String>,

    /// Knots, towards the east.
    pub eastward_wind: f64,
    /// Knots, towards the north.
    pub northward_wind: f64,

    /// Sky cover in oktas, 0-8.
    pub cloud_oktas: u8,
    pub present_weather: Vec<String>,
}

impl DerivedRecord {
    pub fn wind_speed(&self) -> f64 {
        self.eastward_wind.hypot(self.northward_wind)
    }

    pub fn is_calm(&self) -> bool {
        self.eastward_wind == 0.0 && self.northward_wind == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedDataset {
    pub source: SourceKind,
    /// Report-group time label when the source provides one.
    pub valid_time: Option<String>,
    pub records: Vec<DerivedRecord>,
}

impl DerivedDataset {
    pub fn new(source: SourceKind, valid_time: Option<String>) -> Self {
        Self {
            source,
            valid_time,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn station_ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.station_id.as_str()).collect()
    }

    pub fn get(&self, station_id: &str) -> Option<&DerivedRecord> {
        self.records.iter().find(|r| r.station_id == station_id)
    }

    /// Most recent observation time across all stations.
    pub fn latest_observation(&self) -> Option<DateTime<Utc>> {
        self.records.iter().map(|r| r.observed_at).max()
    }
}
