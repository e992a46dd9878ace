use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Observation parameters a source can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParameterKind {
    Time,
    StationId,
    Latitude,
    Longitude,
    Temperature,
    Dewpoint,
    WindDirection,
    WindSpeed,
    SeaLevelPressure,
    PresentWeather,
    SkyCover,
    SkyLayerBase,
}

impl ParameterKind {
    pub const SINGLE_VALUED: [ParameterKind; 9] = [
        ParameterKind::Time,
        ParameterKind::StationId,
        ParameterKind::Longitude,
        ParameterKind::Latitude,
        ParameterKind::Temperature,
        ParameterKind::Dewpoint,
        ParameterKind::WindDirection,
        ParameterKind::WindSpeed,
        ParameterKind::SeaLevelPressure,
    ];

    pub const MULTI_VALUED: [ParameterKind; 3] = [
        ParameterKind::PresentWeather,
        ParameterKind::SkyCover,
        ParameterKind::SkyLayerBase,
    ];

    /// Every parameter, single-valued kinds first.
    pub fn all() -> Vec<ParameterKind> {
        Self::SINGLE_VALUED
            .iter()
            .chain(Self::MULTI_VALUED.iter())
            .copied()
            .collect()
    }

    /// Parse the parameter name used by the observation data service.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "timeObs" => Some(ParameterKind::Time),
            "stationName" => Some(ParameterKind::StationId),
            "latitude" => Some(ParameterKind::Latitude),
            "longitude" => Some(ParameterKind::Longitude),
            "temperature" => Some(ParameterKind::Temperature),
            "dewpoint" => Some(ParameterKind::Dewpoint),
            "windDir" => Some(ParameterKind::WindDirection),
            "windSpeed" => Some(ParameterKind::WindSpeed),
            "seaLevelPress" => Some(ParameterKind::SeaLevelPressure),
            "presWeather" => Some(ParameterKind::PresentWeather),
            "skyCover" => Some(ParameterKind::SkyCover),
            "skyLayerBase" => Some(ParameterKind::SkyLayerBase),
            _ => None,
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            ParameterKind::Time => "timeObs",
            ParameterKind::StationId => "stationName",
            ParameterKind::Latitude => "latitude",
            ParameterKind::Longitude => "longitude",
            ParameterKind::Temperature => "temperature",
            ParameterKind::Dewpoint => "dewpoint",
            ParameterKind::WindDirection => "windDir",
            ParameterKind::WindSpeed => "windSpeed",
            ParameterKind::SeaLevelPressure => "seaLevelPress",
            ParameterKind::PresentWeather => "presWeather",
            ParameterKind::SkyCover => "skyCover",
            ParameterKind::SkyLayerBase => "skyLayerBase",
        }
    }

    pub fn is_multi_valued(&self) -> bool {
        Self::MULTI_VALUED.contains(self)
    }

    /// Station id and time identify an occurrence and are never optional.
    pub fn is_identity(&self) -> bool {
        matches!(self, ParameterKind::Time | ParameterKind::StationId)
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// A single raw value as the source hands it over, before decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

/// Capability the assembler needs from an observation source entry.
pub trait ObservationEntry {
    /// Parameter kinds this entry carries.
    fn parameters(&self) -> Vec<ParameterKind>;

    /// Read one parameter; kinds the entry does not carry read as `Missing`.
    fn value(&self, kind: ParameterKind) -> FieldValue;

    fn carries(&self, kind: ParameterKind) -> bool {
        self.parameters().contains(&kind)
    }
}

/// Key-value observation entry, one JSON object per line in the structured source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredEntry {
    fields: BTreeMap<String, serde_json::Value>,
}

impl StructuredEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_number(mut self, kind: ParameterKind, value: f64) -> Self {
        self.fields
            .insert(kind.wire_name().to_string(), serde_json::json!(value));
        self
    }

    pub fn with_text(mut self, kind: ParameterKind, value: &str) -> Self {
        self.fields
            .insert(kind.wire_name().to_string(), serde_json::json!(value));
        self
    }
}

impl ObservationEntry for StructuredEntry {
    fn parameters(&self) -> Vec<ParameterKind> {
        self.fields
            .keys()
            .filter_map(|name| ParameterKind::from_wire_name(name))
            .collect()
    }

    fn value(&self, kind: ParameterKind) -> FieldValue {
        match self.fields.get(kind.wire_name()) {
            Some(serde_json::Value::Number(n)) => n
                .as_f64()
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Missing),
            Some(serde_json::Value::String(s)) => FieldValue::Text(s.clone()),
            _ => FieldValue::Missing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WindDirection {
    /// Degrees clockwise from north, direction the wind blows from.
    Degrees(f64),
    /// Compass point name such as `NNE`.
    Compass(String),
}

/// One decoded report for one station at one time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledRecord {
    pub station_id: String,
    pub observed_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Degrees Celsius.
    pub temperature: Option<f64>,
    /// Degrees Celsius.
    pub dewpoint: Option<f64>,
    pub wind_direction: Option<WindDirection>,
    /// Knots.
    pub wind_speed: Option<f64>,
    /// Hectopascals.
    pub sea_level_pressure: Option<f64>,
    pub present_weather: Vec<String>,
    pub sky_cover: Vec<String>,
    /// Layer bases in feet, paired index-wise with `sky_cover`.
    pub sky_layer_base: Vec<Option<f64>>,
}

impl AssembledRecord {
    pub fn new(station_id: String, observed_at: DateTime<Utc>) -> Self {
        Self {
            station_id,
            observed_at,
            latitude: None,
            longitude: None,
            temperature: None,
            dewpoint: None,
            wind_direction: None,
            wind_speed: None,
            sea_level_pressure: None,
            present_weather: Vec::new(),
            sky_cover: Vec::new(),
            sky_layer_base: Vec::new(),
        }
    }

    pub fn is_missing(&self, kind: ParameterKind) -> bool {
        match kind {
            ParameterKind::Time | ParameterKind::StationId => false,
            ParameterKind::Latitude => self.latitude.is_none(),
            ParameterKind::Longitude => self.longitude.is_none(),
            ParameterKind::Temperature => self.temperature.is_none(),
            ParameterKind::Dewpoint => self.dewpoint.is_none(),
            ParameterKind::WindDirection => self.wind_direction.is_none(),
            ParameterKind::WindSpeed => self.wind_speed.is_none(),
            ParameterKind::SeaLevelPressure => self.sea_level_pressure.is_none(),
            ParameterKind::PresentWeather => self.present_weather.is_empty(),
            ParameterKind::SkyCover => self.sky_cover.is_empty(),
            ParameterKind::SkyLayerBase => self.sky_layer_base.iter().all(Option::is_none),
        }
    }

    pub fn missing_parameters(&self, requested: &[ParameterKind]) -> Vec<ParameterKind> {
        requested
            .iter()
            .copied()
            .filter(|kind| self.is_missing(*kind))
            .collect()
    }
}

/// The single report kept for a station after reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRecord {
    pub record: AssembledRecord,
    /// Older reports for the same station that were discarded.
    pub superseded: usize,
}

impl ReconciledRecord {
    pub fn station_id(&self) -> &str {
        &self.record.station_id
    }
}
