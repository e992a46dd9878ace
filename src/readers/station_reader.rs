use crate::error::{ProcessingError, Result};
use crate::models::StationMetadata;
use crate::utils::coordinates::parse_coordinate;
use csv::StringRecord;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};
use validator::Validate;

// Column positions; header names are not checked
const ID_COLUMN: usize = 0;
const LATITUDE_COLUMN: usize = 1;
const LONGITUDE_COLUMN: usize = 2;
const ELEVATION_COLUMN: usize = 3;

pub struct StationReader {
    delimiter: u8,
}

impl StationReader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Read the station reference table: one header row, then id, latitude,
    /// longitude and elevation per station, by column position.
    pub fn read_stations(&self, path: &Path) -> Result<Vec<StationMetadata>> {
        let file = File::open(path).map_err(|e| {
            ProcessingError::MissingData(format!(
                "cannot open station table {}: {}",
                path.display(),
                e
            ))
        })?;
        let stations = self.read_stations_from(file)?;
        info!(
            "Loaded {} stations from {}",
            stations.len(),
            path.display()
        );
        Ok(stations)
    }

    pub fn read_stations_from<R: Read>(&self, input: R) -> Result<Vec<StationMetadata>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .comment(Some(b'#'))
            .from_reader(input);

        let mut stations = Vec::new();
        let mut skipped = 0;

        for (index, row) in reader.records().enumerate() {
            let parsed = row
                .map_err(ProcessingError::from)
                .and_then(|record| self.parse_row(&record));
            match parsed {
                Ok(station) => stations.push(station),
                Err(e) => {
                    // Header is line 1
                    warn!("Skipping station table row {}: {}", index + 2, e);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            debug!("{} station rows skipped", skipped);
        }

        Ok(stations)
    }

    fn parse_row(&self, record: &StringRecord) -> Result<StationMetadata> {
        let column = |index: usize, name: &'static str| {
            record.get(index).ok_or_else(|| {
                ProcessingError::InvalidFormat(format!(
                    "expected {} in column {}, row has {} columns",
                    name,
                    index + 1,
                    record.len()
                ))
            })
        };

        let id = column(ID_COLUMN, "station id")?;
        let latitude = parse_coordinate(column(LATITUDE_COLUMN, "latitude")?)?;
        let longitude = parse_coordinate(column(LONGITUDE_COLUMN, "longitude")?)?;

        let elevation = match record.get(ELEVATION_COLUMN).map(str::trim) {
            None | Some("") | Some("-999") | Some("M") => None,
            Some(value) => Some(value.parse::<f64>().map_err(|_| {
                ProcessingError::InvalidFormat(format!("invalid elevation '{}'", value))
            })?),
        };

        let station = StationMetadata::new(
            id.trim().to_ascii_uppercase(),
            latitude,
            longitude,
            elevation,
        );
        station.validate()?;
        Ok(station)
    }

    /// Station table keyed by station id. Later rows replace earlier ones.
    pub fn read_stations_map(&self, path: &Path) -> Result<HashMap<String, StationMetadata>> {
        let stations = self.read_stations(path)?;
        let mut map = HashMap::with_capacity(stations.len());

        for station in stations {
            map.insert(station.station_id.clone(), station);
        }

        Ok(map)
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}
