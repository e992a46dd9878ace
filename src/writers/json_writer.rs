use crate::error::Result;
use crate::models::DerivedDataset;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::utils::constants::DEFAULT_BUFFER_SIZE;

/// Writes the dataset as one JSON document.
pub struct JsonWriter {
    pretty: bool,
}

impl JsonWriter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn write_dataset(&self, dataset: &DerivedDataset, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, dataset)?;
        } else {
            serde_json::to_writer(&mut writer, dataset)?;
        }
        writer.write_all(b"\n")?;
        writer.flush()?;

        info!("Wrote {} stations to {}", dataset.len(), path.display());
        Ok(())
    }

    pub fn read_dataset(&self, path: &Path) -> Result<DerivedDataset> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;
    use crate::models::DerivedRecord;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_back() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out").join("obs.json");

        let mut dataset = DerivedDataset::new(SourceKind::Structured, None);
        dataset.records.push(DerivedRecord {
            station_id: "KDFW".to_string(),
            latitude: 32.9,
            longitude: -97.04,
            observed_at: Utc.with_ymd_and_hms(2024, 1, 15, 18, 53, 0).unwrap(),
            air_temperature: Some(71.6),
            dew_point: Some(57.2),
            sea_level_pressure: Some(998.7),
            pressure_code: Some("987".to_string()),
            eastward_wind: 12.0,
            northward_wind: 0.0,
            cloud_oktas: 6,
            present_weather: vec!["TSRA".to_string()],
        });

        let writer = JsonWriter::new();
        writer.write_dataset(&dataset, &path)?;

        let text = fs::read_to_string(&path)?;
        assert!(text.contains("\"source\": \"structured\""));
        assert!(text.contains("\"pressure_code\": \"987\""));

        assert_eq!(writer.read_dataset(&path)?, dataset);
        Ok(())
    }

    #[test]
    fn test_compact_output_keeps_derived_floats_exact() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("obs.json");

        // Components of a 15 kt north-westerly
        let component = 15.0 * std::f64::consts::FRAC_1_SQRT_2;
        let mut dataset =
            DerivedDataset::new(SourceKind::Metar, Some("2024/01/15 18:53".to_string()));
        dataset.records.push(DerivedRecord {
            station_id: "KFTW".to_string(),
            latitude: 32.82,
            longitude: -97.36,
            observed_at: Utc.with_ymd_and_hms(2024, 1, 15, 18, 53, 0).unwrap(),
            air_temperature: Some(28.4),
            dew_point: Some(23.0),
            sea_level_pressure: Some(998.7),
            pressure_code: Some("987".to_string()),
            eastward_wind: component,
            northward_wind: -component,
            cloud_oktas: 8,
            present_weather: Vec::new(),
        });
        dataset.records.push(DerivedRecord {
            station_id: "KDFW".to_string(),
            latitude: 32.9,
            longitude: -97.04,
            observed_at: Utc.with_ymd_and_hms(2024, 1, 15, 18, 53, 0).unwrap(),
            air_temperature: Some(22.2 * 9.0 / 5.0 + 32.0),
            dew_point: Some(13.9 * 9.0 / 5.0 + 32.0),
            sea_level_pressure: Some(1013.2),
            pressure_code: Some("132".to_string()),
            eastward_wind: 10.606601717798211,
            northward_wind: 0.0,
            cloud_oktas: 2,
            present_weather: Vec::new(),
        });

        let writer = JsonWriter::new().with_pretty(false);
        writer.write_dataset(&dataset, &path)?;

        let text = fs::read_to_string(&path)?;
        assert_eq!(text.lines().count(), 1);

        let read_back = writer.read_dataset(&path)?;
        for (written, read) in dataset.records.iter().zip(&read_back.records) {
            assert_eq!(written.eastward_wind.to_bits(), read.eastward_wind.to_bits());
            assert_eq!(written.northward_wind.to_bits(), read.northward_wind.to_bits());
        }
        assert_eq!(read_back, dataset);
        Ok(())
    }
}
