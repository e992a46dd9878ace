use crate::config::SourceKind;
use crate::error::{ProcessingError, Result};
use crate::models::{DerivedDataset, DerivedRecord};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const SOURCE_KEY: &str = "metar.source";
const VALID_TIME_KEY: &str = "metar.valid_time";

/// Separator for the present-weather list in its single string column.
const WEATHER_SEPARATOR: &str = " ";

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Write one row per station. An empty dataset writes nothing.
    pub fn write_dataset(&self, dataset: &DerivedDataset, path: &Path) -> Result<()> {
        if dataset.is_empty() {
            warn!("No stations to write to {}", path.display());
            return Ok(());
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let schema = Self::create_schema();
        let batch = self.records_to_batch(&dataset.records, schema.clone())?;

        let mut metadata = vec![KeyValue::new(
            SOURCE_KEY.to_string(),
            dataset.source.to_string(),
        )];
        if let Some(valid_time) = &dataset.valid_time {
            metadata.push(KeyValue::new(VALID_TIME_KEY.to_string(), valid_time.clone()));
        }

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .set_key_value_metadata(Some(metadata))
            .build();

        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        info!("Wrote {} stations to {}", dataset.len(), path.display());
        Ok(())
    }

    fn create_schema() -> Arc<Schema> {
        let fields = vec![
            Field::new("station_id", DataType::Utf8, false),
            Field::new(
                "observed_at",
                DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
                false,
            ),
            Field::new("latitude", DataType::Float64, false),
            Field::new("longitude", DataType::Float64, false),
            Field::new("air_temperature", DataType::Float64, true),
            Field::new("dew_point", DataType::Float64, true),
            Field::new("sea_level_pressure", DataType::Float64, true),
            Field::new("pressure_code", DataType::Utf8, true),
            Field::new("eastward_wind", DataType::Float64, false),
            Field::new("northward_wind", DataType::Float64, false),
            Field::new("cloud_oktas", DataType::UInt8, false),
            Field::new("present_weather", DataType::Utf8, false),
        ];

        Arc::new(Schema::new(fields))
    }

    fn records_to_batch(
        &self,
        records: &[DerivedRecord],
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        let station_ids: Vec<&str> = records.iter().map(|r| r.station_id.as_str()).collect();
        let observed: Vec<i64> = records
            .iter()
            .map(|r| r.observed_at.timestamp_millis())
            .collect();
        let latitudes: Vec<f64> = records.iter().map(|r| r.latitude).collect();
        let longitudes: Vec<f64> = records.iter().map(|r| r.longitude).collect();
        let temperatures: Vec<Option<f64>> = records.iter().map(|r| r.air_temperature).collect();
        let dew_points: Vec<Option<f64>> = records.iter().map(|r| r.dew_point).collect();
        let pressures: Vec<Option<f64>> = records.iter().map(|r| r.sea_level_pressure).collect();
        let pressure_codes: Vec<Option<&str>> =
            records.iter().map(|r| r.pressure_code.as_deref()).collect();
        let eastward: Vec<f64> = records.iter().map(|r| r.eastward_wind).collect();
        let northward: Vec<f64> = records.iter().map(|r| r.northward_wind).collect();
        let oktas: Vec<u8> = records.iter().map(|r| r.cloud_oktas).collect();
        let weather: Vec<String> = records
            .iter()
            .map(|r| r.present_weather.join(WEATHER_SEPARATOR))
            .collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(station_ids)),
                Arc::new(TimestampMillisecondArray::from(observed).with_timezone("UTC")),
                Arc::new(Float64Array::from(latitudes)),
                Arc::new(Float64Array::from(longitudes)),
                Arc::new(Float64Array::from(temperatures)),
                Arc::new(Float64Array::from(dew_points)),
                Arc::new(Float64Array::from(pressures)),
                Arc::new(StringArray::from(pressure_codes)),
                Arc::new(Float64Array::from(eastward)),
                Arc::new(Float64Array::from(northward)),
                Arc::new(UInt8Array::from(oktas)),
                Arc::new(StringArray::from(weather)),
            ],
        )?;

        Ok(batch)
    }

    /// Read up to `limit` station rows back.
    pub fn read_sample_records(&self, path: &Path, limit: usize) -> Result<Vec<DerivedRecord>> {
        let file = File::open(path)?;
        let parquet_reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut records = Vec::new();

        for batch_result in parquet_reader {
            let batch = batch_result?;

            let station_ids = column::<StringArray>(&batch, "station_id")?;
            let observed = column::<TimestampMillisecondArray>(&batch, "observed_at")?;
            let latitudes = column::<Float64Array>(&batch, "latitude")?;
            let longitudes = column::<Float64Array>(&batch, "longitude")?;
            let temperatures = column::<Float64Array>(&batch, "air_temperature")?;
            let dew_points = column::<Float64Array>(&batch, "dew_point")?;
            let pressures = column::<Float64Array>(&batch, "sea_level_pressure")?;
            let pressure_codes = column::<StringArray>(&batch, "pressure_code")?;
            let eastward = column::<Float64Array>(&batch, "eastward_wind")?;
            let northward = column::<Float64Array>(&batch, "northward_wind")?;
            let oktas = column::<UInt8Array>(&batch, "cloud_oktas")?;
            let weather = column::<StringArray>(&batch, "present_weather")?;

            for i in 0..batch.num_rows() {
                if records.len() >= limit {
                    return Ok(records);
                }

                let observed_at = DateTime::from_timestamp_millis(observed.value(i))
                    .ok_or_else(|| {
                        ProcessingError::InvalidFormat(
                            "Invalid observation time in Parquet file".to_string(),
                        )
                    })?;

                records.push(DerivedRecord {
                    station_id: station_ids.value(i).to_string(),
                    latitude: latitudes.value(i),
                    longitude: longitudes.value(i),
                    observed_at,
                    air_temperature: optional(temperatures, i),
                    dew_point: optional(dew_points, i),
                    sea_level_pressure: optional(pressures, i),
                    pressure_code: (!pressure_codes.is_null(i))
                        .then(|| pressure_codes.value(i).to_string()),
                    eastward_wind: eastward.value(i),
                    northward_wind: northward.value(i),
                    cloud_oktas: oktas.value(i),
                    present_weather: weather
                        .value(i)
                        .split_whitespace()
                        .map(str::to_string)
                        .collect(),
                });
            }
        }

        Ok(records)
    }

    /// Row counts, size, compression and run labels of a written file.
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let file_size = fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        let compression = if row_groups > 0 && metadata.row_group(0).num_columns() > 0 {
            metadata.row_group(0).column(0).compression()
        } else {
            self.compression
        };

        let label = |key: &str| {
            file_metadata
                .key_value_metadata()
                .and_then(|pairs| pairs.iter().find(|kv| kv.key == key))
                .and_then(|kv| kv.value.clone())
        };

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression,
            source: label(SOURCE_KEY),
            valid_time: label(VALID_TIME_KEY),
        })
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|array| array.as_any().downcast_ref::<T>())
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid {} column", name)))
}

fn optional(array: &Float64Array, index: usize) -> Option<f64> {
    (!array.is_null(index)).then(|| array.value(index))
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
    pub source: Option<String>,
    pub valid_time: Option<String>,
}

impl ParquetFileInfo {
    pub fn source_kind(&self) -> Option<SourceKind> {
        match self.source.as_deref() {
            Some("metar") => Some(SourceKind::Metar),
            Some("structured") => Some(SourceKind::Structured),
            _ => None,
        }
    }

    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };

        format!(
            "Parquet File Summary:\n\
            - Stations: {}\n\
            - Source: {}\n\
            - Valid time: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} KB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.source.as_deref().unwrap_or("unknown"),
            self.valid_time.as_deref().unwrap_or("n/a"),
            self.row_groups,
            self.file_size as f64 / 1024.0,
            self.compression,
            avg_rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn dataset() -> DerivedDataset {
        let mut dataset =
            DerivedDataset::new(SourceKind::Metar, Some("2024/01/15 18:53".to_string()));
        dataset.records.push(DerivedRecord {
            station_id: "KDFW".to_string(),
            latitude: 32.9,
            longitude: -97.04,
            observed_at: Utc.with_ymd_and_hms(2024, 1, 15, 18, 53, 0).unwrap(),
            air_temperature: Some(71.6),
            dew_point: None,
            sea_level_pressure: Some(1013.2),
            pressure_code: Some("132".to_string()),
            eastward_wind: 0.0,
            northward_wind: 10.0,
            cloud_oktas: 2,
            present_weather: vec!["-RA".to_string(), "BR".to_string()],
        });
        dataset.records.push(DerivedRecord {
            station_id: "KAUS".to_string(),
            latitude: 30.19,
            longitude: -97.67,
            observed_at: Utc.with_ymd_and_hms(2024, 1, 15, 18, 51, 0).unwrap(),
            air_temperature: None,
            dew_point: Some(60.8),
            sea_level_pressure: None,
            pressure_code: None,
            eastward_wind: -7.5,
            northward_wind: 0.0,
            cloud_oktas: 8,
            present_weather: Vec::new(),
        });
        dataset
    }

    #[test]
    fn test_write_empty_dataset() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("empty.parquet");

        ParquetWriter::new().write_dataset(&DerivedDataset::new(SourceKind::Metar, None), &path)?;

        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_write_and_read_back() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("obs.parquet");
        let writer = ParquetWriter::new();
        let dataset = dataset();

        writer.write_dataset(&dataset, &path)?;
        let records = writer.read_sample_records(&path, 10)?;

        assert_eq!(records, dataset.records);

        let info = writer.get_file_info(&path)?;
        assert_eq!(info.total_rows, 2);
        assert_eq!(info.source_kind(), Some(SourceKind::Metar));
        assert_eq!(info.valid_time.as_deref(), Some("2024/01/15 18:53"));
        assert!(info.summary().contains("Stations: 2"));

        Ok(())
    }

    #[test]
    fn test_sample_limit() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("obs.parquet");
        let writer = ParquetWriter::new();

        writer.write_dataset(&dataset(), &path)?;

        assert_eq!(writer.read_sample_records(&path, 1)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_row_group_size() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("groups.parquet");
        let writer = ParquetWriter::new().with_row_group_size(1);

        writer.write_dataset(&dataset(), &path)?;

        let info = writer.get_file_info(&path)?;
        assert_eq!(info.row_groups, 2);
        assert_eq!(info.row_group_sizes, vec![1, 1]);
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        let dir = TempDir::new()?;

        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let path = dir.path().join(format!("{}.parquet", compression));

            let result = writer.write_dataset(&dataset(), &path);
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli-ish").is_err());
        Ok(())
    }
}
