use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Report grammar error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Station {station_id} not found")]
    StationNotFound { station_id: String },

    #[error("Malformed report: {0}")]
    MalformedRecord(String),

    #[error("Cannot decode {field} for station {station_id}: {message}")]
    FatalDecode {
        station_id: String,
        field: &'static str,
        message: String,
    },

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid coordinate format: {0}")]
    InvalidCoordinate(String),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

impl ProcessingError {
    /// Errors that only cost the pipeline a single record.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            ProcessingError::MalformedRecord(_) | ProcessingError::FatalDecode { .. }
        )
    }
}
