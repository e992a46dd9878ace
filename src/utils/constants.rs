/// Numeric "not available" marker used by observation services
pub const MISSING_SENTINEL: f64 = -9999.0;

/// Textual "not available" marker used in decoded reports
pub const MISSING_TEXT: &str = "M";

/// Longest text fragments accepted for each encoded field
pub const MAX_TEMPERATURE_FRAGMENT: usize = 5;
pub const MAX_WIND_DIRECTION_FRAGMENT: usize = 4;
pub const MAX_WIND_SPEED_FRAGMENT: usize = 5;
pub const MAX_PRESSURE_FRAGMENT: usize = 7;

/// Plausible air temperature range in degrees Celsius
pub const MIN_PLAUSIBLE_TEMP_C: f64 = -90.0;
pub const MAX_PLAUSIBLE_TEMP_C: f64 = 65.0;

/// Wind components above this magnitude (knots) are decoding artifacts
pub const DEFAULT_WIND_COMPONENT_LIMIT: f64 = 100.0;

/// Multiplier for the diagonal compass octants (45-45-90 triangle)
pub const RIGHT_TRIANGLE: f64 = 0.5 * std::f64::consts::SQRT_2;

/// Unit conversions to knots
pub const KNOTS_PER_MPS: f64 = 1.943_844;
pub const KNOTS_PER_KMH: f64 = 0.539_957;

/// Station selection defaults
pub const DEFAULT_LAT_HALF_WIDTH: f64 = 2.5;
pub const DEFAULT_LON_HALF_WIDTH: f64 = 5.0;
pub const DEFAULT_DENSITY: f64 = 0.55;

/// Request window defaults (hours before now)
pub const DEFAULT_WINDOW_LAG_HOURS: i64 = 2;

/// Report-group timestamp marker format, e.g. `2024/01/15 18:00`
pub const VALID_TIME_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
