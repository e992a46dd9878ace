//! Pipeline settings.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `METAR_`-prefixed environment variables (`METAR_SELECTION__DENSITY=0.4`).
//! Command-line flags are applied on top by the CLI.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;
use validator::Validate;

use crate::error::Result;
use crate::utils::constants::{
    DEFAULT_DENSITY, DEFAULT_LAT_HALF_WIDTH, DEFAULT_LON_HALF_WIDTH, DEFAULT_WIND_COMPONENT_LIMIT,
    DEFAULT_WINDOW_LAG_HOURS,
};

/// Which decoder the observation assembler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON Lines entries from the observation data service
    Structured,
    /// Raw METAR text reports
    Metar,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Structured => write!(f, "structured"),
            SourceKind::Metar => write!(f, "metar"),
        }
    }
}

/// Station filter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SelectionConfig {
    /// Station the display box is centred on; no filtering when unset.
    pub center_station: Option<String>,

    #[validate(range(exclusive_min = 0.0, max = 90.0))]
    pub lat_half_width: f64,

    #[validate(range(exclusive_min = 0.0, max = 180.0))]
    pub lon_half_width: f64,

    /// Fraction of in-box stations kept.
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub density: f64,

    /// Fixes the shuffle order; a fresh order every run when unset.
    pub seed: Option<u64>,

    /// Drop stations whose report is missing any core field.
    pub exclude_incomplete: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            center_station: None,
            lat_half_width: DEFAULT_LAT_HALF_WIDTH,
            lon_half_width: DEFAULT_LON_HALF_WIDTH,
            density: DEFAULT_DENSITY,
            seed: None,
            exclude_incomplete: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WindConfig {
    /// Knots; larger u/v components are zeroed.
    #[validate(range(exclusive_min = 0.0))]
    pub component_limit: f64,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            component_limit: DEFAULT_WIND_COMPONENT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RequestConfig {
    /// Hours back from now to the start of the request window.
    #[validate(range(min = 1, max = 48))]
    pub window_lag_hours: i64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            window_lag_hours: DEFAULT_WINDOW_LAG_HOURS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    pub source: SourceKind,

    #[validate(nested)]
    pub selection: SelectionConfig,

    #[validate(nested)]
    pub wind: WindConfig,

    #[validate(nested)]
    pub request: RequestConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Structured,
            selection: SelectionConfig::default(),
            wind: WindConfig::default(),
            request: RequestConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load settings from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("source", "structured")?
            .set_default("selection.lat_half_width", DEFAULT_LAT_HALF_WIDTH)?
            .set_default("selection.lon_half_width", DEFAULT_LON_HALF_WIDTH)?
            .set_default("selection.density", DEFAULT_DENSITY)?
            .set_default("selection.exclude_incomplete", false)?
            .set_default("wind.component_limit", DEFAULT_WIND_COMPONENT_LIMIT)?
            .set_default("request.window_lag_hours", DEFAULT_WINDOW_LAG_HOURS)?;

        if let Some(path) = path {
            debug!("Reading settings from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("METAR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.source, SourceKind::Structured);
        assert_eq!(config.selection.density, 0.55);
        assert_eq!(config.wind.component_limit, 100.0);
    }

    #[test]
    fn test_density_bounds() {
        let mut config = PipelineConfig::default();
        config.selection.density = 0.0;
        assert!(config.validate().is_err());

        config.selection.density = 1.5;
        assert!(config.validate().is_err());

        config.selection.density = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "source = \"metar\"")?;
        writeln!(file, "[selection]")?;
        writeln!(file, "center_station = \"KDFW\"")?;
        writeln!(file, "density = 0.25")?;
        writeln!(file, "seed = 7")?;

        let config = PipelineConfig::load(Some(file.path()))?;

        assert_eq!(config.source, SourceKind::Metar);
        assert_eq!(config.selection.center_station.as_deref(), Some("KDFW"));
        assert_eq!(config.selection.density, 0.25);
        assert_eq!(config.selection.seed, Some(7));
        // Untouched sections keep their defaults
        assert_eq!(config.selection.lat_half_width, 2.5);
        assert_eq!(config.request.window_lag_hours, 2);

        Ok(())
    }

    #[test]
    fn test_invalid_file_value_rejected() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "[selection]")?;
        writeln!(file, "density = 3.0")?;

        assert!(PipelineConfig::load(Some(file.path())).is_err());
        Ok(())
    }
}
