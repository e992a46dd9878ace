use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{PipelineConfig, SourceKind};
use crate::utils::constants::{COMPRESSION_SNAPPY, DEFAULT_ROW_GROUP_SIZE};

#[derive(Parser)]
#[command(name = "metar-processor")]
#[command(about = "Decode surface observations into a most-recent-per-station plotting dataset")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Only log warnings and hide progress")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Also write the log to this file")]
    pub log_file: Option<PathBuf>,
}

/// Inputs and settings shared by every command that runs the pipeline.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, help = "Station reference table (id, latitude, longitude, elevation)")]
    pub stations: PathBuf,

    #[arg(short, long, help = "Observation file: JSON Lines or METAR text")]
    pub input: PathBuf,

    #[arg(long, value_enum, help = "Observation source [default: from config, else structured]")]
    pub source: Option<SourceKind>,

    #[arg(long, help = "Site list; the first column of each line is a station id")]
    pub sites: Option<PathBuf>,

    #[arg(long, help = "Center the selection box on this station")]
    pub center: Option<String>,

    #[arg(long, help = "Fraction of in-box stations to keep, in (0, 1]")]
    pub density: Option<f64>,

    #[arg(long, help = "Seed for the station shuffle")]
    pub seed: Option<u64>,

    #[arg(long, help = "Drop stations missing any core field")]
    pub exclude_incomplete: bool,

    #[arg(long, help = "Keep every observation time instead of the trailing request window")]
    pub all_times: bool,

    #[arg(short, long, help = "TOML settings file")]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Command-line values take precedence over file and environment settings.
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(center) = &self.center {
            config.selection.center_station = Some(center.to_ascii_uppercase());
        }
        if let Some(density) = self.density {
            config.selection.density = density;
        }
        if self.seed.is_some() {
            config.selection.seed = self.seed;
        }
        if self.exclude_incomplete {
            config.selection.exclude_incomplete = true;
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process observations and write the plotting dataset
    Process {
        #[command(flatten)]
        run: RunArgs,

        #[arg(long, help = "Write the dataset as pretty JSON")]
        output_json: Option<PathBuf>,

        #[arg(long, help = "Write the JSON dataset on one line")]
        compact_json: bool,

        #[arg(
            long,
            help = "Write the dataset as Parquet [default: output/sfc-obs-{YYMMDD}-{HH}Z.parquet when no output is given]"
        )]
        output_parquet: Option<PathBuf>,

        #[arg(long, default_value = COMPRESSION_SNAPPY)]
        compression: String,

        #[arg(long, default_value_t = DEFAULT_ROW_GROUP_SIZE, help = "Stations per Parquet row group")]
        row_group_size: usize,
    },

    /// Run the pipeline and print the processing report only
    Validate {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Display information about a Parquet dataset
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_args() {
        let cli = Cli::try_parse_from([
            "metar-processor",
            "process",
            "--stations",
            "stations.csv",
            "--input",
            "obs.txt",
            "--source",
            "metar",
            "--center",
            "kdfw",
            "--density",
            "0.3",
            "--output-json",
            "out.json",
        ])
        .unwrap();

        let Commands::Process {
            run,
            output_json,
            compact_json,
            output_parquet,
            compression,
            row_group_size,
        } = cli.command
        else {
            panic!("expected process command");
        };

        assert_eq!(output_json, Some(PathBuf::from("out.json")));
        assert_eq!(output_parquet, None);
        assert_eq!(compression, "snappy");
        assert!(!compact_json);
        assert_eq!(row_group_size, DEFAULT_ROW_GROUP_SIZE);

        let mut config = PipelineConfig::default();
        run.apply_to(&mut config);
        assert_eq!(config.source, SourceKind::Metar);
        assert_eq!(config.selection.center_station.as_deref(), Some("KDFW"));
        assert_eq!(config.selection.density, 0.3);
        assert_eq!(config.selection.seed, None);
    }

    #[test]
    fn test_output_layout_flags() {
        let cli = Cli::try_parse_from([
            "metar-processor",
            "process",
            "--stations",
            "stations.csv",
            "--input",
            "obs.jsonl",
            "--compact-json",
            "--row-group-size",
            "500",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Commands::Process {
                compact_json: true,
                row_group_size: 500,
                ..
            }
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "metar-processor",
            "info",
            "--file",
            "obs.parquet",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Info { sample: 10, .. }));
    }

    #[test]
    fn test_unknown_source_rejected() {
        let result = Cli::try_parse_from([
            "metar-processor",
            "validate",
            "--stations",
            "s.csv",
            "--input",
            "o.txt",
            "--source",
            "synop",
        ]);
        assert!(result.is_err());
    }
}
