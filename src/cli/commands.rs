use chrono::{NaiveDateTime, TimeZone, Utc};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};
use validator::Validate;

use crate::cli::args::{Cli, Commands, RunArgs};
use crate::config::{PipelineConfig, SourceKind};
use crate::error::{ProcessingError, Result};
use crate::models::DerivedDataset;
use crate::processors::{Pipeline, PipelineInput, PipelineOutput};
use crate::readers::{read_site_list, ObservationReader, StationReader};
use crate::utils::constants::VALID_TIME_FORMAT;
use crate::utils::filename::generate_default_dataset_filename;
use crate::utils::progress::ProgressReporter;
use crate::writers::{JsonWriter, ParquetWriter};

pub fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Process {
            run,
            output_json,
            compact_json,
            output_parquet,
            compression,
            row_group_size,
        } => {
            let output = run_pipeline(&run, cli.quiet)?;
            println!("\n{}", output.report.generate_summary());

            if output.dataset.is_empty() {
                println!("No stations to write");
                return Ok(());
            }

            // Parquet is the default output when none is named
            let output_parquet = match (&output_json, output_parquet) {
                (None, None) => Some(default_output_path(&output.dataset, "parquet")),
                (_, parquet) => parquet,
            };

            if let Some(path) = &output_json {
                JsonWriter::new()
                    .with_pretty(!compact_json)
                    .write_dataset(&output.dataset, path)?;
                println!("Wrote {} stations to {}", output.dataset.len(), path.display());
            }

            if let Some(path) = &output_parquet {
                let writer = ParquetWriter::new()
                    .with_compression(&compression)?
                    .with_row_group_size(row_group_size);
                writer.write_dataset(&output.dataset, path)?;

                let file_info = writer.get_file_info(path)?;
                println!("\n{}", file_info.summary());
            }

            println!("Processing complete!");
        }

        Commands::Validate { run } => {
            let output = run_pipeline(&run, cli.quiet)?;
            println!("\n{}", output.report.generate_summary());

            let dropped = output.report.dropped_records();
            if dropped == 0 && output.report.incomplete_stations.is_empty() {
                println!("✅ All observations decoded cleanly");
            } else {
                println!(
                    "⚠️  {} records dropped, {} stations incomplete",
                    dropped,
                    output.report.incomplete_stations.len()
                );
            }
        }

        Commands::Info { file, sample } => {
            println!("Analyzing Parquet file: {}", file.display());

            let writer = ParquetWriter::new();
            let file_info = writer.get_file_info(&file)?;
            println!("\n{}", file_info.summary());

            if sample > 0 {
                println!("\nSample Records (showing up to {} stations):", sample);
                match writer.read_sample_records(&file, sample) {
                    Ok(records) => {
                        for (i, record) in records.iter().enumerate() {
                            println!(
                                "{}. {} at {}: T={} Td={} P={} wind=({:.1}, {:.1}) kt, {} oktas {}",
                                i + 1,
                                record.station_id,
                                record.observed_at.format("%Y-%m-%d %H:%MZ"),
                                format_optional(record.air_temperature, "°F"),
                                format_optional(record.dew_point, "°F"),
                                record.pressure_code.as_deref().unwrap_or("---"),
                                record.eastward_wind,
                                record.northward_wind,
                                record.cloud_oktas,
                                record.present_weather.join(" ")
                            );
                        }
                    }
                    Err(e) => println!("Error reading sample data: {}", e),
                }
            }
        }
    }

    Ok(())
}

/// Load settings and inputs, then run the pipeline once.
fn run_pipeline(args: &RunArgs, quiet: bool) -> Result<PipelineOutput> {
    let config = load_config(args)?;
    let source = config.source;
    info!("Processing {} observations from {}", source, args.input.display());

    let progress = ProgressReporter::new_spinner("Loading stations...", quiet);
    let stations = StationReader::new().read_stations(&args.stations)?;

    let sites = args.sites.as_deref().map(read_site_list).transpose()?;

    progress.stage("Reading observations...");
    let batch = ObservationReader::new(source).read_batch(&args.input)?;

    progress.stage("Decoding and reconciling...");
    let mut pipeline = Pipeline::new(config);
    if source == SourceKind::Structured && !args.all_times {
        pipeline = pipeline.with_trailing_window(Utc::now());
    }

    let output = pipeline.run(PipelineInput {
        stations,
        batch,
        sites,
    })?;

    progress.finish_with_message(&format!("Derived {} stations", output.dataset.len()));
    Ok(output)
}

fn load_config(args: &RunArgs) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate()?;
    debug!("Effective settings: {:?}", config);
    Ok(config)
}

/// Default output file keyed on the dataset's valid time, else its latest observation.
fn default_output_path(dataset: &DerivedDataset, extension: &str) -> PathBuf {
    let valid_at = dataset
        .valid_time
        .as_deref()
        .and_then(|label| NaiveDateTime::parse_from_str(label, VALID_TIME_FORMAT).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .or_else(|| dataset.latest_observation())
        .unwrap_or_else(Utc::now);
    generate_default_dataset_filename(valid_at, extension)
}

fn format_optional(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "M".to_string(), |v| format!("{:.1}{}", v, unit))
}

/// Set up logging to stderr and, optionally, a plain-text log file
fn setup_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let log_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("metar_processor={}", log_level)));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| ProcessingError::Config(format!("Cannot initialize logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}
