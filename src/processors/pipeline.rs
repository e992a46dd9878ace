use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::config::PipelineConfig;
use crate::decoders::ObservationBatch;
use crate::error::{ProcessingError, Result};
use crate::models::{DerivedDataset, ParameterKind, StationMetadata};

use super::assembler::{ObservationAssembler, ObservationRequest, TimeWindow};
use super::derived_engine::DerivedQuantityEngine;
use super::reducer::RecencyReducer;
use super::report::ProcessingReport;
use super::station_filter::StationFilter;

/// Everything one run reads before processing starts.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub stations: Vec<StationMetadata>,
    pub batch: ObservationBatch,
    /// Stations to request; every station in the batch when unset.
    pub sites: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub dataset: DerivedDataset,
    pub report: ProcessingReport,
}

/// Assemble, reconcile, derive and select, in that order.
pub struct Pipeline {
    config: PipelineConfig,
    window: Option<TimeWindow>,
    reference: DateTime<Utc>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            window: None,
            reference: Utc::now(),
        }
    }

    pub fn with_window(mut self, window: Option<TimeWindow>) -> Self {
        self.window = window;
        self
    }

    /// Time used to date METAR reports when the batch has no marker line.
    pub fn with_reference(mut self, reference: DateTime<Utc>) -> Self {
        self.reference = reference;
        self
    }

    /// Request window ending before the current hour, per the configured lag.
    pub fn with_trailing_window(self, now: DateTime<Utc>) -> Self {
        let window = TimeWindow::trailing(now, self.config.request.window_lag_hours);
        self.with_window(Some(window))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn request(&self, sites: Option<Vec<String>>) -> ObservationRequest {
        let mut request = ObservationRequest::new(ParameterKind::all());
        if let Some(window) = self.window {
            request = request.with_window(window);
        }
        if let Some(sites) = sites {
            request = request.with_stations(sites);
        }
        request
    }

    pub fn run(&self, input: PipelineInput) -> Result<PipelineOutput> {
        if input.stations.is_empty() {
            return Err(ProcessingError::MissingData(
                "station table has no stations".to_string(),
            ));
        }
        if matches!(&input.sites, Some(sites) if sites.is_empty()) {
            return Err(ProcessingError::MissingData(
                "site list has no stations".to_string(),
            ));
        }

        let source = self.config.source;
        let mut report = ProcessingReport::new(source);

        let assembler = ObservationAssembler::for_source(
            source,
            self.request(input.sites),
            self.reference.naive_utc(),
        )?;
        let assembly = assembler.assemble(input.batch)?;
        report.assembly = assembly.stats.clone();
        report.assembled_records = assembly.records.len();
        report.valid_time = assembly.valid_time.clone();

        let reconciled = RecencyReducer::new().reduce(assembly.records);
        report.tally_missing(&reconciled);

        let station_table: HashMap<String, StationMetadata> = input
            .stations
            .iter()
            .map(|station| (station.station_id.clone(), station.clone()))
            .collect();

        let engine = DerivedQuantityEngine::from_config(&self.config.wind);
        let (mut dataset, derive_stats) =
            engine.derive(&reconciled, &station_table, source, assembly.valid_time);
        report.derive = derive_stats;

        if let Some(center_id) = &self.config.selection.center_station {
            let selected = self.select_stations(center_id, &station_table, &dataset)?;
            report.selected_stations = Some(selected.len());
            dataset
                .records
                .retain(|record| selected.contains(&record.station_id));
        }

        if self.config.selection.exclude_incomplete {
            let incomplete: HashSet<&String> = report.incomplete_stations.iter().collect();
            let before = dataset.len();
            dataset
                .records
                .retain(|record| !incomplete.contains(&record.station_id));
            report.excluded_incomplete = before - dataset.len();
        }

        report.output_stations = dataset.len();
        info!(
            "Pipeline finished: {} stations from {} entries",
            dataset.len(),
            report.assembly.decode.entries_read
        );

        Ok(PipelineOutput { dataset, report })
    }

    /// Ids of the derived stations kept by the selection box and density.
    fn select_stations(
        &self,
        center_id: &str,
        station_table: &HashMap<String, StationMetadata>,
        dataset: &DerivedDataset,
    ) -> Result<HashSet<String>> {
        let center = station_table
            .get(center_id)
            .cloned()
            .or_else(|| {
                dataset.get(center_id).map(|record| {
                    StationMetadata::new(
                        record.station_id.clone(),
                        record.latitude,
                        record.longitude,
                        None,
                    )
                })
            })
            .ok_or_else(|| ProcessingError::StationNotFound {
                station_id: center_id.to_string(),
            })?;

        let candidates: Vec<StationMetadata> = dataset
            .records
            .iter()
            .map(|record| {
                StationMetadata::new(
                    record.station_id.clone(),
                    record.latitude,
                    record.longitude,
                    None,
                )
            })
            .collect();

        let filter = StationFilter::from_config(&self.config.selection);
        let selected = filter.select(&center, &candidates)?;

        Ok(selected
            .into_iter()
            .map(|station| station.station_id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;
    use crate::models::StructuredEntry;
    use chrono::TimeZone;

    fn stations() -> Vec<StationMetadata> {
        vec![
            StationMetadata::new("KDFW".to_string(), 32.90, -97.04, Some(171.0)),
            StationMetadata::new("KDAL".to_string(), 32.85, -96.85, Some(148.0)),
            StationMetadata::new("KAUS".to_string(), 30.19, -97.67, Some(150.0)),
            StationMetadata::new("KSEA".to_string(), 47.45, -122.31, Some(131.0)),
        ]
    }

    fn metar_batch() -> ObservationBatch {
        ObservationBatch::Reports(
            [
                "2024/01/15 18:53",
                "KDFW 151853Z 18010KT 10SM FEW035 22/14 A2992 RMK SLP132",
                "KDAL 151853Z 36005KT 10SM BKN050 21/ A2991 RMK SLP129",
                "KAUS 151853Z 09015KT 10SM OVC010 18/16 A2995 RMK SLP142",
                "KSEA 151853Z 27008KT 10SM SCT020 08/04 A3001 RMK SLP163",
                "KDFW 151856Z 20020KT 10SM CLR 30/20 A2990",
                "not a report",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        )
    }

    fn metar_config() -> PipelineConfig {
        PipelineConfig {
            source: SourceKind::Metar,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_metar_run() {
        let output = Pipeline::new(metar_config())
            .run(PipelineInput {
                stations: stations(),
                batch: metar_batch(),
                sites: None,
            })
            .unwrap();

        assert_eq!(output.dataset.station_ids(), vec!["KAUS", "KDAL", "KDFW", "KSEA"]);
        let dfw = output.dataset.get("KDFW").unwrap();
        assert_eq!(dfw.pressure_code.as_deref(), Some("132"));
        assert_eq!(dfw.cloud_oktas, 2);
        assert_eq!(dfw.northward_wind, 10.0);

        let report = &output.report;
        assert_eq!(report.assembly.decode.duplicate_reports, 1);
        assert_eq!(report.assembly.decode.malformed_records, 1);
        assert_eq!(report.incomplete_stations, vec!["KDAL".to_string()]);
        assert_eq!(report.output_stations, 4);
    }

    #[test]
    fn test_exclude_incomplete_and_center() {
        let mut config = metar_config();
        config.selection.center_station = Some("KDFW".to_string());
        config.selection.density = 1.0;
        config.selection.seed = Some(1);
        config.selection.exclude_incomplete = true;

        let output = Pipeline::new(config)
            .run(PipelineInput {
                stations: stations(),
                batch: metar_batch(),
                sites: None,
            })
            .unwrap();

        // KSEA and KAUS are outside the box, KDAL is missing its dewpoint
        assert_eq!(output.dataset.station_ids(), vec!["KDFW"]);
        assert_eq!(output.report.selected_stations, Some(2));
        assert_eq!(output.report.excluded_incomplete, 1);
    }

    #[test]
    fn test_unknown_center_fails_the_run() {
        let mut config = metar_config();
        config.selection.center_station = Some("KXXX".to_string());

        let err = Pipeline::new(config)
            .run(PipelineInput {
                stations: stations(),
                batch: metar_batch(),
                sites: None,
            })
            .unwrap_err();
        assert!(matches!(err, ProcessingError::StationNotFound { .. }));
    }

    #[test]
    fn test_empty_site_list_fails_the_run() {
        let result = Pipeline::new(metar_config()).run(PipelineInput {
            stations: stations(),
            batch: metar_batch(),
            sites: Some(Vec::new()),
        });
        assert!(matches!(result, Err(ProcessingError::MissingData(_))));
    }

    #[test]
    fn test_structured_run_with_window() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 20, 10, 0).unwrap();
        let millis = |h: u32, m: u32| {
            Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0)
                .unwrap()
                .timestamp_millis() as f64
        };
        let core = |station: &str, time: f64, speed: f64| {
            StructuredEntry::new()
                .with_text(ParameterKind::StationId, station)
                .with_number(ParameterKind::Time, time)
                .with_number(ParameterKind::Temperature, 20.0)
                .with_number(ParameterKind::WindDirection, 270.0)
                .with_number(ParameterKind::WindSpeed, speed)
                .with_number(ParameterKind::SeaLevelPressure, 998.7)
        };

        let batch = ObservationBatch::Structured(vec![
            StructuredEntry::new()
                .with_text(ParameterKind::SkyCover, "OVC")
                .with_number(ParameterKind::SkyLayerBase, 800.0),
            core("KDFW", millis(18, 53), 150.0),
            core("KDFW", millis(19, 53), 12.0),
            core("KAUS", millis(16, 53), 5.0), // before the window
        ]);

        let config = PipelineConfig {
            source: SourceKind::Structured,
            ..PipelineConfig::default()
        };
        let output = Pipeline::new(config)
            .with_trailing_window(now)
            .run(PipelineInput {
                stations: stations(),
                batch,
                sites: Some(vec!["KDFW".to_string(), "KAUS".to_string()]),
            })
            .unwrap();

        assert_eq!(output.dataset.station_ids(), vec!["KDFW"]);
        let dfw = output.dataset.get("KDFW").unwrap();
        // The 19:53 report wins; its sky groups were attached to the 18:53 one
        assert!((dfw.eastward_wind - 12.0).abs() < 1e-9);
        assert_eq!(dfw.cloud_oktas, 0);
        assert_eq!(dfw.pressure_code.as_deref(), Some("987"));
        assert_eq!(output.report.assembly.outside_request, 1);
        assert_eq!(output.report.superseded_records, 1);
    }
}
