use std::collections::BTreeMap;

use crate::config::SourceKind;
use crate::models::{ParameterKind, ReconciledRecord};

use super::assembler::AssemblyStats;
use super::derived_engine::DeriveStats;

/// Fields a plotted station is expected to report.
pub const CORE_PARAMETERS: [ParameterKind; 5] = [
    ParameterKind::Temperature,
    ParameterKind::Dewpoint,
    ParameterKind::WindDirection,
    ParameterKind::WindSpeed,
    ParameterKind::SeaLevelPressure,
];

/// Tallies for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingReport {
    pub source: SourceKind,
    pub valid_time: Option<String>,
    pub assembly: AssemblyStats,
    pub assembled_records: usize,
    pub superseded_records: usize,
    pub reconciled_stations: usize,
    pub derive: DeriveStats,
    /// Stations left after the selection box and density thinning, when applied.
    pub selected_stations: Option<usize>,
    pub excluded_incomplete: usize,
    pub output_stations: usize,
    /// Reconciled stations missing each core field.
    pub missing_fields: BTreeMap<ParameterKind, usize>,
    pub incomplete_stations: Vec<String>,
}

impl ProcessingReport {
    pub fn new(source: SourceKind) -> Self {
        Self {
            source,
            valid_time: None,
            assembly: AssemblyStats::default(),
            assembled_records: 0,
            superseded_records: 0,
            reconciled_stations: 0,
            derive: DeriveStats::default(),
            selected_stations: None,
            excluded_incomplete: 0,
            output_stations: 0,
            missing_fields: BTreeMap::new(),
            incomplete_stations: Vec::new(),
        }
    }

    /// Count missing core fields and note the stations that have any.
    pub fn tally_missing(&mut self, reconciled: &[ReconciledRecord]) {
        self.reconciled_stations = reconciled.len();
        self.superseded_records = reconciled.iter().map(|r| r.superseded).sum();

        for entry in reconciled {
            let missing = entry.record.missing_parameters(&CORE_PARAMETERS);
            if missing.is_empty() {
                continue;
            }
            for kind in missing {
                *self.missing_fields.entry(kind).or_insert(0) += 1;
            }
            self.incomplete_stations.push(entry.station_id().to_string());
        }
    }

    pub fn dropped_records(&self) -> usize {
        let decode = &self.assembly.decode;
        decode.malformed_records
            + decode.duplicate_reports
            + decode.fatal_decodes
            + self.assembly.outside_request
            + self.derive.fatal_decodes
            + self.derive.unlocated
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();
        let decode = &self.assembly.decode;

        summary.push_str("=== Processing Report ===\n");
        summary.push_str(&format!("Source: {}\n", self.source));
        if let Some(valid_time) = &self.valid_time {
            summary.push_str(&format!("Valid Time: {}\n", valid_time));
        }
        summary.push_str(&format!("Entries Read: {}\n", decode.entries_read));
        summary.push_str(&format!("Records Assembled: {}\n", self.assembled_records));
        summary.push_str(&format!(
            "Stations Reconciled: {} ({} older reports superseded)\n",
            self.reconciled_stations, self.superseded_records
        ));
        if let Some(selected) = self.selected_stations {
            summary.push_str(&format!("Stations Selected: {}\n", selected));
        }
        if self.excluded_incomplete > 0 {
            summary.push_str(&format!(
                "Incomplete Stations Excluded: {}\n",
                self.excluded_incomplete
            ));
        }
        summary.push_str(&format!("Stations Output: {}\n", self.output_stations));

        summary.push_str(&format!("\nDropped: {}\n", self.dropped_records()));
        summary.push_str(&format!("  Malformed reports: {}\n", decode.malformed_records));
        summary.push_str(&format!("  Duplicate reports: {}\n", decode.duplicate_reports));
        summary.push_str(&format!(
            "  Undecodable records: {}\n",
            decode.fatal_decodes + self.derive.fatal_decodes
        ));
        summary.push_str(&format!(
            "  Outside request: {}\n",
            self.assembly.outside_request
        ));
        summary.push_str(&format!("  Unlocated stations: {}\n", self.derive.unlocated));
        if decode.orphaned_groups > 0 {
            summary.push_str(&format!(
                "  Orphaned weather/sky groups: {}\n",
                decode.orphaned_groups
            ));
        }
        if self.derive.implausible_temperatures > 0 {
            summary.push_str(&format!(
                "  Implausible temperatures: {}\n",
                self.derive.implausible_temperatures
            ));
        }

        if !self.missing_fields.is_empty() {
            summary.push_str("\nMissing Fields:\n");
            for (kind, count) in &self.missing_fields {
                summary.push_str(&format!("  {}: {}\n", kind, count));
            }
        }

        if !self.incomplete_stations.is_empty() {
            summary.push_str(&format!(
                "\nIncomplete Stations ({}):\n",
                self.incomplete_stations.len()
            ));
            for station_id in self.incomplete_stations.iter().take(10) {
                summary.push_str(&format!("  {}\n", station_id));
            }
            if self.incomplete_stations.len() > 10 {
                summary.push_str(&format!(
                    "  ... and {} more\n",
                    self.incomplete_stations.len() - 10
                ));
            }
        }

        summary
    }
}
