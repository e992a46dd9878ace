use chrono::NaiveDateTime;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::fields::{decode_direction_token, decode_fragment};
use super::metar::{resolve_report_time, MetarFragments, MetarParser};
use super::{Decoded, ObservationBatch, ObservationDecoder};
use crate::config::SourceKind;
use crate::error::{ProcessingError, Result};
use crate::models::{AssembledRecord, ParameterKind, WindDirection};
use crate::utils::constants::VALID_TIME_FORMAT;

/// Decoder for METAR text: timestamp marker lines and one report per line.
pub struct MetarDecoder {
    parser: MetarParser,
    /// Used to date reports when the batch has no usable marker line.
    fallback_reference: NaiveDateTime,
}

impl MetarDecoder {
    pub fn new(fallback_reference: NaiveDateTime) -> Result<Self> {
        Ok(Self {
            parser: MetarParser::new()?,
            fallback_reference,
        })
    }

    pub fn decode_lines<I, S>(&self, lines: I, requested: &[ParameterKind]) -> Decoded
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut decoded = Decoded::default();
        let mut reference = self.fallback_reference;
        let mut seen: HashSet<String> = HashSet::new();

        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }

            // Report-group timestamp marker, e.g. "2024/01/15 18:00"
            if line.starts_with('2') {
                if decoded.valid_time.is_none() {
                    match NaiveDateTime::parse_from_str(line, VALID_TIME_FORMAT) {
                        Ok(marker) => reference = marker,
                        Err(e) => debug!("Marker '{}' is not a timestamp: {}", line, e),
                    }
                    decoded.valid_time = Some(line.to_string());
                }
                continue;
            }

            decoded.stats.entries_read += 1;

            let fragments = match self.parser.parse(line) {
                Ok(fragments) => fragments,
                Err(e) => {
                    debug!("Skipping report '{}': {}", line, e);
                    decoded.stats.malformed_records += 1;
                    continue;
                }
            };

            if seen.contains(&fragments.station_id) {
                debug!("Duplicate report for {} ignored", fragments.station_id);
                decoded.stats.duplicate_reports += 1;
                continue;
            }

            match self.build_record(fragments, reference, requested) {
                Ok(record) => {
                    seen.insert(record.station_id.clone());
                    decoded.records.push(record);
                }
                Err(e) => {
                    warn!("Skipping report: {}", e);
                    decoded.stats.fatal_decodes += 1;
                }
            }
        }

        decoded
    }

    fn build_record(
        &self,
        fragments: MetarFragments,
        reference: NaiveDateTime,
        requested: &[ParameterKind],
    ) -> Result<AssembledRecord> {
        let observed_at =
            resolve_report_time(reference, fragments.day, fragments.hour, fragments.minute)
                .ok_or_else(|| ProcessingError::FatalDecode {
                    station_id: fragments.station_id.clone(),
                    field: "observation time",
                    message: format!(
                        "day/time group {:02}{:02}{:02}Z does not fit {}",
                        fragments.day, fragments.hour, fragments.minute, reference
                    ),
                })?;

        let wants = |kind: ParameterKind| requested.contains(&kind);
        let numeric = |kind: ParameterKind, fragment: &Option<String>| {
            if !wants(kind) {
                return None;
            }
            let value = fragment.as_deref().and_then(|f| decode_fragment(kind, f));
            if value.is_none() {
                debug!("{}: {} fragment {:?} recorded as missing", fragments.station_id, kind, fragment);
            }
            value
        };

        let mut record = AssembledRecord::new(fragments.station_id.clone(), observed_at);
        record.temperature = numeric(ParameterKind::Temperature, &fragments.temperature);
        record.dewpoint = numeric(ParameterKind::Dewpoint, &fragments.dewpoint);
        record.wind_speed = numeric(ParameterKind::WindSpeed, &fragments.wind_speed);
        record.sea_level_pressure =
            numeric(ParameterKind::SeaLevelPressure, &fragments.sea_level_pressure);

        if wants(ParameterKind::WindDirection) {
            record.wind_direction = fragments
                .wind_direction
                .as_deref()
                .and_then(decode_direction_token)
                .map(WindDirection::Compass);
        }
        if wants(ParameterKind::PresentWeather) {
            record.present_weather = fragments.present_weather;
        }
        if wants(ParameterKind::SkyCover) {
            record.sky_cover = fragments.sky_cover;
            if wants(ParameterKind::SkyLayerBase) {
                record.sky_layer_base = fragments.sky_layer_base;
            } else {
                record.sky_layer_base = vec![None; record.sky_cover.len()];
            }
        }

        Ok(record)
    }
}

impl ObservationDecoder for MetarDecoder {
    fn source(&self) -> SourceKind {
        SourceKind::Metar
    }

    fn decode(&self, batch: ObservationBatch, requested: &[ParameterKind]) -> Result<Decoded> {
        match batch {
            ObservationBatch::Reports(lines) => Ok(self.decode_lines(lines, requested)),
            ObservationBatch::Structured(_) => Err(ProcessingError::InvalidFormat(
                "METAR decoder was handed structured entries".to_string(),
            )),
        }
    }
}
