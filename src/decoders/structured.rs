use std::mem;
use tracing::{debug, warn};

use super::fields::{decode_number, decode_text, decode_timestamp_millis};
use super::{Decoded, ObservationBatch, ObservationDecoder};
use crate::config::SourceKind;
use crate::error::{ProcessingError, Result};
use crate::models::{AssembledRecord, ObservationEntry, ParameterKind, WindDirection};

/// Collects the multi-valued groups that precede a core entry.
///
/// The data service sends present-weather and sky-layer groups as separate
/// entries ahead of the entry holding the station's single-valued fields.
/// The builder holds them until that entry arrives, then hands them over and
/// starts empty for the next occurrence.
#[derive(Debug, Default)]
pub struct OccurrenceBuilder {
    present_weather: Vec<String>,
    sky_cover: Vec<String>,
    sky_layer_base: Vec<Option<f64>>,
    groups_pending: usize,
}

impl OccurrenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending_groups(&self) -> bool {
        self.groups_pending > 0
    }

    pub fn push_weather(&mut self, code: Option<String>) {
        self.groups_pending += 1;
        if let Some(code) = code {
            self.present_weather.push(code);
        }
    }

    pub fn push_sky_layer(&mut self, cover: Option<String>, base: Option<f64>) {
        self.groups_pending += 1;
        if let Some(cover) = cover {
            self.sky_cover.push(cover);
            self.sky_layer_base.push(base);
        }
    }

    /// Move the collected groups into `record` and reset.
    pub fn attach(&mut self, record: &mut AssembledRecord) {
        record.present_weather = mem::take(&mut self.present_weather);
        record.sky_cover = mem::take(&mut self.sky_cover);
        record.sky_layer_base = mem::take(&mut self.sky_layer_base);
        self.groups_pending = 0;
    }

    /// Drop the collected groups, returning how many there were.
    pub fn discard(&mut self) -> usize {
        let dropped = self.groups_pending;
        *self = Self::default();
        dropped
    }
}

/// Decoder for key-value entries from the observation data service.
#[derive(Debug, Clone, Default)]
pub struct StructuredDecoder;

impl StructuredDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Assemble entries from any source implementing [`ObservationEntry`].
    pub fn decode_entries<I, E>(&self, entries: I, requested: &[ParameterKind]) -> Decoded
    where
        I: IntoIterator<Item = E>,
        E: ObservationEntry,
    {
        let wants = |kind: ParameterKind| requested.contains(&kind);
        let mut decoded = Decoded::default();
        let mut builder = OccurrenceBuilder::new();

        for entry in entries {
            decoded.stats.entries_read += 1;

            if entry.carries(ParameterKind::PresentWeather) {
                let code = wants(ParameterKind::PresentWeather)
                    .then(|| decode_text(&entry.value(ParameterKind::PresentWeather)))
                    .flatten();
                builder.push_weather(code);
                continue;
            }

            if entry.carries(ParameterKind::SkyCover) {
                let cover = wants(ParameterKind::SkyCover)
                    .then(|| decode_text(&entry.value(ParameterKind::SkyCover)))
                    .flatten();
                let base = wants(ParameterKind::SkyLayerBase)
                    .then(|| decode_number(&entry.value(ParameterKind::SkyLayerBase)))
                    .flatten();
                builder.push_sky_layer(cover, base);
                continue;
            }

            match self.decode_core(&entry, requested) {
                Ok(mut record) => {
                    builder.attach(&mut record);
                    decoded.records.push(record);
                }
                Err(e) => {
                    warn!("Skipping observation: {}", e);
                    decoded.stats.fatal_decodes += 1;
                    builder.discard();
                }
            }
        }

        if builder.has_pending_groups() {
            let dropped = builder.discard();
            debug!("{} trailing weather/sky groups had no closing observation", dropped);
            decoded.stats.orphaned_groups += dropped;
        }

        decoded
    }

    /// Decode the single-valued fields of a core entry.
    fn decode_core<E: ObservationEntry>(
        &self,
        entry: &E,
        requested: &[ParameterKind],
    ) -> Result<AssembledRecord> {
        let station_id = decode_text(&entry.value(ParameterKind::StationId)).ok_or_else(|| {
            ProcessingError::FatalDecode {
                station_id: "?".to_string(),
                field: "station id",
                message: "entry carries no station identifier".to_string(),
            }
        })?;

        let observed_at = decode_timestamp_millis(&entry.value(ParameterKind::Time)).ok_or_else(
            || ProcessingError::FatalDecode {
                station_id: station_id.clone(),
                field: "observation time",
                message: format!("unusable value {:?}", entry.value(ParameterKind::Time)),
            },
        )?;

        let mut record = AssembledRecord::new(station_id, observed_at);

        for kind in requested.iter().copied().filter(|k| !k.is_multi_valued() && !k.is_identity()) {
            let raw = entry.value(kind);
            let value = decode_number(&raw);
            if value.is_none() && !raw.is_missing() {
                debug!("{}: {} value {:?} recorded as missing", record.station_id, kind, raw);
            }

            match kind {
                ParameterKind::Latitude => {
                    record.latitude = value.filter(|lat| (-90.0..=90.0).contains(lat))
                }
                ParameterKind::Longitude => {
                    record.longitude = value.filter(|lon| (-180.0..=180.0).contains(lon))
                }
                ParameterKind::Temperature => record.temperature = value,
                ParameterKind::Dewpoint => record.dewpoint = value,
                ParameterKind::WindDirection => {
                    record.wind_direction = value
                        .filter(|deg| (0.0..=360.0).contains(deg))
                        .map(WindDirection::Degrees)
                }
                ParameterKind::WindSpeed => record.wind_speed = value,
                ParameterKind::SeaLevelPressure => record.sea_level_pressure = value,
                _ => {}
            }
        }

        Ok(record)
    }
}

impl ObservationDecoder for StructuredDecoder {
    fn source(&self) -> SourceKind {
        SourceKind::Structured
    }

    fn decode(&self, batch: ObservationBatch, requested: &[ParameterKind]) -> Result<Decoded> {
        match batch {
            ObservationBatch::Structured(entries) => Ok(self.decode_entries(entries, requested)),
            ObservationBatch::Reports(_) => Err(ProcessingError::InvalidFormat(
                "structured decoder was handed METAR report lines".to_string(),
            )),
        }
    }
}
