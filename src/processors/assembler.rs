use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::config::SourceKind;
use crate::decoders::{
    DecodeStats, MetarDecoder, ObservationBatch, ObservationDecoder, StructuredDecoder,
};
use crate::error::{ProcessingError, Result};
use crate::models::{AssembledRecord, ParameterKind};

/// Inclusive observation-time range of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(ProcessingError::Config(format!(
                "time window starts ({}) after it ends ({})",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// From the top of the hour `lag_hours` before `now` up to the last second
    /// of the previous full hour. Recent hours are often still filling in at
    /// the data service, hence the lag.
    pub fn trailing(now: DateTime<Utc>, lag_hours: i64) -> Self {
        let top_of_hour = now
            .date_naive()
            .and_hms_opt(now.hour(), 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or(now);

        Self {
            start: top_of_hour - Duration::hours(lag_hours.max(1)),
            end: top_of_hour - Duration::seconds(1),
        }
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Parameters, time window and stations a run asks the source for.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRequest {
    pub parameters: Vec<ParameterKind>,
    pub window: Option<TimeWindow>,
    pub stations: Option<HashSet<String>>,
}

impl ObservationRequest {
    pub fn new(parameters: Vec<ParameterKind>) -> Self {
        Self {
            parameters,
            window: None,
            stations: None,
        }
    }

    pub fn all_parameters() -> Self {
        Self::new(ParameterKind::all())
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_stations<I, S>(mut self, stations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stations = Some(stations.into_iter().map(Into::into).collect());
        self
    }

    pub fn admits(&self, record: &AssembledRecord) -> bool {
        let in_window = self
            .window
            .map_or(true, |window| window.contains(record.observed_at));
        let listed = self
            .stations
            .as_ref()
            .map_or(true, |stations| stations.contains(&record.station_id));
        in_window && listed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub decode: DecodeStats,
    /// Records outside the requested window or station list.
    pub outside_request: usize,
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub source: SourceKind,
    pub records: Vec<AssembledRecord>,
    pub valid_time: Option<String>,
    pub stats: AssemblyStats,
}

/// Builds per-occurrence records from a batch with the configured decoder.
pub struct ObservationAssembler {
    decoder: Box<dyn ObservationDecoder>,
    request: ObservationRequest,
}

impl ObservationAssembler {
    pub fn new(decoder: Box<dyn ObservationDecoder>, request: ObservationRequest) -> Self {
        Self { decoder, request }
    }

    /// Pick the decoder for `source`. `reference` dates METAR reports when the
    /// batch has no timestamp marker.
    pub fn for_source(
        source: SourceKind,
        request: ObservationRequest,
        reference: NaiveDateTime,
    ) -> Result<Self> {
        let decoder: Box<dyn ObservationDecoder> = match source {
            SourceKind::Structured => Box::new(StructuredDecoder::new()),
            SourceKind::Metar => Box::new(MetarDecoder::new(reference)?),
        };
        Ok(Self::new(decoder, request))
    }

    pub fn source(&self) -> SourceKind {
        self.decoder.source()
    }

    pub fn request(&self) -> &ObservationRequest {
        &self.request
    }

    pub fn assemble(&self, batch: ObservationBatch) -> Result<Assembly> {
        if batch.source() != self.decoder.source() {
            return Err(ProcessingError::Config(format!(
                "{} decoder configured but the batch holds {} data",
                self.decoder.source(),
                batch.source()
            )));
        }

        let decoded = self.decoder.decode(batch, &self.request.parameters)?;

        let mut stats = AssemblyStats {
            decode: decoded.stats,
            outside_request: 0,
        };

        let mut records = Vec::with_capacity(decoded.records.len());
        for record in decoded.records {
            if self.request.admits(&record) {
                records.push(record);
            } else {
                debug!(
                    "{} at {} is outside the request",
                    record.station_id, record.observed_at
                );
                stats.outside_request += 1;
            }
        }

        info!(
            "Assembled {} records from {} {} entries ({} outside request)",
            records.len(),
            stats.decode.entries_read,
            self.decoder.source(),
            stats.outside_request
        );

        Ok(Assembly {
            source: self.decoder.source(),
            records,
            valid_time: decoded.valid_time,
            stats,
        })
    }
}
