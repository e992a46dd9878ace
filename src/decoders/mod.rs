pub mod fields;
pub mod metar;
pub mod report;
pub mod structured;

pub use metar::{MetarFragments, MetarParser};
pub use report::MetarDecoder;
pub use structured::{OccurrenceBuilder, StructuredDecoder};

use crate::config::SourceKind;
use crate::error::Result;
use crate::models::{AssembledRecord, ParameterKind, StructuredEntry};

/// Raw input for one run, as read from the observation source.
#[derive(Debug, Clone)]
pub enum ObservationBatch {
    Structured(Vec<StructuredEntry>),
    Reports(Vec<String>),
}

impl ObservationBatch {
    pub fn source(&self) -> SourceKind {
        match self {
            ObservationBatch::Structured(_) => SourceKind::Structured,
            ObservationBatch::Reports(_) => SourceKind::Metar,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ObservationBatch::Structured(entries) => entries.len(),
            ObservationBatch::Reports(lines) => lines.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a decoder dropped on the way, by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub entries_read: usize,
    /// Report lines that broke the grammar.
    pub malformed_records: usize,
    /// Later reports for a station already seen in the same batch.
    pub duplicate_reports: usize,
    /// Records without a usable station id or time.
    pub fatal_decodes: usize,
    /// Weather/sky groups never closed by a core entry.
    pub orphaned_groups: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Decoded {
    pub records: Vec<AssembledRecord>,
    /// First report-group time marker in the batch.
    pub valid_time: Option<String>,
    pub stats: DecodeStats,
}

/// Turns one kind of observation batch into per-occurrence records.
pub trait ObservationDecoder {
    fn source(&self) -> SourceKind;

    fn decode(&self, batch: ObservationBatch, requested: &[ParameterKind]) -> Result<Decoded>;
}
