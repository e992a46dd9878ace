use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::SourceKind;
use crate::decoders::ObservationBatch;
use crate::error::{ProcessingError, Result};
use crate::models::StructuredEntry;

/// Reads one observation batch from disk in the layout of its source.
pub struct ObservationReader {
    source: SourceKind,
}

impl ObservationReader {
    pub fn new(source: SourceKind) -> Self {
        Self { source }
    }

    pub fn read_batch(&self, path: &Path) -> Result<ObservationBatch> {
        let text = read_text(path)?;
        let batch = match self.source {
            SourceKind::Structured => ObservationBatch::Structured(parse_json_lines(&text)),
            SourceKind::Metar => ObservationBatch::Reports(parse_report_lines(&text)),
        };

        info!(
            "Read {} {} entries from {}",
            batch.len(),
            self.source,
            path.display()
        );
        Ok(batch)
    }
}

/// Read a text file, falling back to Windows-1252 when it is not UTF-8.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| {
        ProcessingError::MissingData(format!("cannot read {}: {}", path.display(), e))
    })?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            Ok(text.into_owned())
        }
    }
}

/// One JSON object per line; lines that are not objects are skipped.
pub fn parse_json_lines(text: &str) -> Vec<StructuredEntry> {
    let mut entries = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<StructuredEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!("Skipping line {}: {}", index + 1, e),
        }
    }

    entries
}

/// Non-empty lines, trimmed. Marker and report lines are told apart by the decoder.
pub fn parse_report_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Station ids to request: the first column of each line.
pub fn read_site_list(path: &Path) -> Result<Vec<String>> {
    let text = read_text(path)?;
    let sites: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().next())
        .map(|id| id.to_ascii_uppercase())
        .collect();

    if sites.is_empty() {
        return Err(ProcessingError::MissingData(format!(
            "site list {} names no stations",
            path.display()
        )));
    }

    info!("Requesting {} sites from {}", sites.len(), path.display());
    Ok(sites)
}
