use std::collections::BTreeMap;
use tracing::info;

use crate::models::{AssembledRecord, ReconciledRecord};

/// Keeps the most recent observation of each station.
#[derive(Debug, Clone, Default)]
pub struct RecencyReducer;

impl RecencyReducer {
    pub fn new() -> Self {
        Self
    }

    /// One record per station id, ordered by station id.
    ///
    /// Records with equal timestamps keep input order, so the first one seen wins.
    pub fn reduce(&self, mut records: Vec<AssembledRecord>) -> Vec<ReconciledRecord> {
        let input_len = records.len();

        // sort_by is stable
        records.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));

        let mut latest: BTreeMap<String, ReconciledRecord> = BTreeMap::new();
        for record in records {
            match latest.get_mut(&record.station_id) {
                Some(kept) => kept.superseded += 1,
                None => {
                    latest.insert(
                        record.station_id.clone(),
                        ReconciledRecord {
                            record,
                            superseded: 0,
                        },
                    );
                }
            }
        }

        info!(
            "Reduced {} records to {} stations",
            input_len,
            latest.len()
        );

        latest.into_values().collect()
    }
}
