//! Per-run aggregate counts

use serde::{Deserialize, Serialize};

use super::record::TradeRecord;

/// Counts for one fetch batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records in the batch
    pub total_records: u64,
    /// Canonical acquisitions
    pub acquisitions: u64,
    /// Canonical disposals
    pub disposals: u64,
}

impl RunSummary {
    /// Derive the summary from a record batch
    pub fn from_records(records: &[TradeRecord]) -> Self {
        records.iter().fold(Self::default(), |mut acc, record| {
            acc.total_records += 1;
            if record.acquisition_disposal.is_acquisition() {
                acc.acquisitions += 1;
            } else if record.acquisition_disposal.is_disposal() {
                acc.disposals += 1;
            }
            acc
        })
    }
}
