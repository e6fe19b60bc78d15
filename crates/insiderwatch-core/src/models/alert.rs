//! Alert data models

use serde::{Deserialize, Serialize};

use super::record::TradeRecord;

/// A named threshold configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Human-readable name
    pub alert_name: String,

    /// Minimum absolute number of shares in one transaction
    pub min_shares: f64,

    /// Minimum transaction value, advisory since the source rarely reports it
    pub min_value: Option<f64>,
}

impl AlertRule {
    /// Check whether a record trips this rule.
    ///
    /// The share gate always applies; the value clause is ORed with the share
    /// clause on the records that passed it. Unset share counts never match.
    pub fn matches(&self, record: &TradeRecord) -> bool {
        let Some(shares) = record.acquired_shares else {
            return false;
        };
        let share_hit = shares.abs() >= self.min_shares;
        if !share_hit {
            return false;
        }

        match (self.min_value, record.securities_value) {
            (Some(min_value), Some(value)) if min_value != 0.0 => {
                value >= min_value || share_hit
            }
            _ => true,
        }
    }
}

/// A record that tripped a rule
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEntry {
    /// Name of the rule that matched first
    pub alert_name: String,

    /// The matching transaction
    pub record: TradeRecord,
}

impl AlertEntry {
    /// Dedup key: (symbol, person, share count)
    pub fn key(&self) -> AlertKey {
        AlertKey {
            symbol: self.record.symbol().to_string(),
            person_name: self.record.person_name.clone(),
            acquired_shares: self.record.acquired_shares.map(f64::to_bits),
        }
    }
}

/// Identity of an alert for deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    /// Security identifier
    pub symbol: String,
    /// Reporting insider
    pub person_name: String,
    acquired_shares: Option<u64>,
}
