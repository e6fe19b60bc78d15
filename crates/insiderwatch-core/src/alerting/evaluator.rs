//! Alert rule evaluation

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::models::{AlertEntry, AlertRule, TradeRecord};

use super::repository::RuleSource;

/// Applies a fixed rule set to a record batch
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    rules: Vec<AlertRule>,
}

impl AlertEvaluator {
    /// Create an evaluator over `rules`
    pub fn new(rules: Vec<AlertRule>) -> Self {
        Self { rules }
    }

    /// Load active rules, falling back to `fallback` when the store has none
    /// or cannot be read.
    pub async fn load(source: &dyn RuleSource, fallback: AlertRule) -> Self {
        let rules = match source.active_rules().await {
            Ok(rules) => {
                info!(count = rules.len(), "Found active alert configurations");
                rules
            }
            Err(e) => {
                warn!(error = %e, "Error fetching alert configurations");
                Vec::new()
            }
        };

        let rules = if rules.is_empty() {
            debug!(rule = %fallback.alert_name, "Using default threshold rule");
            vec![fallback]
        } else {
            rules
        };

        info!(count = rules.len(), "Loaded alert configurations");
        Self::new(rules)
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    /// Evaluate the loaded rules against `records`
    pub fn evaluate(&self, records: &[TradeRecord]) -> Vec<AlertEntry> {
        evaluate(records, &self.rules)
    }
}

/// Match every rule against every record and deduplicate the hits.
///
/// Output is ordered by rule, then by record; an entry whose
/// (symbol, person, shares) key was already emitted is skipped.
pub fn evaluate(records: &[TradeRecord], rules: &[AlertRule]) -> Vec<AlertEntry> {
    let mut seen = HashSet::new();
    let mut alerts = Vec::new();

    for rule in rules {
        let before = alerts.len();
        for record in records.iter().filter(|r| rule.matches(r)) {
            let entry = AlertEntry {
                alert_name: rule.alert_name.clone(),
                record: record.clone(),
            };
            if seen.insert(entry.key()) {
                alerts.push(entry);
            }
        }
        debug!(
            rule = %rule.alert_name,
            min_shares = rule.min_shares,
            min_value = ?rule.min_value,
            matched = alerts.len() - before,
            "Evaluated rule"
        );
    }

    info!(count = alerts.len(), "Found alerts matching criteria");
    alerts
}
