//! Alert rule storage

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{PostgresPool, ALERT_RULES_TABLE};
use crate::error::Result;
use crate::models::AlertRule;

/// Source of active alert rules
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Active rules in evaluation order
    async fn active_rules(&self) -> Result<Vec<AlertRule>>;
}

/// Repository for alert rules kept in PostgreSQL
#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
    default_min_shares: f64,
}

impl AlertRepository {
    /// Create a new alert repository.
    ///
    /// Rows with no share threshold take `default_min_shares`.
    pub fn new(pool: &PostgresPool, default_min_shares: f64) -> Self {
        Self {
            pool: pool.pool().clone(),
            default_min_shares,
        }
    }
}

#[async_trait]
impl RuleSource for AlertRepository {
    async fn active_rules(&self) -> Result<Vec<AlertRule>> {
        let query = format!(
            r#"
            SELECT
                alert_name,
                CAST(min_shares AS DOUBLE PRECISION) AS min_shares,
                CAST(min_value AS DOUBLE PRECISION) AS min_value
            FROM {ALERT_RULES_TABLE}
            WHERE is_active = true
            ORDER BY id
            "#
        );

        let rows = sqlx::query_as::<_, AlertRuleRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_rule(self.default_min_shares))
            .collect())
    }
}

// Database row type for mapping

#[derive(sqlx::FromRow)]
struct AlertRuleRow {
    alert_name: Option<String>,
    min_shares: Option<f64>,
    min_value: Option<f64>,
}

impl AlertRuleRow {
    fn into_rule(self, default_min_shares: f64) -> AlertRule {
        AlertRule {
            alert_name: self
                .alert_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Threshold Alert".to_string()),
            min_shares: self.min_shares.unwrap_or(default_min_shares),
            min_value: self.min_value,
        }
    }
}
