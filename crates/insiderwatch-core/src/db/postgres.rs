//! PostgreSQL connection and queries

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{Field, RunSummary, TradeRecord};

use super::RECORDS_TABLE;

/// PostgreSQL connection pool
#[derive(Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Create a new PostgreSQL connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let url = config.connection_url()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&url)
            .await?;

        info!(max_connections = config.max_connections, "Database connection established");
        Ok(Self { pool })
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Destination for normalized records
#[async_trait]
pub trait TradeSink: Send + Sync {
    /// Upsert one batch; the whole batch succeeds or fails together.
    async fn store_batch(&self, records: &[TradeRecord]) -> Result<usize>;

    /// Counts for everything stored under `fetch_date`
    async fn summary_for(&self, fetch_date: NaiveDate) -> Result<RunSummary>;
}

/// Repository for disclosure records
#[derive(Clone)]
pub struct TradeRepository {
    pool: PgPool,
}

impl TradeRepository {
    /// Create a new trade repository
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool.clone(),
        }
    }
}

#[async_trait]
impl TradeSink for TradeRepository {
    async fn store_batch(&self, records: &[TradeRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let placeholders = records[0]
            .fields
            .iter()
            .filter(|f| matches!(f, Field::Column(_)))
            .count();
        if placeholders > 0 {
            warn!(
                columns = placeholders,
                "Generic layout columns have no table column and are not stored"
            );
        }

        let sql = upsert_sql();
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(&sql)
                .bind(record.record_id())
                .bind(optional_text(record.symbol()))
                .bind(optional_text(&record.scrip_code))
                .bind(optional_text(&record.company_name))
                .bind(optional_text(&record.person_name))
                .bind(optional_text(&record.person_category))
                .bind(optional_text(&record.security_type_prior))
                .bind(optional_text(&record.security_type))
                .bind(record.before_shares)
                .bind(record.acquired_shares)
                .bind(record.after_shares)
                .bind(record.securities_value)
                .bind(optional_text(record.acquisition_disposal.as_str()))
                .bind(optional_text(&record.acquisition_mode))
                .bind(record.acquisition_period_from)
                .bind(record.acquisition_period_to)
                .bind(record.acquisition_date)
                .bind(record.intimation_date)
                .bind(optional_text(&record.trading_derivative_type))
                .bind(record.trading_derivative_value)
                .bind(record.fetch_date)
                .bind(&record.source)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(rows = records.len(), "Stored batch");
        Ok(records.len())
    }

    async fn summary_for(&self, fetch_date: NaiveDate) -> Result<RunSummary> {
        let sql = format!(
            r#"
            SELECT
                COUNT(*) AS total_records,
                COUNT(*) FILTER (WHERE acquisition_disposal = 'ACQUISITION') AS acquisitions,
                COUNT(*) FILTER (WHERE acquisition_disposal = 'DISPOSAL') AS disposals
            FROM {RECORDS_TABLE}
            WHERE fetch_date = $1
            "#
        );

        let row = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(fetch_date)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into_summary())
    }
}

/// Column order matches the binds in [`TradeRepository::store_batch`].
const COLUMNS: [&str; 22] = [
    "record_id",
    "symbol",
    "scrip_code",
    "company_name",
    "person_name",
    "person_category",
    "security_type_prior",
    "security_type",
    "before_shares",
    "acquired_shares",
    "after_shares",
    "securities_value",
    "acquisition_disposal",
    "acquisition_mode",
    "acquisition_period_from",
    "acquisition_period_to",
    "acquisition_date",
    "intimation_date",
    "trading_derivative_type",
    "trading_derivative_value",
    "fetch_date",
    "source",
];

fn upsert_sql() -> String {
    let placeholders: Vec<String> = (1..=COLUMNS.len()).map(|i| format!("${i}")).collect();
    let updates: Vec<String> = COLUMNS[1..]
        .iter()
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();

    format!(
        "INSERT INTO {RECORDS_TABLE} ({}) VALUES ({}) \
         ON CONFLICT (record_id) DO UPDATE SET {}, updated_at = NOW()",
        COLUMNS.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    )
}

fn optional_text(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// Database row type for mapping

#[derive(sqlx::FromRow)]
struct SummaryRow {
    total_records: i64,
    acquisitions: i64,
    disposals: i64,
}

impl SummaryRow {
    fn into_summary(self) -> RunSummary {
        RunSummary {
            total_records: count(self.total_records),
            acquisitions: count(self.acquisitions),
            disposals: count(self.disposals),
        }
    }
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}
