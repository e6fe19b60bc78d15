//! Daily collection job
//!
//! One invocation loads the alert rules, fetches and normalizes the
//! disclosure table, flags significant trades, stores the batch and sends
//! the report. Every collaborator sits behind a trait so the sequence can be
//! driven with in-memory stand-ins.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::alerting::{AlertEvaluator, NotificationResult, NotificationSender, RuleSource};
use crate::config::Config;
use crate::db::TradeSink;
use crate::error::Result;
use crate::ingest::{DisclosureSource, Normalizer};
use crate::models::{AlertEntry, RunSummary, TradeRecord};
use crate::report::{render, Report, ReportContext};

/// How a run ended
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Nothing to process; not an error
    NoData,
    /// Every step ran
    Completed(RunReport),
}

/// What a completed run did
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Id carried by the run's log span
    pub run_id: Uuid,
    /// Date the batch was fetched, in the report time zone
    pub fetch_date: NaiveDate,
    /// Counts of the fetched batch
    pub summary: RunSummary,
    /// Number of alert entries reported
    pub alerts: usize,
    /// Records written by successful batches
    pub stored_records: usize,
    /// Batches committed
    pub stored_batches: usize,
    /// Batches rolled back
    pub failed_batches: usize,
    /// One result per notification channel, in send order
    pub notifications: Vec<NotificationResult>,
}

/// Output of a dry run that touches no store and sends nothing
#[derive(Debug, Clone)]
pub struct Preview {
    /// Normalized records
    pub records: Vec<TradeRecord>,
    /// Matches against the default rule
    pub alerts: Vec<AlertEntry>,
    /// Counts of the records
    pub summary: RunSummary,
    /// Renderings that a full run would send
    pub report: Report,
}

/// The collection job and its collaborators
pub struct Job<'a> {
    config: &'a Config,
    source: &'a dyn DisclosureSource,
    rules: &'a dyn RuleSource,
    sink: &'a dyn TradeSink,
    notifications: &'a NotificationSender,
}

impl<'a> Job<'a> {
    /// Wire a job to its collaborators
    pub fn new(
        config: &'a Config,
        source: &'a dyn DisclosureSource,
        rules: &'a dyn RuleSource,
        sink: &'a dyn TradeSink,
        notifications: &'a NotificationSender,
    ) -> Self {
        Self {
            config,
            source,
            rules,
            sink,
            notifications,
        }
    }

    /// Run every step once, treating `now` as the current time.
    ///
    /// A failed fetch or an empty table ends the run early with
    /// [`RunOutcome::NoData`]. Storage and notification failures are logged
    /// and counted in the report; other errors abort the run.
    pub async fn run(&self, now: DateTime<FixedOffset>) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        self.run_steps(run_id, now).instrument(span).await
    }

    async fn run_steps(&self, run_id: Uuid, now: DateTime<FixedOffset>) -> Result<RunOutcome> {
        info!("Starting insider trading collection");
        let fetch_date = now.date_naive();

        let evaluator =
            AlertEvaluator::load(self.rules, self.config.alerting.default_rule()).await;

        let Some(records) = collect(self.source, fetch_date).await? else {
            warn!("No data fetched, ending run");
            return Ok(RunOutcome::NoData);
        };

        let alerts = evaluator.evaluate(&records);

        let (stored_records, stored_batches, failed_batches) = self.persist(&records).await;

        let summary = self.summary(fetch_date, &records).await;
        info!(
            total = summary.total_records,
            acquisitions = summary.acquisitions,
            disposals = summary.disposals,
            "Run summary"
        );

        let ctx = ReportContext::from_config(self.config, now);
        let report = render(&summary, &alerts, &ctx);
        let notifications = self.notifications.send_all(&report).await;

        let outcome = RunReport {
            run_id,
            fetch_date,
            summary,
            alerts: alerts.len(),
            stored_records,
            stored_batches,
            failed_batches,
            notifications,
        };
        info!(
            records = records.len(),
            alerts = outcome.alerts,
            stored = outcome.stored_records,
            failed_batches = outcome.failed_batches,
            notified = outcome.notifications.iter().filter(|n| n.success).count(),
            "Run completed"
        );
        Ok(RunOutcome::Completed(outcome))
    }

    /// Store `records` in sequential batches, continuing past failures.
    async fn persist(&self, records: &[TradeRecord]) -> (usize, usize, usize) {
        let batch_size = self.config.database.batch_size.max(1);
        let mut stored = 0;
        let mut ok_batches = 0;
        let mut failed_batches = 0;

        for (index, batch) in records.chunks(batch_size).enumerate() {
            match self.sink.store_batch(batch).await {
                Ok(n) => {
                    stored += n;
                    ok_batches += 1;
                }
                Err(e) => {
                    failed_batches += 1;
                    error!(batch = index, rows = batch.len(), error = %e, "Failed to store batch");
                }
            }
        }

        info!(
            stored,
            batches = ok_batches + failed_batches,
            failed_batches,
            "Stored records"
        );
        (stored, ok_batches, failed_batches)
    }

    /// Counts of the fetched batch. The stored day total is only compared
    /// against it, since earlier runs the same day also land in the store.
    async fn summary(&self, fetch_date: NaiveDate, records: &[TradeRecord]) -> RunSummary {
        let summary = RunSummary::from_records(records);
        match self.sink.summary_for(fetch_date).await {
            Ok(stored) if stored != summary => info!(
                stored_total = stored.total_records,
                batch_total = summary.total_records,
                "Stored day total differs from fetched batch"
            ),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Summary query failed"),
        }
        summary
    }
}

/// Fetch and normalize today's table.
///
/// `Ok(None)` when the fetch failed or produced no records.
pub async fn collect(
    source: &dyn DisclosureSource,
    fetch_date: NaiveDate,
) -> Result<Option<Vec<TradeRecord>>> {
    let table = match source.fetch().await {
        Ok(Some(table)) => table,
        Ok(None) => return Ok(None),
        Err(e) => {
            error!(error = %e, "Error fetching disclosures");
            return Ok(None);
        }
    };

    let records = Normalizer::new(fetch_date).normalize(&table)?;
    if records.is_empty() {
        return Ok(None);
    }
    Ok(Some(records))
}

/// Fetch, normalize and evaluate against the configured default rule
/// without storing or sending anything.
pub async fn preview(
    config: &Config,
    source: &dyn DisclosureSource,
    now: DateTime<FixedOffset>,
) -> Result<Option<Preview>> {
    let Some(records) = collect(source, now.date_naive()).await? else {
        return Ok(None);
    };

    let evaluator = AlertEvaluator::new(vec![config.alerting.default_rule()]);
    let alerts = evaluator.evaluate(&records);
    let summary = RunSummary::from_records(&records);
    let report = render(&summary, &alerts, &ReportContext::from_config(config, now));

    Ok(Some(Preview {
        records,
        alerts,
        summary,
        report,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::{NotificationError, Notifier};
    use crate::error::Error;
    use crate::ingest::RawTable;
    use crate::models::AlertRule;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(330 * 60)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 18, 18, 0, 0)
            .unwrap()
    }

    fn legacy_row(code: &str, person: &str, kind: &str, shares: &str) -> Vec<Option<String>> {
        let company = format!("Company {code}");
        [
            code,
            company.as_str(),
            person,
            "Promoter",
            "Equity Shares",
            kind,
            "1,000,000",
            shares,
            "1,150,000",
            "14/10/2026",
            "16/10/2026",
            "Market Purchase",
        ]
        .iter()
        .map(|s| Some(s.to_string()))
        .collect()
    }

    fn table() -> RawTable {
        RawTable::positional(vec![
            legacy_row("500325", "X", "Acquisition", "150,000"),
            legacy_row("500326", "Y", "Disposal", "-20,000"),
            legacy_row("500327", "Z", "Sell", "-400,000"),
        ])
    }

    enum FakeSource {
        Table(RawTable),
        Empty,
        Failing,
    }

    #[async_trait]
    impl DisclosureSource for FakeSource {
        async fn fetch(&self) -> Result<Option<RawTable>> {
            match self {
                Self::Table(t) => Ok(Some(t.clone())),
                Self::Empty => Ok(None),
                Self::Failing => Err(Error::fetch("connection reset")),
            }
        }
    }

    struct NoRules;

    #[async_trait]
    impl RuleSource for NoRules {
        async fn active_rules(&self) -> Result<Vec<AlertRule>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        batches: Mutex<Vec<usize>>,
        fail_batch: Option<usize>,
        summary: Option<RunSummary>,
    }

    #[async_trait]
    impl TradeSink for MemorySink {
        async fn store_batch(&self, records: &[TradeRecord]) -> Result<usize> {
            let mut batches = self.batches.lock().unwrap();
            let index = batches.len();
            batches.push(records.len());
            if self.fail_batch == Some(index) {
                return Err(Error::config("duplicate key"));
            }
            Ok(records.len())
        }

        async fn summary_for(&self, _fetch_date: NaiveDate) -> Result<RunSummary> {
            self.summary.ok_or_else(|| Error::config("no summary"))
        }
    }

    struct Recording {
        name: &'static str,
        sent: Arc<Mutex<Vec<(&'static str, Report)>>>,
    }

    #[async_trait]
    impl Notifier for Recording {
        fn channel(&self) -> &'static str {
            self.name
        }

        async fn deliver(&self, report: &Report) -> std::result::Result<(), NotificationError> {
            self.sent.lock().unwrap().push((self.name, report.clone()));
            Ok(())
        }
    }

    type Sent = Arc<Mutex<Vec<(&'static str, Report)>>>;

    fn sender() -> (NotificationSender, Sent) {
        let sent: Sent = Arc::default();
        let sender = NotificationSender::new(vec![
            Box::new(Recording {
                name: "email",
                sent: sent.clone(),
            }),
            Box::new(Recording {
                name: "telegram",
                sent: sent.clone(),
            }),
        ]);
        (sender, sent)
    }

    fn completed(outcome: RunOutcome) -> RunReport {
        match outcome {
            RunOutcome::Completed(report) => report,
            RunOutcome::NoData => panic!("expected a completed run"),
        }
    }

    #[tokio::test]
    async fn test_full_run_stores_alerts_and_notifies_in_order() {
        let config = Config::default();
        let source = FakeSource::Table(table());
        let sink = MemorySink::default();
        let (sender, sent) = sender();

        let job = Job::new(&config, &source, &NoRules, &sink, &sender);
        let report = completed(job.run(now()).await.unwrap());

        assert_eq!(report.fetch_date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(
            report.summary,
            RunSummary {
                total_records: 3,
                acquisitions: 1,
                disposals: 2,
            }
        );
        assert_eq!(report.alerts, 2);
        assert_eq!(report.stored_records, 3);
        assert_eq!(report.failed_batches, 0);

        let sent = sent.lock().unwrap();
        let channels: Vec<_> = sent.iter().map(|(name, _)| *name).collect();
        assert_eq!(channels, vec!["email", "telegram"]);
        assert!(sent[0]
            .1
            .email
            .subject
            .starts_with("🚨 INSIDER TRADING ALERT - 2 Significant Transactions"));
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_the_rest() {
        let mut config = Config::default();
        config.database.batch_size = 1;
        let source = FakeSource::Table(table());
        let sink = MemorySink {
            fail_batch: Some(1),
            ..MemorySink::default()
        };
        let (sender, _) = sender();

        let job = Job::new(&config, &source, &NoRules, &sink, &sender);
        let report = completed(job.run(now()).await.unwrap());

        assert_eq!(*sink.batches.lock().unwrap(), vec![1, 1, 1]);
        assert_eq!(report.stored_batches, 2);
        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.stored_records, 2);
        assert_eq!(report.notifications.len(), 2);
    }

    #[tokio::test]
    async fn test_summary_counts_the_fetched_batch() {
        let config = Config::default();
        let source = FakeSource::Table(table());
        let sink = MemorySink {
            summary: Some(RunSummary {
                total_records: 10,
                acquisitions: 6,
                disposals: 4,
            }),
            ..MemorySink::default()
        };
        let (sender, sent) = sender();

        let job = Job::new(&config, &source, &NoRules, &sink, &sender);
        let report = completed(job.run(now()).await.unwrap());
        assert_eq!(
            report.summary,
            RunSummary {
                total_records: 3,
                acquisitions: 1,
                disposals: 2,
            }
        );

        let sent = sent.lock().unwrap();
        assert!(sent[0].1.email.text.contains("Total Transactions: 3\n"));
        assert!(sent[1].1.chat.contains("Total: 3 transactions"));
    }

    #[tokio::test]
    async fn test_fetch_failure_ends_run_without_side_effects() {
        let config = Config::default();
        let sink = MemorySink::default();
        let (sender, sent) = sender();

        for source in [FakeSource::Failing, FakeSource::Empty] {
            let job = Job::new(&config, &source, &NoRules, &sink, &sender);
            assert!(matches!(job.run(now()).await.unwrap(), RunOutcome::NoData));
        }

        assert!(sink.batches.lock().unwrap().is_empty());
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_header_only_table_is_no_data() {
        let config = Config::default();
        let mut header = legacy_row("Scrip Code", "Name", "Type", "Shares");
        header[1] = Some("Company Name".to_string());
        let source = FakeSource::Table(RawTable::positional(vec![header]));
        let sink = MemorySink::default();
        let (sender, _) = sender();

        let job = Job::new(&config, &source, &NoRules, &sink, &sender);
        assert!(matches!(job.run(now()).await.unwrap(), RunOutcome::NoData));
    }

    #[tokio::test]
    async fn test_preview_uses_default_rule() {
        let mut config = Config::default();
        config.alerting.min_shares = 300_000.0;
        let source = FakeSource::Table(table());

        let preview = preview(&config, &source, now()).await.unwrap().expect("data");
        assert_eq!(preview.records.len(), 3);
        assert_eq!(preview.alerts.len(), 1);
        assert_eq!(preview.alerts[0].record.symbol(), "500327");
        assert!(preview.report.chat.contains("*🚨 1 SIGNIFICANT ALERTS*"));
    }
}
