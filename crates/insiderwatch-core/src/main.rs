//! InsiderWatch CLI
//!
//! Command-line interface for the BSE insider trading collector.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use insiderwatch::alerting::{AlertRepository, NotificationSender, RuleSource};
use insiderwatch::db::{PostgresPool, TradeRepository, TradeSink};
use insiderwatch::ingest::DisclosureFetcher;
use insiderwatch::job::{self, Job, RunOutcome};
use insiderwatch::Config;

/// InsiderWatch - BSE insider trading alerts
#[derive(Parser)]
#[command(name = "insiderwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "INSIDERWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, store and report today's disclosures (default)
    Run {
        /// Apply pending migrations first
        #[arg(long)]
        migrate: bool,
    },

    /// Fetch and evaluate without touching the database or sending anything
    Preview {
        /// Print the chat rendering or the normalized rows
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List active alert rules
    Rules,

    /// Show stored counts for a fetch date
    Summary {
        /// Fetch date (YYYY-MM-DD), today if not specified
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Database management
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Run database migrations
    Migrate,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let _guard = match init_logging(&config, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error initializing logging: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    // Execute command
    let result = match cli.command.unwrap_or(Commands::Run { migrate: false }) {
        Commands::Run { migrate } => run_job(&config, migrate).await,
        Commands::Preview { format } => run_preview(&config, format).await,
        Commands::Rules => run_rules(&config).await,
        Commands::Summary { date } => run_summary(&config, date).await,
        Commands::Db { command } => run_db(&config, command).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.logging.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let stdout = match config.logging.format.as_str() {
        "json" => fmt::layer().json().boxed(),
        _ => fmt::layer().boxed(),
    };

    let (file, guard) = match &config.logging.file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path)?);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stdout)
        .with(file)
        .with(filter)
        .init();

    Ok(guard)
}

fn file_appender(path: &Path) -> anyhow::Result<tracing_appender::rolling::RollingFileAppender> {
    let name = path
        .file_name()
        .with_context(|| format!("log file path has no file name: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(tracing_appender::rolling::never(dir, name))
}

async fn run_job(config: &Config, migrate: bool) -> anyhow::Result<()> {
    config
        .validate_for_run()
        .context("configuration is incomplete for a run")?;

    let pool = PostgresPool::new(&config.database).await?;
    if migrate {
        pool.migrate().await?;
    }

    let sink = TradeRepository::new(&pool);
    let rules = AlertRepository::new(&pool, config.alerting.min_shares);
    let fetcher = DisclosureFetcher::new(&config.fetch)?;
    let notifications = NotificationSender::from_config(&config.email, &config.telegram)?;
    info!(channels = ?notifications.channels(), "Notification channels ready");

    let job = Job::new(config, &fetcher, &rules, &sink, &notifications);
    match job.run(config.now()).await? {
        RunOutcome::NoData => info!("No disclosures to process"),
        RunOutcome::Completed(report) => {
            let failed: Vec<_> = report
                .notifications
                .iter()
                .filter(|n| !n.success)
                .map(|n| n.channel_type.as_str())
                .collect();
            if !failed.is_empty() {
                warn!(channels = ?failed, "Some notifications were not delivered");
            }
        }
    }

    Ok(())
}

async fn run_preview(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let fetcher = DisclosureFetcher::new(&config.fetch)?;

    let Some(preview) = job::preview(config, &fetcher, config.now()).await? else {
        println!("No disclosures available");
        return Ok(());
    };

    match format {
        OutputFormat::Text => println!("{}", preview.report.chat),
        OutputFormat::Json => {
            let rows: Vec<_> = preview.records.iter().map(|r| r.to_row()).collect();
            let output = serde_json::json!({
                "summary": preview.summary,
                "alerts": preview.alerts.len(),
                "records": rows,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

async fn run_rules(config: &Config) -> anyhow::Result<()> {
    let pool = PostgresPool::new(&config.database).await?;
    let rules = AlertRepository::new(&pool, config.alerting.min_shares)
        .active_rules()
        .await?;

    if rules.is_empty() {
        let fallback = config.alerting.default_rule();
        println!("No active rules; the default applies:");
        print_rule(&fallback);
    } else {
        println!("{} active rule(s):", rules.len());
        rules.iter().for_each(print_rule);
    }
    Ok(())
}

fn print_rule(rule: &insiderwatch::models::AlertRule) {
    let value = rule
        .min_value
        .map_or_else(|| "-".to_string(), |v| format!("{v:.0}"));
    println!(
        "  {:<32} min_shares={:<12.0} min_value={}",
        rule.alert_name, rule.min_shares, value
    );
}

async fn run_summary(config: &Config, date: Option<NaiveDate>) -> anyhow::Result<()> {
    let date = date.unwrap_or_else(|| config.now().date_naive());
    let pool = PostgresPool::new(&config.database).await?;
    let summary = TradeRepository::new(&pool).summary_for(date).await?;

    println!("Insider trading summary for {date}");
    println!("  Total:        {}", summary.total_records);
    println!("  Acquisitions: {}", summary.acquisitions);
    println!("  Disposals:    {}", summary.disposals);
    Ok(())
}

async fn run_db(config: &Config, command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Migrate => {
            let pool = PostgresPool::new(&config.database).await?;
            pool.migrate().await?;
            println!("Migrations applied");
        }
    }
    Ok(())
}
