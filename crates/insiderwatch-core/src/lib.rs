//! # InsiderWatch
//!
//! Daily collector for insider trading disclosures published by BSE.
//!
//! Each run downloads the exchange's disclosure table, reconciles whichever
//! column layout was published into canonical records, flags transactions
//! that cross the configured share thresholds, stores the batch in
//! PostgreSQL, and sends an email and chat report.
//!
//! ## Architecture
//!
//! - **Ingest**: HTTP fetch, HTML table extraction and layout normalization
//! - **Alerting**: threshold rules, evaluation and notification delivery
//! - **Report**: email and chat renderings of a run
//! - **Storage**: PostgreSQL for records and alert rules
//!
//! ## Quick Start
//!
//! ```bash
//! # Apply migrations
//! insiderwatch db migrate
//!
//! # Collect, store and report
//! insiderwatch run
//!
//! # Look at today's table without touching the database
//! insiderwatch preview
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alerting;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod job;
pub mod models;
pub mod report;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{AlertEvaluator, NotificationSender};
    pub use crate::config::Config;
    pub use crate::db::{PostgresPool, TradeRepository};
    pub use crate::error::{Error, Result};
    pub use crate::ingest::{DisclosureFetcher, Normalizer};
    pub use crate::job::{Job, RunOutcome};
    pub use crate::models::*;
}
