//! Database layer for InsiderWatch
//!
//! PostgreSQL holds the normalized disclosures and the alert rules.

mod postgres;

pub use postgres::{PostgresPool, TradeRepository, TradeSink};

/// Table receiving normalized disclosures
pub const RECORDS_TABLE: &str = "insider_trading_data";

/// Table holding alert rules
pub const ALERT_RULES_TABLE: &str = "alert_configurations";
