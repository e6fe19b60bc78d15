//! Report rendering for the email and chat channels
//!
//! Both renderers are pure: they take the run summary, the alert list and a
//! [`ReportContext`] and return text. Nothing here touches the network.

mod chat;
mod email;
mod format;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::config::Config;
use crate::models::{AlertEntry, RunSummary, TransactionType};

pub use chat::{render_chat, CHAT_FOOTER_ALLOWANCE};
pub use email::{render_email, EmailReport};
pub use format::{escape_html, escape_markdown, format_shares, truncate_chars};

/// Neutral line used when no rule matched.
pub const NO_ALERTS_MESSAGE: &str =
    "No significant insider trading activity matching your alert criteria";

/// Everything the renderers need besides the data itself
#[derive(Debug, Clone)]
pub struct ReportContext {
    /// Generation time in the report time zone
    pub generated_at: DateTime<FixedOffset>,
    /// Label printed after timestamps
    pub timezone_label: String,
    /// Default share threshold shown in the email footer
    pub min_shares_threshold: f64,
    /// Chat message budget in characters
    pub chat_budget: usize,
}

impl ReportContext {
    /// Build a context from configuration at `generated_at`
    pub fn from_config(config: &Config, generated_at: DateTime<FixedOffset>) -> Self {
        Self {
            generated_at,
            timezone_label: config.report.timezone_label.clone(),
            min_shares_threshold: config.alerting.min_shares,
            chat_budget: config.report.chat_budget,
        }
    }

    /// `18 October 2026`
    pub fn date_label(&self) -> String {
        self.generated_at.format("%d %B %Y").to_string()
    }

    /// `18 October 2026, 09:30 AM IST`
    pub fn timestamp_label(&self) -> String {
        format!(
            "{} {}",
            self.generated_at.format("%d %B %Y, %I:%M %p"),
            self.timezone_label
        )
    }
}

/// Rendered output for every channel
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Email subject and bodies
    pub email: EmailReport,
    /// Telegram Markdown message
    pub chat: String,
}

/// Render the email and chat reports in one pass
pub fn render(summary: &RunSummary, alerts: &[AlertEntry], ctx: &ReportContext) -> Report {
    Report {
        email: render_email(summary, alerts, ctx),
        chat: render_chat(summary, alerts, ctx),
    }
}

fn display_type(kind: &TransactionType) -> &str {
    match kind {
        TransactionType::Unset => "UNKNOWN",
        other => other.as_str(),
    }
}
