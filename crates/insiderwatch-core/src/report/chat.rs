//! Telegram chat report

use crate::models::{AlertEntry, RunSummary};

use super::format::{display_mode, escape_markdown, format_optional_shares, truncate_chars};
use super::{display_type, ReportContext};

/// Room reserved past the budget for the truncation line and footer.
pub const CHAT_FOOTER_ALLOWANCE: usize = 128;

const COMPANY_WIDTH: usize = 30;
const FOOTER: &str = "_Check email for detailed report_";

/// Render the chat message.
///
/// Alert blocks are appended while they fit in `ctx.chat_budget`; the rest
/// are summarized as a count.
pub fn render_chat(summary: &RunSummary, alerts: &[AlertEntry], ctx: &ReportContext) -> String {
    let mut message = format!(
        "*📊 Insider Trading Report (BSE)*\n_{}_\n\n\
         Total: {} transactions\n🟢 Acquisitions: {}\n🔴 Disposals: {}\n\n",
        ctx.date_label(),
        summary.total_records,
        summary.acquisitions,
        summary.disposals
    );
    let mut length = message.chars().count();

    if !alerts.is_empty() {
        let headline = format!("*🚨 {} SIGNIFICANT ALERTS*\n\n", alerts.len());
        length += headline.chars().count();
        message.push_str(&headline);

        for (i, alert) in alerts.iter().enumerate() {
            let block = alert_block(alert);
            let block_len = block.chars().count();
            if length + block_len > ctx.chat_budget {
                let remaining = alerts.len() - i;
                message.push_str(&format!(
                    "_...and {remaining} more alerts (check email)_\n\n"
                ));
                break;
            }
            length += block_len;
            message.push_str(&block);
        }
    }

    message.push_str(FOOTER);
    message
}

fn alert_block(alert: &AlertEntry) -> String {
    let record = &alert.record;
    let emoji = if record.acquisition_disposal.is_acquisition() {
        "🟢"
    } else {
        "🔴"
    };
    format!(
        "{emoji} *{}*\n   {}\n   {}: {} shares\n   Mode: {}\n\n",
        escape_markdown(truncate_chars(&record.company_name, COMPANY_WIDTH)),
        escape_markdown(&record.person_name),
        escape_markdown(display_type(&record.acquisition_disposal)),
        format_optional_shares(record.acquired_shares),
        escape_markdown(display_mode(&record.acquisition_mode)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use crate::report::fixtures::{alert, context};
    use pretty_assertions::assert_eq;

    fn many(n: usize) -> Vec<AlertEntry> {
        (0..n)
            .map(|i| alert(i, TransactionType::Acquisition, 100_000.0 + i as f64))
            .collect()
    }

    #[test]
    fn test_blocks_are_rendered() {
        let summary = RunSummary {
            total_records: 3,
            acquisitions: 2,
            disposals: 1,
        };
        let alerts = vec![alert(7, TransactionType::Disposal, -300_000.0)];
        let message = render_chat(&summary, &alerts, &context());

        assert_eq!(
            message,
            "*📊 Insider Trading Report (BSE)*\n_18 October 2026_\n\n\
             Total: 3 transactions\n🟢 Acquisitions: 2\n🔴 Disposals: 1\n\n\
             *🚨 1 SIGNIFICANT ALERTS*\n\n\
             🔴 *Example Industries Limited 7*\n   Promoter 7\n   DISPOSAL: -300,000 shares\n   Mode: Market Purchase\n\n\
             _Check email for detailed report_"
        );
    }

    #[test]
    fn test_fifty_alerts_are_truncated_within_budget() {
        let ctx = context();
        let alerts = many(50);
        let message = render_chat(&RunSummary::default(), &alerts, &ctx);

        let shown = message.matches("🟢 *").count();
        assert!(shown > 0 && shown < 50);
        assert!(message.contains(&format!(
            "_...and {} more alerts (check email)_",
            50 - shown
        )));
        assert!(message.ends_with(FOOTER));
        assert!(message.chars().count() <= ctx.chat_budget + CHAT_FOOTER_ALLOWANCE);
    }

    #[test]
    fn test_small_budget_still_bounded() {
        let mut ctx = context();
        ctx.chat_budget = 256;
        let message = render_chat(&RunSummary::default(), &many(5), &ctx);

        assert!(message.contains("more alerts (check email)"));
        assert!(message.chars().count() <= ctx.chat_budget + CHAT_FOOTER_ALLOWANCE);
    }

    #[test]
    fn test_markdown_in_names_is_escaped() {
        let mut entry = alert(1, TransactionType::Acquisition, 500_000.0);
        entry.record.company_name = "SOME_CO *LTD*".to_string();
        entry.record.acquisition_mode = String::new();

        let message = render_chat(&RunSummary::default(), &[entry], &context());
        assert!(message.contains("*SOME\\_CO \\*LTD\\**"));
        assert!(message.contains("Mode: N/A"));
    }
}
