//! HTML and plain-text email report

use std::fmt::Write as _;

use serde::Serialize;

use crate::models::{AlertEntry, RunSummary};

use super::format::{
    display_date, display_mode, escape_html, format_optional_shares, format_shares,
    truncate_chars,
};
use super::{display_type, ReportContext, NO_ALERTS_MESSAGE};

const COMPANY_WIDTH: usize = 40;
const ACQUISITION_COLOR: &str = "#4caf50";
const DISPOSAL_COLOR: &str = "#f44336";

const STYLE: &str = "\
body { font-family: Arial, sans-serif; background-color: #f5f5f5; margin: 0; padding: 5px; }
.container { max-width: 900px; margin: 0 auto; background-color: white; border-radius: 8px; overflow: hidden; }
.header { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 15px; text-align: center; }
.header h1 { margin: 0; font-size: 20px; }
.header p { margin: 3px 0 0 0; font-size: 12px; opacity: 0.9; }
.content { padding: 15px; }
.summary { background-color: #f8f9fa; padding: 15px; border-radius: 5px; margin-bottom: 20px; }
.summary-item { display: inline-block; margin-right: 30px; }
.summary-value { font-size: 24px; font-weight: bold; color: #667eea; }
.summary-label { font-size: 12px; color: #666; }
.alerts { background-color: #fff3cd; border-left: 5px solid #ff6b6b; padding: 15px; border-radius: 5px; }
.alerts h2 { color: #d32f2f; margin: 0 0 10px 0; font-size: 18px; }
.alerts table { width: 100%; border-collapse: collapse; background-color: white; }
.alerts th { background-color: #d32f2f; color: white; padding: 8px; text-align: left; font-size: 13px; }
.alerts td { padding: 8px; font-size: 13px; border-bottom: 1px solid #e0e0e0; }
.alerts small { color: #999; font-size: 11px; }
.empty { text-align: center; color: #666; padding: 15px 0; font-size: 13px; }
.footer { background-color: #f8f9fa; padding: 10px; text-align: center; color: #666; font-size: 11px; }
.footer p { margin: 3px 0; }
";

/// A rendered email: subject plus HTML and plain-text bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailReport {
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
    /// Plain-text alternative
    pub text: String,
}

/// Render the daily email.
pub fn render_email(summary: &RunSummary, alerts: &[AlertEntry], ctx: &ReportContext) -> EmailReport {
    let subject = if alerts.is_empty() {
        format!("Daily Insider Trading Report - {}", ctx.date_label())
    } else {
        format!(
            "🚨 INSIDER TRADING ALERT - {} Significant Transactions - {}",
            alerts.len(),
            ctx.date_label()
        )
    };

    EmailReport {
        subject,
        html: render_html(summary, alerts, ctx),
        text: render_text(summary, alerts, ctx),
    }
}

fn render_html(summary: &RunSummary, alerts: &[AlertEntry], ctx: &ReportContext) -> String {
    let mut html = String::with_capacity(4096 + alerts.len() * 768);

    let _ = write!(
        html,
        "<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n{STYLE}</style>\n</head>\n<body>\n\
         <div class=\"container\">\n\
         <div class=\"header\">\n<h1>📊 Daily Insider Trading Report (BSE)</h1>\n<p>{}</p>\n</div>\n\
         <div class=\"content\">\n<div class=\"summary\">\n",
        escape_html(&ctx.timestamp_label())
    );
    summary_tile(&mut html, summary.total_records, "Total Transactions", None);
    summary_tile(&mut html, summary.acquisitions, "Acquisitions", Some(ACQUISITION_COLOR));
    summary_tile(&mut html, summary.disposals, "Disposals", Some(DISPOSAL_COLOR));
    html.push_str("</div>\n");

    if alerts.is_empty() {
        let _ = writeln!(html, "<p class=\"empty\">{NO_ALERTS_MESSAGE}</p>");
    } else {
        alerts_table(&mut html, alerts);
    }

    let _ = write!(
        html,
        "</div>\n<div class=\"footer\">\n\
         <p><strong>Insider Trading Tracker (BSE)</strong></p>\n\
         <p>Alert Threshold: {} shares</p>\n\
         <p>Automated Reporting System</p>\n\
         </div>\n</div>\n</body>\n</html>\n",
        format_shares(ctx.min_shares_threshold)
    );
    html
}

fn summary_tile(html: &mut String, value: u64, label: &str, color: Option<&str>) {
    let style = color
        .map(|c| format!(" style=\"color: {c};\""))
        .unwrap_or_default();
    let _ = write!(
        html,
        "<div class=\"summary-item\"><div class=\"summary-value\"{style}>{value}</div>\
         <div class=\"summary-label\">{label}</div></div>\n"
    );
}

fn alerts_table(html: &mut String, alerts: &[AlertEntry]) {
    html.push_str(
        "<div class=\"alerts\">\n<h2>🚨 SIGNIFICANT INSIDER TRANSACTIONS</h2>\n\
         <p>The following insider trades exceed your alert thresholds:</p>\n\
         <table>\n<thead><tr><th>Company</th><th>Insider</th><th>Type</th>\
         <th style=\"text-align: right;\">Shares</th><th>Mode</th><th>Date</th></tr></thead>\n<tbody>\n",
    );

    for alert in alerts {
        let record = &alert.record;
        let color = if record.acquisition_disposal.is_acquisition() {
            ACQUISITION_COLOR
        } else {
            DISPOSAL_COLOR
        };
        let _ = write!(
            html,
            "<tr>\
             <td><strong>{company}</strong><br><small>Code: {symbol}</small></td>\
             <td>{person}<br><small>{category}</small></td>\
             <td style=\"color: {color}; font-weight: bold; text-align: center;\">{kind}</td>\
             <td style=\"text-align: right;\">{shares}</td>\
             <td>{mode}</td>\
             <td>{date}</td>\
             </tr>\n",
            company = escape_html(truncate_chars(&record.company_name, COMPANY_WIDTH)),
            symbol = escape_html(record.symbol()),
            person = escape_html(&record.person_name),
            category = escape_html(&record.person_category),
            kind = escape_html(display_type(&record.acquisition_disposal)),
            shares = format_optional_shares(record.acquired_shares),
            mode = escape_html(display_mode(&record.acquisition_mode)),
            date = display_date(record.intimation_date),
        );
    }

    html.push_str("</tbody>\n</table>\n</div>\n");
}

fn render_text(summary: &RunSummary, alerts: &[AlertEntry], ctx: &ReportContext) -> String {
    let mut text = String::with_capacity(512 + alerts.len() * 160);

    let _ = write!(
        text,
        "Daily Insider Trading Report (BSE)\n{}\n\n\
         Total Transactions: {}\nAcquisitions: {}\nDisposals: {}\n\n",
        ctx.timestamp_label(),
        summary.total_records,
        summary.acquisitions,
        summary.disposals
    );

    if alerts.is_empty() {
        let _ = writeln!(text, "{NO_ALERTS_MESSAGE}");
    } else {
        let _ = writeln!(text, "SIGNIFICANT INSIDER TRANSACTIONS ({})", alerts.len());
        for alert in alerts {
            let record = &alert.record;
            let _ = writeln!(
                text,
                "- {} (Code: {}) | {} ({}) | {} | {} shares | Mode: {} | Date: {}",
                truncate_chars(&record.company_name, COMPANY_WIDTH),
                record.symbol(),
                record.person_name,
                record.person_category,
                display_type(&record.acquisition_disposal),
                format_optional_shares(record.acquired_shares),
                display_mode(&record.acquisition_mode),
                display_date(record.intimation_date),
            );
        }
    }

    let _ = write!(
        text,
        "\nAlert Threshold: {} shares\n",
        format_shares(ctx.min_shares_threshold)
    );
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use crate::report::fixtures::{alert, context};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_subject_counts_alerts() {
        let alerts = vec![
            alert(1, TransactionType::Acquisition, 150_000.0),
            alert(2, TransactionType::Disposal, -250_000.0),
        ];
        let report = render_email(&RunSummary::default(), &alerts, &context());
        assert_eq!(
            report.subject,
            "🚨 INSIDER TRADING ALERT - 2 Significant Transactions - 18 October 2026"
        );
    }

    #[test]
    fn test_alert_rows_are_formatted() {
        let summary = RunSummary {
            total_records: 12,
            acquisitions: 7,
            disposals: 4,
        };
        let alerts = vec![alert(1, TransactionType::Disposal, -1_250_000.0)];
        let report = render_email(&summary, &alerts, &context());

        assert!(report.html.contains("18 October 2026, 09:30 AM IST"));
        assert!(report.html.contains(">12</div>"));
        assert!(report.html.contains("-1,250,000"));
        assert!(report.html.contains("Code: 500001"));
        assert!(report.html.contains(DISPOSAL_COLOR));
        assert!(report.html.contains("2026-10-16"));
        assert!(report.html.contains("Alert Threshold: 100,000 shares"));
        assert!(!report.html.contains(NO_ALERTS_MESSAGE));

        assert!(report.text.contains(
            "- Example Industries Limited 1 (Code: 500001) | Promoter 1 (Promoter Group) \
             | DISPOSAL | -1,250,000 shares | Mode: Market Purchase | Date: 2026-10-16"
        ));
    }

    #[test]
    fn test_interpolated_text_is_escaped() {
        let mut entry = alert(1, TransactionType::Acquisition, 200_000.0);
        entry.record.company_name = "A&B <script>".to_string();
        entry.record.acquisition_mode = String::new();

        let report = render_email(&RunSummary::default(), &[entry], &context());
        assert!(report.html.contains("A&amp;B &lt;script&gt;"));
        assert!(!report.html.contains("<script>"));
        assert!(report.html.contains("<td>N/A</td>"));
    }

    #[test]
    fn test_company_is_truncated() {
        let mut entry = alert(1, TransactionType::Acquisition, 200_000.0);
        entry.record.company_name = "X".repeat(60);

        let report = render_email(&RunSummary::default(), &[entry], &context());
        assert!(report.html.contains(&format!("<strong>{}</strong>", "X".repeat(40))));
        assert!(!report.html.contains(&"X".repeat(41)));
    }
}
