//! Notification delivery for reports

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{EmailConfig, TelegramConfig};
use crate::error::{Error, Result};
use crate::report::Report;

/// Result of sending a notification
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResult {
    /// Channel name, as returned by [`Notifier::channel`]
    pub channel_type: String,
    /// Whether delivery succeeded
    pub success: bool,
    /// Failure message, if any
    pub error: Option<String>,
    /// When the attempt started
    pub sent_at: DateTime<Utc>,
}

/// A delivery channel for the rendered report
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short channel name used in logs and results
    fn channel(&self) -> &'static str;

    /// Deliver the report through this channel
    async fn deliver(&self, report: &Report) -> std::result::Result<(), NotificationError>;
}

/// Sends the report through every configured channel, in order
#[derive(Default)]
pub struct NotificationSender {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotificationSender {
    /// Create a sender over `notifiers`
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    /// Email first, then chat when Telegram credentials are present.
    pub fn from_config(email: &EmailConfig, telegram: &TelegramConfig) -> Result<Self> {
        let mut notifiers: Vec<Box<dyn Notifier>> = vec![Box::new(EmailNotifier::new(email)?)];
        match TelegramNotifier::new(telegram)? {
            Some(notifier) => notifiers.push(Box::new(notifier)),
            None => warn!("Telegram credentials not configured, chat notifications disabled"),
        }
        Ok(Self::new(notifiers))
    }

    /// Names of the configured channels
    pub fn channels(&self) -> Vec<&'static str> {
        self.notifiers.iter().map(|n| n.channel()).collect()
    }

    /// Send the report through every channel. Failures are logged and
    /// reported, never propagated.
    pub async fn send_all(&self, report: &Report) -> Vec<NotificationResult> {
        let mut results = Vec::with_capacity(self.notifiers.len());

        for notifier in &self.notifiers {
            let sent_at = Utc::now();
            let result = notifier.deliver(report).await;
            if let Err(e) = &result {
                error!(channel = notifier.channel(), error = %e, "Notification failed");
            }

            results.push(NotificationResult {
                channel_type: notifier.channel().to_string(),
                success: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
                sent_at,
            });
        }

        results
    }
}

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("SMTP error: {0}")]
    SmtpError(String),

    #[error("Message error: {0}")]
    MessageError(String),
}

/// Sends the HTML/plain-text report over SMTP with implicit TLS
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl EmailNotifier {
    /// Build the SMTP transport and parse all addresses up front
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from: Mailbox = config
            .user
            .parse()
            .map_err(|e| Error::config(format!("invalid email.user {:?}: {e}", config.user)))?;

        let recipients = config
            .recipients
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(|r| {
                r.parse::<Mailbox>()
                    .map_err(|e| Error::config(format!("invalid recipient {r:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        if recipients.is_empty() {
            return Err(Error::config("no email recipients configured"));
        }

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| Error::config(format!("invalid SMTP host: {e}")))?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.user.clone(), config.password.clone()))
            .timeout(Some(config.timeout))
            .build();

        info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            recipients = recipients.len(),
            "Email notifier initialized"
        );

        Ok(Self {
            transport,
            from,
            recipients,
        })
    }

    fn build_message(&self, report: &Report) -> std::result::Result<Message, NotificationError> {
        build_message(&self.from, &self.recipients, report)
    }
}

fn build_message(
    from: &Mailbox,
    recipients: &[Mailbox],
    report: &Report,
) -> std::result::Result<Message, NotificationError> {
    let mut builder = Message::builder()
        .from(from.clone())
        .subject(report.email.subject.clone());
    for recipient in recipients {
        builder = builder.to(recipient.clone());
    }

    builder
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(report.email.text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(report.email.html.clone()),
                ),
        )
        .map_err(|e| NotificationError::MessageError(e.to_string()))
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, report: &Report) -> std::result::Result<(), NotificationError> {
        let message = self.build_message(report)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SmtpError(e.to_string()))?;

        info!(recipients = self.recipients.len(), "Email sent");
        Ok(())
    }
}

/// Posts the chat rendering through the Telegram Bot API
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// `Ok(None)` when the token or chat id is missing.
    pub fn new(config: &TelegramConfig) -> Result<Option<Self>> {
        let Some((token, chat_id)) = config.credentials() else {
            return Ok(None);
        };

        let client = Client::builder().timeout(config.timeout).build()?;
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            token
        );

        info!("Telegram notifier initialized");
        Ok(Some(Self {
            client,
            endpoint,
            chat_id: chat_id.to_string(),
        }))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, report: &Report) -> std::result::Result<(), NotificationError> {
        let payload = SendMessagePayload {
            chat_id: &self.chat_id,
            text: &report.chat,
            parse_mode: "Markdown",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::HttpError(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::HttpError(format!(
                "Telegram returned {}: {}",
                status, body
            )));
        }

        info!("Telegram notification sent");
        Ok(())
    }
}

// Telegram payload
#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}
