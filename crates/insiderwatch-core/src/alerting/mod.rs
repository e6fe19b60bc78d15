//! Alerting for InsiderWatch
//!
//! Loads threshold rules, flags matching transactions, and delivers the
//! rendered report by email and chat.

mod evaluator;
mod notifier;
mod repository;

pub use evaluator::{evaluate, AlertEvaluator};
pub use notifier::{
    EmailNotifier, NotificationError, NotificationResult, NotificationSender, Notifier,
    TelegramNotifier,
};
pub use repository::{AlertRepository, RuleSource};
