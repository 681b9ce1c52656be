//! Notification channels.
//!
//! - Log output (always available)
//! - Generic webhooks (HTTP POST)

mod log;
mod webhook;

pub use log::LogNotifier;
pub use webhook::{WebhookConfig, WebhookNotifier};
