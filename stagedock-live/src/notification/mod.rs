//! Went-live notifications.
//!
//! The [`NotificationService`] fans every went-live transition out to the
//! configured [`Notifier`]s. Delivery failures are logged and never reach the
//! monitor.

pub mod channels;
mod service;

pub use channels::{LogNotifier, WebhookConfig, WebhookNotifier};
pub use service::NotificationService;

use async_trait::async_trait;

use crate::Result;

/// A destination for went-live notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    /// Announce that `display_name` went live on `platform_label`. `url`
    /// opens the stream.
    async fn notify_went_live(&self, display_name: &str, platform_label: &str, url: &str)
    -> Result<()>;
}

/// Title and body of a went-live notification.
pub fn went_live_text(display_name: &str, platform_label: &str) -> (String, String) {
    (
        format!("{} is live", display_name),
        format!("Click to open on {}.", platform_label),
    )
}
