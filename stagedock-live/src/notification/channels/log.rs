use async_trait::async_trait;
use tracing::info;

use crate::Result;
use crate::notification::{Notifier, went_live_text};

/// Writes notifications to the log. Used when no other channel is set up.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn channel_type(&self) -> &'static str {
        "log"
    }

    async fn notify_went_live(
        &self,
        display_name: &str,
        platform_label: &str,
        url: &str,
    ) -> Result<()> {
        let (title, body) = went_live_text(display_name, platform_label);
        info!(title = %title, body = %body, url, "Went-live notification");
        Ok(())
    }
}
