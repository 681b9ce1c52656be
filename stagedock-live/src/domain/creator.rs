use serde::{Deserialize, Serialize};
use stagedock_platforms::Platform;

/// A creator the monitor polls.
///
/// `channel_identifier` is kept exactly as the user entered it (URL, handle
/// or bare id); fetchers normalize it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedCreator {
    #[serde(default = "new_id")]
    pub id: String,
    pub platform: Platform,
    pub channel_identifier: String,
    pub display_name: String,
    #[serde(default = "default_notify")]
    pub notify_enabled: bool,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_notify() -> bool {
    true
}

impl TrackedCreator {
    pub fn new(
        platform: Platform,
        channel_identifier: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            platform,
            channel_identifier: channel_identifier.into(),
            display_name: display_name.into(),
            notify_enabled: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_notify(mut self, enabled: bool) -> Self {
        self.notify_enabled = enabled;
        self
    }

    /// Channel page for this creator, built without network access.
    pub fn channel_url(&self, live: bool) -> String {
        self.platform.channel_url(&self.channel_identifier, live)
    }
}
