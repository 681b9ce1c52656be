use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::extractor::platforms::{twitch, youtube};

/// Streaming platforms a creator can be tracked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    YouTube,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Twitch, Platform::YouTube];

    /// Stable lowercase id, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitch => "twitch",
            Platform::YouTube => "youtube",
        }
    }

    /// Human-readable name for notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Twitch => "Twitch",
            Platform::YouTube => "YouTube",
        }
    }

    /// Channel page for a raw identifier, built without any network access.
    ///
    /// Used when a fetcher reports a live channel without a stream URL.
    pub fn channel_url(&self, identifier: &str, live: bool) -> String {
        match self {
            Platform::Twitch => {
                let login = twitch::normalize_login(identifier)
                    .unwrap_or_else(|| identifier.trim().to_string());
                format!("{}/{login}", twitch::BASE_URL)
            }
            Platform::YouTube => youtube::channel_url(identifier.trim(), live),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitch" => Ok(Platform::Twitch),
            "youtube" => Ok(Platform::YouTube),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}
