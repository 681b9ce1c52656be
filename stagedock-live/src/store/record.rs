use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stagedock_platforms::LiveStatus;
use stagedock_platforms::media::live_status::iso_millis;

use crate::domain::TrackedCreator;

/// Latest known status of one creator, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatusRecord {
    pub creator_id: String,
    pub is_live: bool,
    pub title: Option<String>,
    pub game: Option<String>,
    #[serde(default, with = "iso_millis")]
    pub started_at: Option<DateTime<Utc>>,
    pub viewer_count: Option<u64>,
    pub stream_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl LiveStatusRecord {
    /// Build the record for a fetched status.
    ///
    /// A live status without a stream URL gets the creator's live channel
    /// page instead; an offline status carries no metadata at all.
    pub fn from_status(
        creator: &TrackedCreator,
        status: &LiveStatus,
        updated_at: DateTime<Utc>,
    ) -> Self {
        match status {
            LiveStatus::Live(details) => Self {
                creator_id: creator.id.clone(),
                is_live: true,
                title: details.title.clone(),
                game: details.category.clone(),
                started_at: details.started_at,
                viewer_count: details.viewer_count,
                stream_url: Some(
                    details
                        .stream_url
                        .clone()
                        .unwrap_or_else(|| creator.channel_url(true)),
                ),
                updated_at,
            },
            LiveStatus::Offline => Self::offline(&creator.id, updated_at),
        }
    }

    pub fn offline(creator_id: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            creator_id: creator_id.into(),
            is_live: false,
            title: None,
            game: None,
            started_at: None,
            viewer_count: None,
            stream_url: None,
            updated_at,
        }
    }
}
