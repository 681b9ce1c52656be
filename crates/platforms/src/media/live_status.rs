use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Normalized outcome of one successful status fetch.
///
/// Metadata only exists on the `Live` variant, so an offline channel can
/// never carry a stale title, viewer count, start time or URL.
///
/// # Examples
///
/// ```rust
/// use stagedock_platforms::media::{LiveDetails, LiveStatus};
///
/// let status = LiveStatus::Live(LiveDetails {
///     title: Some("Ranked Grind".to_string()),
///     viewer_count: Some(1500),
///     ..Default::default()
/// });
/// assert!(status.is_live());
/// assert_eq!(status.title(), Some("Ranked Grind"));
/// assert_eq!(LiveStatus::Offline.title(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum LiveStatus {
    Offline,
    Live(LiveDetails),
}

/// Broadcast metadata, every field best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveDetails {
    pub title: Option<String>,
    /// Game or category name, when the platform exposes one.
    pub category: Option<String>,
    pub viewer_count: Option<u64>,
    #[serde(default, with = "iso_millis")]
    pub started_at: Option<DateTime<Utc>>,
    /// Canonical URL of the live content.
    pub stream_url: Option<String>,
}

impl LiveStatus {
    #[inline]
    pub fn is_live(&self) -> bool {
        matches!(self, LiveStatus::Live(_))
    }

    pub fn details(&self) -> Option<&LiveDetails> {
        match self {
            LiveStatus::Live(details) => Some(details),
            LiveStatus::Offline => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.details().and_then(|d| d.title.as_deref())
    }

    pub fn category(&self) -> Option<&str> {
        self.details().and_then(|d| d.category.as_deref())
    }

    pub fn viewer_count(&self) -> Option<u64> {
        self.details().and_then(|d| d.viewer_count)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.details().and_then(|d| d.started_at)
    }

    pub fn stream_url(&self) -> Option<&str> {
        self.details().and_then(|d| d.stream_url.as_deref())
    }
}

/// Render a timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter for `Option<DateTime<Utc>>` in the millisecond `Z` form.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&super::format_timestamp(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|s| crate::extractor::utils::normalize_timestamp(&s)))
    }
}
