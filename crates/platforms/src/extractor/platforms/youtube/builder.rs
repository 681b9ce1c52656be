use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::candidates::build_live_page_candidates;
use super::detect::detect_live;
use super::resolver::ChannelResolver;
use crate::extractor::error::FetchError;
use crate::extractor::status_fetcher::StatusFetcher;
use crate::http::{HttpFetcher, HttpRequest};
use crate::media::{LiveStatus, Platform};

pub const BASE_URL: &str = "https://www.youtube.com";

pub fn watch_url(video_id: &str) -> String {
    format!("{BASE_URL}/watch?v={video_id}")
}

/// Channel page for a stored identifier, without resolving it.
pub fn channel_url(identifier: &str, live: bool) -> String {
    let path = if identifier.starts_with('@') {
        identifier.to_string()
    } else if identifier.starts_with("UC") || identifier.starts_with("HC") {
        format!("channel/{identifier}")
    } else {
        format!("@{identifier}")
    };

    if live {
        format!("{BASE_URL}/{path}/live")
    } else {
        format!("{BASE_URL}/{path}")
    }
}

/// YouTube status fetcher.
///
/// Resolves the channel id, then walks the candidate live pages and returns
/// the first one any page heuristic reports as live.
pub struct YouTube {
    http: Arc<dyn HttpFetcher>,
    user_agent: String,
    resolver: ChannelResolver,
}

impl YouTube {
    pub fn new(http: Arc<dyn HttpFetcher>, user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        Self {
            resolver: ChannelResolver::new(http.clone(), user_agent.clone()),
            http,
            user_agent,
        }
    }

    pub fn resolver(&self) -> &ChannelResolver {
        &self.resolver
    }

    /// Body of `url` when it answers 200, `None` for any other status.
    async fn fetch_page(&self, url: &str) -> Result<Option<String>, FetchError> {
        let request = HttpRequest::get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "text/html");
        let response = self.http.fetch(request).await?;
        if !response.is_ok() {
            debug!(url, status = response.status, "Skipping live page candidate");
            return Ok(None);
        }
        Ok(Some(response.body))
    }
}

#[async_trait]
impl StatusFetcher for YouTube {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn fetch_status(&self, channel: &str) -> Result<LiveStatus, FetchError> {
        let input = channel.trim();
        if input.is_empty() {
            return Err(FetchError::InvalidIdentifier(channel.to_string()));
        }

        let Some(channel_id) = self.resolver.resolve(input).await else {
            warn!(input, "Failed to resolve YouTube channel id");
            return Err(FetchError::ChannelUnresolved(input.to_string()));
        };
        debug!(input, channel_id = %channel_id, "Resolved YouTube channel id");

        for url in build_live_page_candidates(&channel_id, input) {
            let body = match self.fetch_page(&url).await {
                Ok(Some(body)) => body,
                Ok(None) => continue,
                Err(e) => {
                    warn!(channel_id = %channel_id, url = %url, error = %e, "Failed to fetch live page");
                    continue;
                }
            };

            match detect_live(&body, &url) {
                Some(details) => {
                    debug!(
                        channel_id = %channel_id,
                        source = %url,
                        stream_url = ?details.stream_url,
                        "Parsed live status from page"
                    );
                    return Ok(LiveStatus::Live(details));
                }
                None => debug!(channel_id = %channel_id, source = %url, "No live signal on page"),
            }
        }

        Ok(LiveStatus::Offline)
    }
}
