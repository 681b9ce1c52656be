use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use super::builder::BASE_URL;
use crate::extractor::utils::{capture_group_1_owned, trim_trailing_slashes};
use crate::http::{HttpFetcher, HttpRequest};

pub static CHANNEL_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:UC|HC)[0-9A-Za-z_-]{22}$").unwrap());

static PAGE_CHANNEL_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""channelId":"(UC[0-9A-Za-z_-]{22})""#).unwrap());

/// Sub-pages tried after the base page when looking for a channel id.
const PAGE_SUFFIXES: [&str; 3] = ["/about", "/streams", "/videos"];

pub fn is_channel_id(input: &str) -> bool {
    CHANNEL_ID_REGEX.is_match(input)
}

/// Turns whatever the user typed (URL, `@handle`, bare name or id) into a
/// canonical `UC…` channel id.
///
/// Page lookups are cached per URL for the lifetime of the resolver,
/// negative results included.
pub struct ChannelResolver {
    http: Arc<dyn HttpFetcher>,
    user_agent: String,
    cache: DashMap<String, Option<String>>,
}

impl ChannelResolver {
    pub fn new(http: Arc<dyn HttpFetcher>, user_agent: impl Into<String>) -> Self {
        Self {
            http,
            user_agent: user_agent.into(),
            cache: DashMap::new(),
        }
    }

    /// Resolve `input` to a channel id. `None` means "not resolvable this
    /// time"; callers skip the creator for the tick.
    pub async fn resolve(&self, input: &str) -> Option<String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        if is_channel_id(trimmed) {
            return Some(trimmed.to_string());
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return self.resolve_url(trimmed).await;
        }

        if trimmed.starts_with('@') {
            return self.resolve_from_page(&format!("{BASE_URL}/{trimmed}")).await;
        }

        let without_prefix = strip_channel_prefix(trimmed);
        if is_channel_id(without_prefix) {
            return Some(without_prefix.to_string());
        }

        for candidate in [
            format!("{BASE_URL}/@{without_prefix}"),
            format!("{BASE_URL}/{without_prefix}"),
        ] {
            if let Some(id) = self.resolve_from_page(&candidate).await {
                return Some(id);
            }
        }

        None
    }

    async fn resolve_url(&self, input: &str) -> Option<String> {
        let url = match Url::parse(input) {
            Ok(url) => url,
            Err(e) => {
                warn!(input, error = %e, "Failed to parse YouTube channel URL");
                return None;
            }
        };

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        if let ["channel", id, ..] = segments.as_slice()
            && is_channel_id(id)
        {
            return Some((*id).to_string());
        }

        if let Some(handle) = segments.iter().find(|s| s.starts_with('@')) {
            return self.resolve_from_page(&format!("{BASE_URL}/{handle}")).await;
        }

        match segments.first() {
            Some(first) if *first != "watch" => {
                self.resolve_from_page(&format!("{BASE_URL}/{}", segments.join("/")))
                    .await
            }
            _ => {
                debug!(input, "YouTube URL carries no channel path");
                None
            }
        }
    }

    /// Look for a channel id on `url` and its about/streams/videos pages.
    async fn resolve_from_page(&self, url: &str) -> Option<String> {
        let base = trim_trailing_slashes(url);
        let candidates = std::iter::once(base.to_string())
            .chain(PAGE_SUFFIXES.iter().map(|suffix| format!("{base}{suffix}")));

        for candidate in candidates {
            if let Some(cached) = self.cached(&candidate) {
                match cached {
                    Some(id) => {
                        self.cache.insert(base.to_string(), Some(id.clone()));
                        return Some(id);
                    }
                    None => continue,
                }
            }

            let found = self.fetch_channel_id(&candidate).await;
            self.cache.insert(candidate, found.clone());
            if let Some(id) = found {
                self.cache.insert(base.to_string(), Some(id.clone()));
                return Some(id);
            }
        }

        self.cache.insert(base.to_string(), None);
        None
    }

    async fn fetch_channel_id(&self, url: &str) -> Option<String> {
        let request = HttpRequest::get(url).header("User-Agent", &self.user_agent);
        match self.http.fetch(request).await {
            Ok(response) if response.is_ok() => {
                let id = capture_group_1_owned(&PAGE_CHANNEL_ID_REGEX, &response.body);
                debug!(url, channel_id = ?id, "Scanned page for channel id");
                id
            }
            Ok(response) => {
                debug!(url, status = response.status, "Channel page returned non-200");
                None
            }
            Err(e) => {
                warn!(url, error = %e, "Failed to resolve YouTube channel id");
                None
            }
        }
    }

    /// `Some(None)` is a cached negative result.
    pub fn cached(&self, url: &str) -> Option<Option<String>> {
        self.cache.get(url).map(|entry| entry.value().clone())
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

fn strip_channel_prefix(input: &str) -> &str {
    match input.get(..8) {
        Some(prefix) if prefix.eq_ignore_ascii_case("channel/") => &input[8..],
        _ => input,
    }
}
