use std::collections::HashMap;
use std::sync::Arc;

use super::platforms::{twitch::Twitch, youtube::YouTube};
use super::status_fetcher::StatusFetcher;
use crate::http::HttpFetcher;
use crate::media::Platform;
use crate::rate_limit::{RateLimit, RateLimitedFetcher};

/// Maps each platform to the fetcher that knows how to poll it.
#[derive(Clone, Default)]
pub struct FetcherRegistry {
    fetchers: HashMap<Platform, Arc<dyn StatusFetcher>>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in Twitch and YouTube fetchers sharing one
    /// transport.
    pub fn with_defaults(http: Arc<dyn HttpFetcher>, user_agent: impl Into<String>) -> Self {
        Self::with_rate_limits(http, user_agent, |_| None)
    }

    /// Built-in fetchers where each platform's requests go through its own
    /// token bucket. Platforms that `limit_for` maps to `None` are not
    /// throttled.
    pub fn with_rate_limits(
        http: Arc<dyn HttpFetcher>,
        user_agent: impl Into<String>,
        limit_for: impl Fn(Platform) -> Option<RateLimit>,
    ) -> Self {
        let user_agent = user_agent.into();
        let transport = |platform: Platform| -> Arc<dyn HttpFetcher> {
            match limit_for(platform) {
                Some(limit) => Arc::new(RateLimitedFetcher::new(http.clone(), limit)),
                None => http.clone(),
            }
        };

        let mut registry = Self::new();
        registry.register(Arc::new(Twitch::new(
            transport(Platform::Twitch),
            user_agent.clone(),
        )));
        registry.register(Arc::new(YouTube::new(transport(Platform::YouTube), user_agent)));
        registry
    }

    /// Register a fetcher under its own platform, returning the one it replaced.
    pub fn register(&mut self, fetcher: Arc<dyn StatusFetcher>) -> Option<Arc<dyn StatusFetcher>> {
        self.fetchers.insert(fetcher.platform(), fetcher)
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn StatusFetcher>> {
        self.fetchers.get(&platform).cloned()
    }

    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.fetchers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }
}

impl std::fmt::Debug for FetcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetcherRegistry")
            .field("platforms", &self.fetchers.keys().collect::<Vec<_>>())
            .finish()
    }
}
