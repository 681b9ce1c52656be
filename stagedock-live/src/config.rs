//! Environment-driven configuration.
//!
//! Every knob has a default; unset variables use it silently, unparsable ones
//! use it with a warning.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use stagedock_platforms::{FetcherRegistry, HttpFetcher, Platform, RateLimit};
use stagedock_platforms::http::{DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use tracing::warn;

pub const ENV_POLL_INTERVAL_SECS: &str = "STAGEDOCK_POLL_INTERVAL_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "STAGEDOCK_REQUEST_TIMEOUT_SECS";
pub const ENV_MAX_REDIRECTS: &str = "STAGEDOCK_MAX_REDIRECTS";
pub const ENV_USER_AGENT: &str = "STAGEDOCK_USER_AGENT";
pub const ENV_RATE_LIMIT: &str = "STAGEDOCK_RATE_LIMIT";
pub const ENV_EVENT_CAPACITY: &str = "STAGEDOCK_EVENT_CAPACITY";
pub const ENV_CREATORS_FILE: &str = "STAGEDOCK_CREATORS_FILE";
pub const ENV_LOG_DIR: &str = "STAGEDOCK_LOG_DIR";
pub const ENV_WEBHOOK_URL: &str = "STAGEDOCK_WEBHOOK_URL";

/// Configuration for the live monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between the starts of two ticks.
    pub poll_interval: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Redirect hops followed per page fetch.
    pub max_redirects: usize,
    pub user_agent: String,
    /// Outgoing HTTP requests per second allowed for each platform.
    /// Every page and API request counts, not just one per creator.
    pub default_rate_limit: f64,
    /// Per-platform overrides of `default_rate_limit`.
    pub platform_rate_limits: Vec<(Platform, f64)>,
    /// Capacity of the monitor event broadcast channel.
    pub event_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            request_timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_rate_limit: 5.0,
            platform_rate_limits: Vec::new(),
            event_capacity: 256,
        }
    }
}

impl MonitorConfig {
    /// Load monitor config from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `STAGEDOCK_POLL_INTERVAL_SECS` (e.g. "60")
    /// - `STAGEDOCK_REQUEST_TIMEOUT_SECS` (e.g. "20")
    /// - `STAGEDOCK_MAX_REDIRECTS` (e.g. "5")
    /// - `STAGEDOCK_USER_AGENT`
    /// - `STAGEDOCK_RATE_LIMIT` (HTTP requests per second per platform, e.g. "5.0")
    /// - `STAGEDOCK_RATE_LIMIT_TWITCH`, `STAGEDOCK_RATE_LIMIT_YOUTUBE`
    /// - `STAGEDOCK_EVENT_CAPACITY` (e.g. "256")
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env_or_default`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64>(&lookup, ENV_POLL_INTERVAL_SECS)
            .filter(|secs| positive_or_warn(ENV_POLL_INTERVAL_SECS, *secs > 0))
        {
            config.poll_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_var::<u64>(&lookup, ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(hops) = parse_var::<usize>(&lookup, ENV_MAX_REDIRECTS) {
            config.max_redirects = hops;
        }

        if let Some(user_agent) = lookup(ENV_USER_AGENT)
            && !user_agent.trim().is_empty()
        {
            config.user_agent = user_agent.trim().to_string();
        }

        if let Some(rps) = parse_var::<f64>(&lookup, ENV_RATE_LIMIT)
            .filter(|rps| positive_or_warn(ENV_RATE_LIMIT, rps.is_finite() && *rps > 0.0))
        {
            config.default_rate_limit = rps;
        }

        for platform in Platform::ALL {
            let key = format!("{ENV_RATE_LIMIT}_{}", platform.as_str().to_ascii_uppercase());
            if let Some(rps) = parse_var::<f64>(&lookup, &key)
                .filter(|rps| positive_or_warn(&key, rps.is_finite() && *rps > 0.0))
            {
                config.platform_rate_limits.push((platform, rps));
            }
        }

        if let Some(capacity) = parse_var::<usize>(&lookup, ENV_EVENT_CAPACITY)
            .filter(|capacity| positive_or_warn(ENV_EVENT_CAPACITY, *capacity > 0))
        {
            config.event_capacity = capacity;
        }

        config
    }

    /// Reject values the monitor cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.poll_interval.is_zero() {
            return Err(crate::Error::config("poll interval must be greater than zero"));
        }
        if self.event_capacity == 0 {
            return Err(crate::Error::config("event capacity must be greater than zero"));
        }
        for platform in Platform::ALL {
            self.rate_limit(platform)?;
        }
        Ok(())
    }

    /// Request rate limit for one platform, honoring overrides.
    pub fn rate_limit(&self, platform: Platform) -> crate::Result<RateLimit> {
        let rps = self
            .platform_rate_limits
            .iter()
            .rev()
            .find(|(p, _)| *p == platform)
            .map_or(self.default_rate_limit, |(_, rps)| *rps);

        RateLimit::per_second(rps).ok_or_else(|| {
            crate::Error::config(format!(
                "rate limit for {} must be a positive number, got {}",
                platform.as_str(),
                rps
            ))
        })
    }

    /// Built-in fetchers over `http`, each platform throttled by its own
    /// request rate limit.
    pub fn fetcher_registry(&self, http: Arc<dyn HttpFetcher>) -> crate::Result<FetcherRegistry> {
        let mut limits = Vec::with_capacity(Platform::ALL.len());
        for platform in Platform::ALL {
            limits.push((platform, self.rate_limit(platform)?));
        }

        Ok(FetcherRegistry::with_rate_limits(
            http,
            self.user_agent.clone(),
            |platform| {
                limits
                    .iter()
                    .find(|(p, _)| *p == platform)
                    .map(|(_, limit)| *limit)
            },
        ))
    }
}

/// Settings only the headless binary needs.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JSON array of tracked creators.
    pub creators_file: PathBuf,
    pub log_dir: String,
    /// Webhook notifications are enabled when set.
    pub webhook_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            creators_file: PathBuf::from("creators.json"),
            log_dir: "logs".to_string(),
            webhook_url: None,
        }
    }
}

impl AppConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_CREATORS_FILE)
            && !path.trim().is_empty()
        {
            config.creators_file = PathBuf::from(path.trim());
        }

        if let Some(dir) = lookup(ENV_LOG_DIR)
            && !dir.trim().is_empty()
        {
            config.log_dir = dir.trim().to_string();
        }

        config.webhook_url = lookup(ENV_WEBHOOK_URL)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        config
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable config value");
            None
        }
    }
}

fn positive_or_warn(key: &str, valid: bool) -> bool {
    if !valid {
        warn!(key, "Ignoring non-positive config value");
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = MonitorConfig::from_lookup(lookup(&[]));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.default_rate_limit, 5.0);
        assert!(config.platform_rate_limits.is_empty());
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn test_overrides() {
        let config = MonitorConfig::from_lookup(lookup(&[
            (ENV_POLL_INTERVAL_SECS, "15"),
            (ENV_REQUEST_TIMEOUT_SECS, "3"),
            (ENV_MAX_REDIRECTS, "2"),
            (ENV_USER_AGENT, " custom/1.0 "),
            (ENV_RATE_LIMIT, "0.5"),
            ("STAGEDOCK_RATE_LIMIT_YOUTUBE", "1.5"),
            (ENV_EVENT_CAPACITY, "16"),
        ]));
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.max_redirects, 2);
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.default_rate_limit, 0.5);
        assert_eq!(config.platform_rate_limits, vec![(Platform::YouTube, 1.5)]);
        assert_eq!(config.event_capacity, 16);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = MonitorConfig::from_lookup(lookup(&[
            (ENV_POLL_INTERVAL_SECS, "0"),
            (ENV_RATE_LIMIT, "-2"),
            (ENV_MAX_REDIRECTS, "many"),
            (ENV_EVENT_CAPACITY, "0"),
        ]));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.default_rate_limit, 5.0);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(MonitorConfig::default().validate().is_ok());

        let config = MonitorConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(crate::Error::Configuration(_))));

        let config = MonitorConfig {
            event_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(crate::Error::Configuration(_))));

        let config = MonitorConfig {
            platform_rate_limits: vec![(Platform::Twitch, f64::NAN)],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(crate::Error::Configuration(_))));
    }

    #[test]
    fn test_rate_limit_overrides() {
        let config = MonitorConfig {
            default_rate_limit: 2.0,
            platform_rate_limits: vec![(Platform::YouTube, 0.5)],
            ..Default::default()
        };

        let twitch = config.rate_limit(Platform::Twitch).unwrap();
        assert_eq!(twitch.requests_per_second(), 2.0);
        assert_eq!(twitch.burst(), 4);

        let youtube = config.rate_limit(Platform::YouTube).unwrap();
        assert_eq!(youtube.requests_per_second(), 0.5);
        assert_eq!(youtube.burst(), 1);
    }

    #[test]
    fn test_app_config() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.creators_file, PathBuf::from("creators.json"));
        assert_eq!(config.log_dir, "logs");
        assert!(config.webhook_url.is_none());

        let config = AppConfig::from_lookup(lookup(&[
            (ENV_CREATORS_FILE, "/data/creators.json"),
            (ENV_WEBHOOK_URL, "https://hooks.example.com/x"),
            (ENV_LOG_DIR, "  "),
        ]));
        assert_eq!(config.creators_file, PathBuf::from("/data/creators.json"));
        assert_eq!(config.webhook_url.as_deref(), Some("https://hooks.example.com/x"));
        assert_eq!(config.log_dir, "logs");
    }
}
