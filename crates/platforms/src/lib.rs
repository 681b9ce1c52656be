//! Live status extraction for the platforms StageDock tracks.
//!
//! The crate turns a user-entered channel identifier into a normalized
//! [`LiveStatus`]. Twitch is queried through its public GQL endpoint; YouTube
//! has no usable public surface, so channel pages are fetched and inspected
//! with a layered set of HTML heuristics.
//!
//! All network access goes through the [`HttpFetcher`] port so callers (and
//! tests) can substitute their own transport.

pub mod extractor;
pub mod http;
pub mod media;
pub mod rate_limit;

pub use extractor::error::FetchError;
pub use extractor::factory::FetcherRegistry;
pub use extractor::status_fetcher::StatusFetcher;
pub use http::{HttpFetcher, HttpRequest, HttpResponse, ReqwestFetcher};
pub use media::{LiveDetails, LiveStatus, Platform};
pub use rate_limit::{RateLimit, RateLimitedFetcher};
