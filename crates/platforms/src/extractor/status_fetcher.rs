use async_trait::async_trait;

use crate::extractor::error::FetchError;
use crate::media::{LiveStatus, Platform};

/// Fetches the current broadcast state of one channel.
///
/// `Ok(LiveStatus::Offline)` is a confirmed offline result. Any `Err` means
/// the state is unknown for now and the caller should leave its previous
/// knowledge untouched.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    fn platform(&self) -> Platform;

    /// `channel` is the identifier exactly as the user entered it.
    async fn fetch_status(&self, channel: &str) -> Result<LiveStatus, FetchError>;
}
