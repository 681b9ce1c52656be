//! Persistence port for tracked creators and their latest live status.

mod memory;
mod record;

pub use memory::MemoryStore;
pub use record::LiveStatusRecord;

use async_trait::async_trait;

use crate::Result;
use crate::domain::TrackedCreator;

/// Storage the monitor reads creators from and writes statuses to.
///
/// Implementations are called concurrently from per-creator tasks.
#[async_trait]
pub trait CreatorStore: Send + Sync {
    /// Current list of tracked creators, read once per tick.
    async fn list_tracked_creators(&self) -> Result<Vec<TrackedCreator>>;

    /// Insert or replace the status for `record.creator_id`. Last write wins.
    async fn upsert_live_status(&self, record: &LiveStatusRecord) -> Result<()>;
}
