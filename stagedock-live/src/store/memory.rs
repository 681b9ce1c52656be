use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::{CreatorStore, LiveStatusRecord};
use crate::Result;
use crate::domain::TrackedCreator;

/// In-process store: creators kept in insertion order, statuses keyed by
/// creator id.
#[derive(Default)]
pub struct MemoryStore {
    creators: RwLock<Vec<TrackedCreator>>,
    statuses: DashMap<String, LiveStatusRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_creators(creators: impl IntoIterator<Item = TrackedCreator>) -> Self {
        let store = Self::new();
        for creator in creators {
            store.add_creator(creator);
        }
        store
    }

    /// Load creators from a JSON array file.
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let creators: Vec<TrackedCreator> = serde_json::from_str(&raw)?;
        info!(path = %path.display(), count = creators.len(), "Loaded tracked creators");
        Ok(Self::with_creators(creators))
    }

    /// Add a creator, replacing any existing one with the same id.
    pub fn add_creator(&self, creator: TrackedCreator) {
        let mut creators = self.creators.write();
        match creators.iter_mut().find(|c| c.id == creator.id) {
            Some(existing) => {
                debug!(creator_id = %creator.id, "Replacing tracked creator");
                *existing = creator;
            }
            None => creators.push(creator),
        }
    }

    /// Remove a creator and its stored status.
    pub fn remove_creator(&self, id: &str) -> Option<TrackedCreator> {
        let mut creators = self.creators.write();
        let index = creators.iter().position(|c| c.id == id)?;
        self.statuses.remove(id);
        Some(creators.remove(index))
    }

    pub fn creators(&self) -> Vec<TrackedCreator> {
        self.creators.read().clone()
    }

    pub fn status(&self, creator_id: &str) -> Option<LiveStatusRecord> {
        self.statuses.get(creator_id).map(|entry| entry.value().clone())
    }

    pub fn statuses(&self) -> Vec<LiveStatusRecord> {
        self.statuses.iter().map(|entry| entry.value().clone()).collect()
    }
}

#[async_trait]
impl CreatorStore for MemoryStore {
    async fn list_tracked_creators(&self) -> Result<Vec<TrackedCreator>> {
        Ok(self.creators())
    }

    async fn upsert_live_status(&self, record: &LiveStatusRecord) -> Result<()> {
        self.statuses.insert(record.creator_id.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stagedock_platforms::Platform;

    #[tokio::test]
    async fn test_upsert_last_write_wins() {
        let store = MemoryStore::new();
        let first = LiveStatusRecord::offline("c1", Utc::now());
        let mut second = first.clone();
        second.is_live = true;
        second.stream_url = Some("https://www.twitch.tv/alice".to_string());

        store.upsert_live_status(&first).await.unwrap();
        store.upsert_live_status(&second).await.unwrap();

        assert_eq!(store.status("c1"), Some(second));
        assert_eq!(store.statuses().len(), 1);
    }

    #[tokio::test]
    async fn test_creators_keep_order_and_replace_by_id() {
        let store = MemoryStore::with_creators([
            TrackedCreator::new(Platform::Twitch, "alice", "Alice").with_id("a"),
            TrackedCreator::new(Platform::YouTube, "@bob", "Bob").with_id("b"),
        ]);
        store.add_creator(TrackedCreator::new(Platform::Twitch, "alice2", "Alice").with_id("a"));

        let creators = store.list_tracked_creators().await.unwrap();
        assert_eq!(creators.len(), 2);
        assert_eq!(creators[0].channel_identifier, "alice2");
        assert_eq!(creators[1].id, "b");

        assert!(store.remove_creator("a").is_some());
        assert!(store.remove_creator("a").is_none());
        assert_eq!(store.creators().len(), 1);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creators.json");
        std::fs::write(
            &path,
            r#"[
                {"id":"a","platform":"twitch","channelIdentifier":"alice","displayName":"Alice","notifyEnabled":false},
                {"platform":"youtube","channelIdentifier":"@bob","displayName":"Bob"}
            ]"#,
        )
        .unwrap();

        let store = MemoryStore::load_from_file(&path).await.unwrap();
        let creators = store.creators();
        assert_eq!(creators.len(), 2);
        assert!(!creators[0].notify_enabled);
        assert!(creators[1].notify_enabled);
        assert!(!creators[1].id.is_empty());
    }

    #[tokio::test]
    async fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = MemoryStore::load_from_file(dir.path().join("missing.json")).await;
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
