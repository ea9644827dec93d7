//! Channel ownership lookup — an external collaborator in the full system
//! (the REST CRUD service owns channel records), represented here as a
//! narrow trait so the gateway's authorization checks don't depend on a
//! specific datastore.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Whether `channel_id` is a known channel at all.
    async fn exists(&self, channel_id: &str) -> bool;

    /// The owning user id of `channel_id`, if the channel exists.
    async fn owner_of(&self, channel_id: &str) -> Option<String>;
}

/// A test double / single-process fallback: an in-memory channel → owner
/// map with no external lookup.
#[derive(Default)]
pub struct InMemoryChannelDirectory {
    owners: RwLock<HashMap<String, String>>,
}

impl InMemoryChannelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channels<I>(channels: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            owners: RwLock::new(channels.into_iter().collect()),
        }
    }

    pub async fn register(&self, channel_id: impl Into<String>, owner_id: impl Into<String>) {
        self.owners.write().await.insert(channel_id.into(), owner_id.into());
    }
}

#[async_trait]
impl ChannelDirectory for InMemoryChannelDirectory {
    async fn exists(&self, channel_id: &str) -> bool {
        self.owners.read().await.contains_key(channel_id)
    }

    async fn owner_of(&self, channel_id: &str) -> Option<String> {
        self.owners.read().await.get(channel_id).cloned()
    }
}
