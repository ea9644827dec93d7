//! Platform-admin lookup — another external collaborator (spec §4.1 lists
//! "channel owner or platform admin" as the authorization rule for
//! moderation commands), modeled the same way as `room_registry::ChannelDirectory`:
//! a narrow trait the gateway depends on, with an in-memory double for tests.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

#[async_trait]
pub trait RoleProvider: Send + Sync {
    async fn is_admin(&self, user_id: &str) -> bool;
}

#[derive(Default)]
pub struct InMemoryRoleProvider {
    admins: RwLock<HashSet<String>>,
}

impl InMemoryRoleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admins<I>(admins: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            admins: RwLock::new(admins.into_iter().collect()),
        }
    }

    pub async fn grant(&self, user_id: impl Into<String>) {
        self.admins.write().await.insert(user_id.into());
    }
}

#[async_trait]
impl RoleProvider for InMemoryRoleProvider {
    async fn is_admin(&self, user_id: &str) -> bool {
        self.admins.read().await.contains(user_id)
    }
}
