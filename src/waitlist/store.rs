//! Waitlist storage

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{WaitlistEntry, WaitlistError};

/// Single-table storage keyed by normalized email
#[async_trait]
pub trait WaitlistStore: Send + Sync {
    /// Insert unless the email is already present.
    ///
    /// Returns `false` for duplicates.
    async fn insert_if_absent(&self, entry: WaitlistEntry) -> Result<bool, WaitlistError>;

    async fn count(&self) -> Result<usize, WaitlistError>;
}

/// In-memory waitlist store
#[derive(Debug, Clone, Default)]
pub struct InMemoryWaitlistStore {
    entries: Arc<RwLock<HashMap<String, WaitlistEntry>>>,
}

impl InMemoryWaitlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an entry by normalized email
    pub async fn get(&self, email: &str) -> Option<WaitlistEntry> {
        self.entries.read().await.get(email).cloned()
    }
}

#[async_trait]
impl WaitlistStore for InMemoryWaitlistStore {
    async fn insert_if_absent(&self, entry: WaitlistEntry) -> Result<bool, WaitlistError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&entry.email) {
            return Ok(false);
        }
        entries.insert(entry.email.clone(), entry);
        Ok(true)
    }

    async fn count(&self) -> Result<usize, WaitlistError> {
        Ok(self.entries.read().await.len())
    }
}
