//! Waitlist Capture
//!
//! Pre-launch email signups from the landing page. Addresses are normalized,
//! validated and deduplicated before they are stored.

pub mod email;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics;
pub use store::{InMemoryWaitlistStore, WaitlistStore};

/// Default signup source
pub const DEFAULT_SOURCE: &str = "landing_page";

/// A stored signup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub email: String,
    /// Where the signup came from
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// Waitlist errors
#[derive(Debug, thiserror::Error)]
pub enum WaitlistError {
    #[error("Email is required")]
    EmailRequired,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("This email is already on the waitlist")]
    AlreadyRegistered,

    #[error("Failed to join waitlist: {0}")]
    Storage(String),
}

impl WaitlistError {
    /// Label used for metrics
    fn reason(&self) -> &'static str {
        match self {
            WaitlistError::EmailRequired => "missing",
            WaitlistError::InvalidEmail => "invalid",
            WaitlistError::AlreadyRegistered => "duplicate",
            WaitlistError::Storage(_) => "storage",
        }
    }
}

/// Waitlist service
#[derive(Clone)]
pub struct Waitlist {
    store: Arc<dyn WaitlistStore>,
    source: String,
}

impl Waitlist {
    pub fn new(store: Arc<dyn WaitlistStore>, source: &str) -> Self {
        Self {
            store,
            source: source.to_string(),
        }
    }

    /// Add an address to the waitlist
    pub async fn join(&self, address: Option<&str>) -> Result<WaitlistEntry, WaitlistError> {
        let result = self.try_join(address).await;
        match &result {
            Ok(entry) => {
                metrics::WAITLIST_SIGNUPS_TOTAL.inc();
                info!("Waitlist signup from {}", entry.source);
            }
            Err(err) => {
                metrics::WAITLIST_REJECTIONS_TOTAL
                    .with_label_values(&[err.reason()])
                    .inc();
                if let WaitlistError::Storage(msg) = err {
                    warn!("Waitlist insert failed: {}", msg);
                }
            }
        }
        result
    }

    async fn try_join(&self, address: Option<&str>) -> Result<WaitlistEntry, WaitlistError> {
        let raw = address
            .filter(|e| !e.trim().is_empty())
            .ok_or(WaitlistError::EmailRequired)?;

        let normalized = email::normalize(raw);
        if !email::is_valid(&normalized) {
            return Err(WaitlistError::InvalidEmail);
        }

        let entry = WaitlistEntry {
            id: Uuid::new_v4(),
            email: normalized,
            source: self.source.clone(),
            created_at: Utc::now(),
        };

        if !self.store.insert_if_absent(entry.clone()).await? {
            return Err(WaitlistError::AlreadyRegistered);
        }

        Ok(entry)
    }

    /// Number of signups
    pub async fn count(&self) -> Result<usize, WaitlistError> {
        self.store.count().await
    }
}
