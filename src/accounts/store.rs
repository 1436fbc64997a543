//! Account Store
//!
//! Persistence seam for profiles and their usage snapshots, plus an
//! in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entitlements::{Feature, Limit, Tier, UsageSnapshot};

/// Maximum usage records kept in memory
pub const MAX_USAGE_HISTORY: usize = 10_000;

/// Account profile with its current usage snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Account identifier supplied by the identity provider
    pub id: String,

    pub email: String,

    pub full_name: Option<String>,

    /// Current billing tier
    pub tier: Tier,

    /// Usage counters for the current period
    pub usage: UsageSnapshot,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Create a free-tier profile whose first period contains `today`
    pub fn new(id: &str, email: &str, today: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            email: email.to_string(),
            full_name: None,
            tier: Tier::Free,
            usage: UsageSnapshot::starting(today),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the display name
    pub fn with_full_name(mut self, full_name: &str) -> Self {
        self.full_name = Some(full_name.to_string());
        self
    }

    /// Set the tier
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// First word of the full name, for greetings
    pub fn first_name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .and_then(|name| name.split_whitespace().next())
    }
}

/// A property in an account's portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedProperty {
    pub id: Uuid,
    pub user_id: String,
    pub address: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl SavedProperty {
    pub fn new(user_id: &str, address: &str, notes: Option<String>, tags: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            address: address.to_string(),
            notes,
            tags,
            created_at: Utc::now(),
        }
    }
}

/// A generated property report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyReport {
    pub id: Uuid,
    pub user_id: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl PropertyReport {
    pub fn new(user_id: &str, address: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            address: address.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Record of a quota consumption attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub account_id: String,

    pub feature: Feature,

    pub timestamp: DateTime<Utc>,

    /// Whether the unit was granted
    pub success: bool,
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Account already exists: {0}")]
    AlreadyExists(String),

    /// Failure in the underlying storage
    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for profiles, usage snapshots, saved properties and reports.
///
/// Snapshot writes are conditional. `compare_and_swap_usage`,
/// `insert_report_with_usage` and `insert_saved_property_if_below` must each
/// be atomic with respect to other writers of the same account.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_profile(&self, account_id: &str) -> StoreResult<Option<Profile>>;

    async fn insert_profile(&self, profile: Profile) -> StoreResult<()>;

    /// Replace the snapshot only if it still equals `expected`.
    ///
    /// Returns `false` when another writer got there first.
    async fn compare_and_swap_usage(
        &self,
        account_id: &str,
        expected: &UsageSnapshot,
        new: UsageSnapshot,
    ) -> StoreResult<bool>;

    /// Change the tier. Usage counters are left as they are.
    async fn set_tier(&self, account_id: &str, tier: Tier) -> StoreResult<()>;

    async fn saved_property_count(&self, account_id: &str) -> StoreResult<u32>;

    /// Insert `property` while the owner holds fewer than `cap` saved
    /// properties, and bump the period's `saved_properties` counter.
    ///
    /// The count, the insert and the counter bump happen as one step.
    /// Returns `false` when the cap is already reached.
    async fn insert_saved_property_if_below(
        &self,
        property: SavedProperty,
        cap: Limit,
    ) -> StoreResult<bool>;

    /// Newest first
    async fn recent_saved_properties(
        &self,
        account_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<SavedProperty>>;

    /// Insert `report` and replace the snapshot with `new`, only if the
    /// snapshot still equals `expected`. Neither write happens alone.
    async fn insert_report_with_usage(
        &self,
        report: PropertyReport,
        expected: &UsageSnapshot,
        new: UsageSnapshot,
    ) -> StoreResult<bool>;

    /// Newest first
    async fn recent_reports(&self, account_id: &str, limit: usize)
        -> StoreResult<Vec<PropertyReport>>;

    async fn record_usage(&self, account_id: &str, feature: Feature, success: bool);
}

/// In-memory account store
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountStore {
    profiles: Arc<RwLock<HashMap<String, Profile>>>,

    saved_properties: Arc<RwLock<HashMap<String, Vec<SavedProperty>>>>,

    reports: Arc<RwLock<HashMap<String, Vec<PropertyReport>>>>,

    /// Usage history (for analytics)
    usage_history: Arc<RwLock<Vec<UsageRecord>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get usage history for an account
    pub async fn get_usage_history(&self, account_id: &str) -> Vec<UsageRecord> {
        let history = self.usage_history.read().await;
        history
            .iter()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect()
    }

    /// Get profile count
    pub async fn count(&self) -> usize {
        self.profiles.read().await.len()
    }
}

fn newest_first<T: Clone>(items: Option<&Vec<T>>, limit: usize) -> Vec<T> {
    items
        .map(|v| v.iter().rev().take(limit).cloned().collect())
        .unwrap_or_default()
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get_profile(&self, account_id: &str) -> StoreResult<Option<Profile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(account_id).cloned())
    }

    async fn insert_profile(&self, profile: Profile) -> StoreResult<()> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.id) {
            return Err(StoreError::AlreadyExists(profile.id));
        }
        profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn compare_and_swap_usage(
        &self,
        account_id: &str,
        expected: &UsageSnapshot,
        new: UsageSnapshot,
    ) -> StoreResult<bool> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(account_id)
            .ok_or_else(|| StoreError::NotFound(account_id.to_string()))?;

        if profile.usage != *expected {
            return Ok(false);
        }

        profile.usage = new;
        profile.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_tier(&self, account_id: &str, tier: Tier) -> StoreResult<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(account_id)
            .ok_or_else(|| StoreError::NotFound(account_id.to_string()))?;

        profile.tier = tier;
        profile.updated_at = Utc::now();
        Ok(())
    }

    async fn saved_property_count(&self, account_id: &str) -> StoreResult<u32> {
        let saved = self.saved_properties.read().await;
        let count = saved.get(account_id).map(|v| v.len()).unwrap_or(0);
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn insert_saved_property_if_below(
        &self,
        property: SavedProperty,
        cap: Limit,
    ) -> StoreResult<bool> {
        // Lock order: profiles, then saved properties
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&property.user_id)
            .ok_or_else(|| StoreError::NotFound(property.user_id.clone()))?;

        let mut saved = self.saved_properties.write().await;
        let owned = saved.entry(property.user_id.clone()).or_default();
        if !cap.allows(u32::try_from(owned.len()).unwrap_or(u32::MAX)) {
            return Ok(false);
        }

        owned.push(property);
        profile.usage = profile.usage.with_saved_property();
        profile.updated_at = Utc::now();
        Ok(true)
    }

    async fn recent_saved_properties(
        &self,
        account_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<SavedProperty>> {
        let saved = self.saved_properties.read().await;
        Ok(newest_first(saved.get(account_id), limit))
    }

    async fn insert_report_with_usage(
        &self,
        report: PropertyReport,
        expected: &UsageSnapshot,
        new: UsageSnapshot,
    ) -> StoreResult<bool> {
        // Lock order: profiles, then reports
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&report.user_id)
            .ok_or_else(|| StoreError::NotFound(report.user_id.clone()))?;

        if profile.usage != *expected {
            return Ok(false);
        }

        let mut reports = self.reports.write().await;
        reports
            .entry(report.user_id.clone())
            .or_default()
            .push(report);
        profile.usage = new;
        profile.updated_at = Utc::now();
        Ok(true)
    }

    async fn recent_reports(
        &self,
        account_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<PropertyReport>> {
        let reports = self.reports.read().await;
        Ok(newest_first(reports.get(account_id), limit))
    }

    async fn record_usage(&self, account_id: &str, feature: Feature, success: bool) {
        let record = UsageRecord {
            account_id: account_id.to_string(),
            feature,
            timestamp: Utc::now(),
            success,
        };

        let mut history = self.usage_history.write().await;
        history.push(record);

        if history.len() > MAX_USAGE_HISTORY {
            let excess = history.len() - MAX_USAGE_HISTORY;
            history.drain(0..excess);
        }
    }
}
