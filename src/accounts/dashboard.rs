//! Account Dashboard
//!
//! Data for the signed-in dashboard: greeting, tier, usage against limits,
//! which actions are currently open, and the latest saved properties and
//! reports.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::manager::{EntitlementDecision, EntitlementManager, ManagerResult};
use super::store::{PropertyReport, SavedProperty};
use crate::entitlements::{Feature, Tier, TierLimits, UsageSnapshot};

/// Number of recent items shown per list
pub const RECENT_ITEMS: usize = 5;

/// Dashboard data for one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDashboard {
    /// Timestamp of data generation
    pub timestamp: DateTime<Utc>,

    pub account_id: String,

    /// Name used in the greeting
    pub first_name: String,

    pub tier: Tier,

    /// Usage after any period rollover
    pub usage: UsageSnapshot,

    /// Limits for the current tier
    pub limits: TierLimits,

    /// Gate state for every feature
    pub features: Vec<EntitlementDecision>,

    pub saved_property_count: u32,

    pub recent_saved_properties: Vec<SavedProperty>,

    pub recent_reports: Vec<PropertyReport>,

    /// Upgrade call to action, absent on paid tiers
    pub upgrade_prompt: Option<String>,
}

/// Dashboard builder for constructing dashboard data
pub struct DashboardBuilder {
    manager: EntitlementManager,
}

impl DashboardBuilder {
    pub fn new(manager: EntitlementManager) -> Self {
        Self { manager }
    }

    /// Build dashboard data for an account as of `today`
    pub async fn build(&self, account_id: &str, today: NaiveDate) -> ManagerResult<AccountDashboard> {
        let profile = self.manager.load_current(account_id, today).await?;
        let store = self.manager.store();

        let mut features = Vec::with_capacity(Feature::ALL.len());
        for feature in Feature::ALL {
            features.push(self.manager.check(account_id, feature, today).await?);
        }

        let saved_property_count = store.saved_property_count(account_id).await?;
        let recent_saved_properties = store
            .recent_saved_properties(account_id, RECENT_ITEMS)
            .await?;
        let recent_reports = store.recent_reports(account_id, RECENT_ITEMS).await?;

        let upgrade_prompt = if profile.tier.is_paid() {
            None
        } else {
            Some("Upgrade to Pro to unlock all features".to_string())
        };

        Ok(AccountDashboard {
            timestamp: Utc::now(),
            account_id: profile.id.clone(),
            first_name: profile.first_name().unwrap_or("there").to_string(),
            tier: profile.tier,
            usage: profile.usage,
            limits: TierLimits::for_tier(profile.tier),
            features,
            saved_property_count,
            recent_saved_properties,
            recent_reports,
            upgrade_prompt,
        })
    }
}

impl AccountDashboard {
    /// Decision for a single feature
    pub fn feature(&self, feature: Feature) -> Option<&EntitlementDecision> {
        self.features.iter().find(|d| d.feature == feature.as_str())
    }
}
