//! Entitlement Manager
//!
//! Central manager that composes the account store with the entitlement
//! policy. The policy carries no locking; at-most-once quota consumption comes
//! from the store's conditional snapshot write, retried on conflict.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::store::{AccountStore, Profile, PropertyReport, SavedProperty, StoreError};
use crate::entitlements::{
    can_save_property, can_use_feature, consume_quota, EntitlementError, Feature, Tier,
    TierLimits, UsageSnapshot,
};
use crate::metrics;

/// Default number of retries after a lost conditional write
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 5;

/// Message shown to accounts that hit a tier limit
pub const UPGRADE_MESSAGE: &str = "Upgrade to Pro to continue";

/// Errors from manager operations
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error(transparent)]
    Entitlement(#[from] EntitlementError),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Saved-property cap reached for the account's tier
    #[error("Saved property limit of {limit} reached")]
    SavedPropertyLimit { limit: u32 },

    /// Every conditional write attempt lost to a concurrent writer
    #[error("Usage update for {account_id} conflicted {attempts} times")]
    Conflict { account_id: String, attempts: u32 },

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ManagerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ManagerError::AccountNotFound(id),
            other => ManagerError::Store(other),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

/// Result of a feature gate check or a consumption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementDecision {
    /// Feature identifier as requested
    pub feature: String,

    /// Tier the decision was made against
    pub tier: Tier,

    /// Whether the action is allowed
    pub allowed: bool,

    /// Units left in the period, `None` when unlimited or not metered
    pub remaining: Option<u32>,

    /// Reason for denial (if not allowed)
    pub reason: Option<String>,
}

impl EntitlementDecision {
    /// Create an allowed decision
    pub fn allowed(feature: &str, tier: Tier, remaining: Option<u32>) -> Self {
        Self {
            feature: feature.to_string(),
            tier,
            allowed: true,
            remaining,
            reason: None,
        }
    }

    /// Create a denied decision
    pub fn denied(feature: &str, tier: Tier, remaining: Option<u32>, reason: &str) -> Self {
        Self {
            feature: feature.to_string(),
            tier,
            allowed: false,
            remaining,
            reason: Some(reason.to_string()),
        }
    }
}

/// Units left for `feature` given a snapshot and, for saves, the live count
fn remaining_for(
    limits: &TierLimits,
    usage: &UsageSnapshot,
    feature: Feature,
    saved_count: u32,
) -> Option<u32> {
    match feature {
        Feature::Report => limits.reports_per_period.remaining(usage.reports_used),
        Feature::AiQuestion => limits
            .ai_questions_per_period
            .remaining(usage.ai_questions_used),
        Feature::SaveProperty => limits.max_saved_properties.remaining(saved_count),
        Feature::ExportPdf => None,
    }
}

/// Entitlement manager
#[derive(Clone)]
pub struct EntitlementManager {
    store: Arc<dyn AccountStore>,

    max_conflict_retries: u32,
}

impl EntitlementManager {
    /// Create a new entitlement manager
    pub fn new(store: Arc<dyn AccountStore>, max_conflict_retries: u32) -> Self {
        Self {
            store,
            max_conflict_retries,
        }
    }

    /// Create with the default retry budget
    pub fn with_store(store: Arc<dyn AccountStore>) -> Self {
        Self::new(store, DEFAULT_MAX_CONFLICT_RETRIES)
    }

    /// Get the account store
    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Register a new account
    pub async fn register(&self, profile: Profile) -> ManagerResult<()> {
        info!("Registering account {} on the {} tier", profile.id, profile.tier);
        self.store.insert_profile(profile).await?;
        Ok(())
    }

    /// Load a profile with its usage period rolled over to `today`.
    ///
    /// A rollover is persisted with a conditional write; if another writer
    /// changed the snapshot in between, the profile is read again.
    pub async fn load_current(&self, account_id: &str, today: NaiveDate) -> ManagerResult<Profile> {
        for _ in 0..=self.max_conflict_retries {
            let mut profile = self
                .store
                .get_profile(account_id)
                .await?
                .ok_or_else(|| ManagerError::AccountNotFound(account_id.to_string()))?;

            let rolled = profile.usage.rollover_if_due(today);
            if rolled == profile.usage {
                return Ok(profile);
            }

            if self
                .store
                .compare_and_swap_usage(account_id, &profile.usage, rolled)
                .await?
            {
                info!(
                    "Rolled over usage period for {}, next reset on {}",
                    account_id, rolled.period_resets_on
                );
                metrics::USAGE_ROLLOVERS_TOTAL.inc();
                profile.usage = rolled;
                return Ok(profile);
            }

            metrics::USAGE_WRITE_CONFLICTS_TOTAL.inc();
            debug!("Rollover for {} lost a write race, retrying", account_id);
        }

        Err(ManagerError::Conflict {
            account_id: account_id.to_string(),
            attempts: self.max_conflict_retries + 1,
        })
    }

    /// Check whether an account may perform `feature` right now.
    ///
    /// For `save_property` the live saved-property count is compared against
    /// the tier cap here, on top of the policy's answer.
    pub async fn check(
        &self,
        account_id: &str,
        feature: Feature,
        today: NaiveDate,
    ) -> ManagerResult<EntitlementDecision> {
        let profile = self.load_current(account_id, today).await?;
        let limits = TierLimits::for_tier(profile.tier);

        let saved_count = match feature {
            Feature::SaveProperty => self.store.saved_property_count(account_id).await?,
            _ => 0,
        };

        let mut allowed = can_use_feature(&profile.usage, profile.tier, feature);
        if feature == Feature::SaveProperty {
            allowed = allowed && can_save_property(profile.tier, saved_count);
        }

        let remaining = remaining_for(&limits, &profile.usage, feature, saved_count);
        metrics::record_check(feature.as_str(), allowed);

        let decision = if allowed {
            EntitlementDecision::allowed(feature.as_str(), profile.tier, remaining)
        } else {
            EntitlementDecision::denied(feature.as_str(), profile.tier, remaining, UPGRADE_MESSAGE)
        };
        debug!(
            "Entitlement check for {}: {} -> {}",
            account_id, feature, decision.allowed
        );
        Ok(decision)
    }

    /// Check by feature identifier. Unknown identifiers are denied.
    pub async fn check_named(
        &self,
        account_id: &str,
        feature: &str,
        today: NaiveDate,
    ) -> ManagerResult<EntitlementDecision> {
        match feature.parse::<Feature>() {
            Ok(feature) => self.check(account_id, feature, today).await,
            Err(err) => {
                let profile = self.load_current(account_id, today).await?;
                metrics::record_check("unknown", false);
                Ok(EntitlementDecision::denied(
                    feature,
                    profile.tier,
                    None,
                    &err.to_string(),
                ))
            }
        }
    }

    /// Spend one unit of a metered feature and persist it.
    pub async fn consume(
        &self,
        account_id: &str,
        feature: Feature,
        today: NaiveDate,
    ) -> ManagerResult<EntitlementDecision> {
        self.spend(account_id, feature, today, None).await
    }

    /// Conditional read-modify-write of one unit. With a `report`, the report
    /// is stored in the same write as the counter, so a failed insert spends
    /// nothing.
    async fn spend(
        &self,
        account_id: &str,
        feature: Feature,
        today: NaiveDate,
        report: Option<&PropertyReport>,
    ) -> ManagerResult<EntitlementDecision> {
        for attempt in 0..=self.max_conflict_retries {
            let profile = self.load_current(account_id, today).await?;

            let next = match consume_quota(&profile.usage, profile.tier, feature) {
                Ok(next) => next,
                Err(err) => {
                    if err.is_upgrade_required() {
                        metrics::QUOTA_EXCEEDED_TOTAL
                            .with_label_values(&[feature.as_str()])
                            .inc();
                        self.store.record_usage(account_id, feature, false).await;
                    }
                    warn!("Refused {} for {}: {}", feature, account_id, err);
                    return Err(err.into());
                }
            };

            let committed = match report {
                Some(report) => {
                    self.store
                        .insert_report_with_usage(report.clone(), &profile.usage, next)
                        .await?
                }
                None => {
                    self.store
                        .compare_and_swap_usage(account_id, &profile.usage, next)
                        .await?
                }
            };

            if committed {
                self.store.record_usage(account_id, feature, true).await;
                metrics::QUOTA_CONSUMED_TOTAL
                    .with_label_values(&[feature.as_str(), profile.tier.as_str()])
                    .inc();

                let limits = TierLimits::for_tier(profile.tier);
                let remaining = remaining_for(&limits, &next, feature, 0);
                return Ok(EntitlementDecision::allowed(
                    feature.as_str(),
                    profile.tier,
                    remaining,
                ));
            }

            metrics::USAGE_WRITE_CONFLICTS_TOTAL.inc();
            debug!(
                "Usage write for {} conflicted (attempt {}), retrying",
                account_id,
                attempt + 1
            );
        }

        warn!("Giving up on {} for {} after repeated conflicts", feature, account_id);
        Err(ManagerError::Conflict {
            account_id: account_id.to_string(),
            attempts: self.max_conflict_retries + 1,
        })
    }

    /// Generate a property report, spending one `report` unit
    pub async fn generate_report(
        &self,
        account_id: &str,
        address: &str,
        today: NaiveDate,
    ) -> ManagerResult<PropertyReport> {
        let report = PropertyReport::new(account_id, address);
        self.spend(account_id, Feature::Report, today, Some(&report))
            .await?;
        info!("Generated report {} for {}", report.id, account_id);
        Ok(report)
    }

    /// Ask an AI question, spending one `ai_question` unit
    pub async fn ask_ai_question(
        &self,
        account_id: &str,
        today: NaiveDate,
    ) -> ManagerResult<EntitlementDecision> {
        self.consume(account_id, Feature::AiQuestion, today).await
    }

    /// Save a property if the tier's saved-property cap allows one more
    pub async fn save_property(
        &self,
        account_id: &str,
        address: &str,
        notes: Option<String>,
        tags: Vec<String>,
        today: NaiveDate,
    ) -> ManagerResult<SavedProperty> {
        // Rollover first so the period counter bump lands in the current period
        let profile = self.load_current(account_id, today).await?;
        let cap = TierLimits::for_tier(profile.tier).max_saved_properties;

        let property = SavedProperty::new(account_id, address, notes, tags);
        if !self
            .store
            .insert_saved_property_if_below(property.clone(), cap)
            .await?
        {
            warn!("Account {} reached the saved property limit", account_id);
            return Err(ManagerError::SavedPropertyLimit {
                limit: cap.cap().unwrap_or(u32::MAX),
            });
        }

        info!("Saved property {} for {}", property.id, account_id);
        Ok(property)
    }

    /// Apply a billing tier change. Counters are not reset.
    pub async fn set_tier(&self, account_id: &str, tier: Tier) -> ManagerResult<()> {
        self.store.set_tier(account_id, tier).await?;
        info!("Account {} moved to the {} tier", account_id, tier);
        Ok(())
    }
}
