//! Entitlement Error Types

use super::feature::Feature;
use super::tier::Tier;

/// Error types for entitlement decisions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntitlementError {
    /// Feature identifier outside the known set
    #[error("Invalid feature: {0}. Must be one of: report, ai_question, save_property, export_pdf")]
    InvalidFeature(String),

    /// Consumption attempted while the policy denies the feature
    #[error("Quota exceeded for {feature} on the {tier} tier")]
    QuotaExceeded { feature: Feature, tier: Tier },

    /// Only `report` and `ai_question` carry counters
    #[error("Feature {0} has no usage counter to consume")]
    NotConsumable(Feature),
}

impl EntitlementError {
    /// Whether the caller should prompt the account to upgrade
    pub fn is_upgrade_required(&self) -> bool {
        matches!(self, EntitlementError::QuotaExceeded { .. })
    }
}
