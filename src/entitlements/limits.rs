//! Quota Table
//!
//! Process-wide limits for each tier.

use serde::{Deserialize, Serialize};

use super::tier::Tier;

/// Free tier: reports per period
pub const FREE_REPORTS_PER_PERIOD: u32 = 5;
/// Free tier: AI questions per period
pub const FREE_AI_QUESTIONS_PER_PERIOD: u32 = 10;
/// Free tier: saved properties held at once
pub const FREE_MAX_SAVED_PROPERTIES: u32 = 10;

/// A per-period or absolute cap on a counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Limit {
    /// At most this many
    Limited(u32),
    /// No cap
    Unlimited,
}

impl Limit {
    /// Whether one more unit is allowed when `used` units are already spent
    pub fn allows(&self, used: u32) -> bool {
        match self {
            Limit::Limited(max) => used < *max,
            Limit::Unlimited => true,
        }
    }

    /// Units left, or `None` when unlimited
    pub fn remaining(&self, used: u32) -> Option<u32> {
        match self {
            Limit::Limited(max) => Some(max.saturating_sub(used)),
            Limit::Unlimited => None,
        }
    }

    /// The cap itself, `None` when unlimited
    pub fn cap(&self) -> Option<u32> {
        match self {
            Limit::Limited(max) => Some(*max),
            Limit::Unlimited => None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }
}

/// Limits for a single tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// The tier these limits apply to
    pub tier: Tier,

    /// Reports per usage period
    pub reports_per_period: Limit,

    /// AI questions per usage period
    pub ai_questions_per_period: Limit,

    /// Saved properties held at once
    pub max_saved_properties: Limit,

    /// Whether PDF export is enabled
    pub can_export_pdf: bool,
}

impl TierLimits {
    /// Get the limits for a specific tier.
    ///
    /// | Tier | Reports | AI questions | Saved properties | PDF export |
    /// |------|---------|--------------|------------------|------------|
    /// | Free | 5 | 10 | 10 | No |
    /// | Pro | Unlimited | Unlimited | Unlimited | Yes |
    pub const fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free => Self {
                tier,
                reports_per_period: Limit::Limited(FREE_REPORTS_PER_PERIOD),
                ai_questions_per_period: Limit::Limited(FREE_AI_QUESTIONS_PER_PERIOD),
                max_saved_properties: Limit::Limited(FREE_MAX_SAVED_PROPERTIES),
                can_export_pdf: false,
            },
            Tier::Pro => Self {
                tier,
                reports_per_period: Limit::Unlimited,
                ai_questions_per_period: Limit::Unlimited,
                max_saved_properties: Limit::Unlimited,
                can_export_pdf: true,
            },
        }
    }

    /// The whole table, cheapest tier first
    pub fn table() -> Vec<TierLimits> {
        Tier::ALL.iter().map(|t| Self::for_tier(*t)).collect()
    }
}
