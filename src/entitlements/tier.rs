//! Account Tiers
//!
//! The billing plan an account is on. Tiers are set by billing events and are
//! read-only from the policy's point of view.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Billing plan of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Metered plan
    #[default]
    Free,
    /// Paid plan with unlimited counters and PDF export
    Pro,
}

impl Tier {
    /// All known tiers, cheapest first
    pub const ALL: [Tier; 2] = [Tier::Free, Tier::Pro];

    /// Lowercase identifier as stored in profiles
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, Tier::Pro)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            other => Err(format!("Unknown tier: {}. Must be 'free' or 'pro'", other)),
        }
    }
}
