//! Usage Entitlements Module
//!
//! This module decides what an account is allowed to do, given its billing
//! tier and a snapshot of its usage counters for the current period.
//!
//! # Features
//!
//! - Constant quota table per tier (`free`, `pro`)
//! - Feature gates for reports, AI questions, saved properties and PDF export
//! - Immutable quota consumption for the metered features
//! - Calendar-month period rollover
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Entitlement Policy                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐          │
//! │  │ Tier        │  │ Quota Table │  │ Feature     │          │
//! │  │             │  │ (Limits)    │  │ Gates       │          │
//! │  └─────────────┘  └─────────────┘  └─────────────┘          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │         Usage Snapshot (read / consume / rollover)  │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in here performs I/O. Reading and writing snapshots belongs to
//! [`crate::accounts`].

pub mod error;
pub mod feature;
pub mod limits;
pub mod policy;
pub mod tier;
pub mod usage;

#[cfg(test)]
mod proptests;

pub use error::EntitlementError;
pub use feature::Feature;
pub use limits::{Limit, TierLimits};
pub use policy::{can_save_property, can_use_feature, can_use_feature_named, consume_quota};
pub use tier::Tier;
pub use usage::UsageSnapshot;
