//! Accounts Module
//!
//! Edge composition around the entitlement policy: read a usage snapshot from
//! the account store, roll the period over, ask the policy, and write the
//! result back with a conditional update.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Entitlement Manager                      │
//! │   read snapshot ─▶ rollover ─▶ policy ─▶ conditional write  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │   Account Store (profiles, saved properties,        │    │
//! │  │   reports, usage history)                           │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod dashboard;
pub mod manager;
pub mod store;

pub use dashboard::AccountDashboard;
pub use manager::{EntitlementDecision, EntitlementManager, ManagerError};
pub use store::{AccountStore, InMemoryAccountStore, Profile, PropertyReport, SavedProperty};
