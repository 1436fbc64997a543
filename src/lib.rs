//! Ruby AI Server Library
//!
//! This library provides the backend for the Ruby AI real-estate investment
//! product: the usage entitlement policy, account usage tracking on top of
//! it, waitlist capture, and the HTTP API that exposes them.

pub mod accounts;
pub mod config;
pub mod entitlements;
pub mod metrics;
pub mod server;
pub mod waitlist;
