// Prometheus metrics for the Ruby AI server
//
// Exposes metrics on /metrics HTTP endpoint:
// - Entitlement decisions (counter, by feature and outcome)
// - Quota units consumed (counter, by feature)
// - Conditional write conflicts (counter)
// - Usage period rollovers (counter)
// - Waitlist signups and rejections (counter)

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::{Arc, Once};

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    // Entitlement metrics
    pub static ref ENTITLEMENT_CHECKS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("entitlement_checks_total", "Total number of feature gate decisions"),
        &["feature", "outcome"]
    ).expect("Failed to create entitlement checks metric");

    pub static ref QUOTA_CONSUMED_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("quota_consumed_total", "Total number of quota units consumed"),
        &["feature", "tier"]
    ).expect("Failed to create quota consumed metric");

    pub static ref QUOTA_EXCEEDED_TOTAL: CounterVec = CounterVec::new(
        prometheus::Opts::new("quota_exceeded_total", "Total number of consumptions refused by the policy"),
        &["feature"]
    ).expect("Failed to create quota exceeded metric");

    pub static ref USAGE_WRITE_CONFLICTS_TOTAL: IntCounter = IntCounter::new(
        "usage_write_conflicts_total",
        "Total number of conditional usage writes that lost a race"
    ).expect("Failed to create usage write conflicts metric");

    pub static ref USAGE_ROLLOVERS_TOTAL: IntCounter = IntCounter::new(
        "usage_rollovers_total",
        "Total number of usage periods rolled over"
    ).expect("Failed to create usage rollovers metric");

    // Waitlist metrics
    pub static ref WAITLIST_SIGNUPS_TOTAL: IntCounter = IntCounter::new(
        "waitlist_signups_total",
        "Total number of waitlist signups"
    ).expect("Failed to create waitlist signups metric");

    pub static ref WAITLIST_REJECTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("waitlist_rejections_total", "Total number of rejected waitlist signups"),
        &["reason"]
    ).expect("Failed to create waitlist rejections metric");
}

static INIT: Once = Once::new();

fn register_all() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(ENTITLEMENT_CHECKS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUOTA_CONSUMED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUOTA_EXCEEDED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(USAGE_WRITE_CONFLICTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(USAGE_ROLLOVERS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WAITLIST_SIGNUPS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WAITLIST_REJECTIONS_TOTAL.clone()))?;
    Ok(())
}

/// Initialize metrics registry.
///
/// Safe to call more than once; registration happens on the first call only.
pub fn init() -> prometheus::Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = register_all();
    });
    result
}

/// Record a feature gate decision
pub fn record_check(feature: &str, allowed: bool) {
    let outcome = if allowed { "allowed" } else { "denied" };
    ENTITLEMENT_CHECKS_TOTAL
        .with_label_values(&[feature, outcome])
        .inc();
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}
