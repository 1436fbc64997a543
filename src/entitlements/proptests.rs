//! Property-Based Tests for the Entitlement Policy
//!
//! # Running the Tests
//!
//! ```bash
//! cargo test --lib entitlements::proptests
//! ```

use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use crate::entitlements::limits::FREE_REPORTS_PER_PERIOD;
use crate::entitlements::{can_use_feature, consume_quota, Feature, Tier, UsageSnapshot};

fn arb_tier() -> impl Strategy<Value = Tier> {
    prop_oneof![Just(Tier::Free), Just(Tier::Pro)]
}

fn arb_feature() -> impl Strategy<Value = Feature> {
    prop_oneof![
        Just(Feature::Report),
        Just(Feature::AiQuestion),
        Just(Feature::SaveProperty),
        Just(Feature::ExportPdf),
    ]
}

// Dates between 2000-01-01 and roughly 2100
fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0u64..36_500).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2000, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(offset))
            .unwrap()
    })
}

fn arb_snapshot() -> impl Strategy<Value = UsageSnapshot> {
    (any::<u32>(), any::<u32>(), any::<u32>(), arb_date()).prop_map(
        |(reports_used, ai_questions_used, saved_properties, period_resets_on)| UsageSnapshot {
            reports_used,
            ai_questions_used,
            saved_properties,
            period_resets_on,
        },
    )
}

proptest! {
    #[test]
    fn prop_export_pdf_iff_pro(snapshot in arb_snapshot(), tier in arb_tier()) {
        prop_assert_eq!(
            can_use_feature(&snapshot, tier, Feature::ExportPdf),
            tier == Tier::Pro
        );
    }

    #[test]
    fn prop_free_report_gate(snapshot in arb_snapshot()) {
        prop_assert_eq!(
            can_use_feature(&snapshot, Tier::Free, Feature::Report),
            snapshot.reports_used < FREE_REPORTS_PER_PERIOD
        );
    }

    #[test]
    fn prop_pro_metered_always_allowed(snapshot in arb_snapshot()) {
        prop_assert!(can_use_feature(&snapshot, Tier::Pro, Feature::Report));
        prop_assert!(can_use_feature(&snapshot, Tier::Pro, Feature::AiQuestion));
    }

    #[test]
    fn prop_consume_agrees_with_gate(
        snapshot in arb_snapshot(),
        tier in arb_tier(),
        feature in arb_feature(),
    ) {
        let allowed = can_use_feature(&snapshot, tier, feature);
        let before = snapshot;

        match consume_quota(&snapshot, tier, feature) {
            Ok(next) => {
                prop_assert!(allowed && feature.is_consumable());
                let used_before = before.used(feature).unwrap();
                let used_after = next.used(feature).unwrap();
                prop_assert_eq!(used_after, used_before.saturating_add(1));
                prop_assert_eq!(next.period_resets_on, before.period_resets_on);
            }
            Err(_) => prop_assert!(!allowed || !feature.is_consumable()),
        }

        prop_assert_eq!(snapshot, before);
    }

    #[test]
    fn prop_rollover_idempotent(snapshot in arb_snapshot(), today in arb_date()) {
        let once = snapshot.rollover_if_due(today);
        prop_assert_eq!(once.rollover_if_due(today), once);
    }

    #[test]
    fn prop_rollover_boundary_after_today(snapshot in arb_snapshot(), today in arb_date()) {
        let rolled = snapshot.rollover_if_due(today);
        if snapshot.is_rollover_due(today) {
            prop_assert!(rolled.period_resets_on > today);
            prop_assert_eq!(rolled.reports_used, 0);
            prop_assert_eq!(rolled.ai_questions_used, 0);
            prop_assert_eq!(rolled.saved_properties, 0);
        } else {
            prop_assert_eq!(rolled, snapshot);
        }
    }
}
