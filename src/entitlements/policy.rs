//! Entitlement Policy
//!
//! Pure decisions over a tier and a usage snapshot. A counter is only ever
//! compared against the limits of the tier passed in, so a mid-period tier
//! change takes effect immediately on the existing counters.

use super::error::EntitlementError;
use super::feature::Feature;
use super::limits::TierLimits;
use super::tier::Tier;
use super::usage::UsageSnapshot;

/// Whether the account may currently perform `feature`.
///
/// `save_property` is always `true` here: this answers whether the feature is
/// enabled, and the live saved-property count is checked separately with
/// [`can_save_property`].
pub fn can_use_feature(snapshot: &UsageSnapshot, tier: Tier, feature: Feature) -> bool {
    let limits = TierLimits::for_tier(tier);

    match feature {
        Feature::Report => limits.reports_per_period.allows(snapshot.reports_used),
        Feature::AiQuestion => limits
            .ai_questions_per_period
            .allows(snapshot.ai_questions_used),
        Feature::SaveProperty => true,
        Feature::ExportPdf => limits.can_export_pdf,
    }
}

/// String-keyed variant of [`can_use_feature`].
///
/// Unknown identifiers are denied rather than reported.
pub fn can_use_feature_named(snapshot: &UsageSnapshot, tier: Tier, feature: &str) -> bool {
    match feature.parse::<Feature>() {
        Ok(feature) => can_use_feature(snapshot, tier, feature),
        Err(err) => {
            tracing::debug!("Denying unknown feature: {}", err);
            false
        }
    }
}

/// Whether one more property may be saved when `saved_count` are already held
pub fn can_save_property(tier: Tier, saved_count: u32) -> bool {
    TierLimits::for_tier(tier)
        .max_saved_properties
        .allows(saved_count)
}

/// Spend one unit of a metered feature.
///
/// Returns the updated snapshot; `snapshot` itself is left as it was. Fails
/// with [`EntitlementError::QuotaExceeded`] when the policy denies the feature
/// and with [`EntitlementError::NotConsumable`] for features without a counter.
pub fn consume_quota(
    snapshot: &UsageSnapshot,
    tier: Tier,
    feature: Feature,
) -> Result<UsageSnapshot, EntitlementError> {
    if !feature.is_consumable() {
        return Err(EntitlementError::NotConsumable(feature));
    }

    if !can_use_feature(snapshot, tier, feature) {
        return Err(EntitlementError::QuotaExceeded { feature, tier });
    }

    Ok(snapshot.incremented(feature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snapshot(reports: u32, questions: u32) -> UsageSnapshot {
        UsageSnapshot {
            reports_used: reports,
            ai_questions_used: questions,
            saved_properties: 0,
            period_resets_on: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
        }
    }

    #[test]
    fn test_export_pdf_only_for_pro() {
        let s = snapshot(0, 0);
        assert!(!can_use_feature(&s, Tier::Free, Feature::ExportPdf));
        assert!(can_use_feature(&s, Tier::Pro, Feature::ExportPdf));
    }

    #[test]
    fn test_export_pdf_ignores_counters() {
        let s = snapshot(1_000, 1_000);
        assert!(can_use_feature(&s, Tier::Pro, Feature::ExportPdf));
    }

    #[test]
    fn test_free_report_limit() {
        for used in 0..5 {
            assert!(can_use_feature(&snapshot(used, 0), Tier::Free, Feature::Report));
        }
        assert!(!can_use_feature(&snapshot(5, 0), Tier::Free, Feature::Report));
        assert!(!can_use_feature(&snapshot(6, 0), Tier::Free, Feature::Report));
    }

    #[test]
    fn test_free_ai_question_limit() {
        assert!(can_use_feature(&snapshot(0, 9), Tier::Free, Feature::AiQuestion));
        assert!(!can_use_feature(&snapshot(0, 10), Tier::Free, Feature::AiQuestion));
    }

    #[test]
    fn test_pro_unbounded() {
        let s = snapshot(10_000, 10_000);
        assert!(can_use_feature(&s, Tier::Pro, Feature::Report));
        assert!(can_use_feature(&s, Tier::Pro, Feature::AiQuestion));
    }

    #[test]
    fn test_save_property_always_enabled() {
        let mut s = snapshot(0, 0);
        s.saved_properties = 500;
        assert!(can_use_feature(&s, Tier::Free, Feature::SaveProperty));
        assert!(can_use_feature(&s, Tier::Pro, Feature::SaveProperty));
    }

    #[test]
    fn test_can_save_property() {
        assert!(can_save_property(Tier::Free, 9));
        assert!(!can_save_property(Tier::Free, 10));
        assert!(can_save_property(Tier::Pro, 10_000));
    }

    #[test]
    fn test_named_unknown_feature_denied() {
        let s = snapshot(0, 0);
        assert!(!can_use_feature_named(&s, Tier::Pro, "bulk_export"));
        assert!(!can_use_feature_named(&s, Tier::Free, ""));
    }

    #[test]
    fn test_named_known_feature() {
        let s = snapshot(0, 0);
        assert!(can_use_feature_named(&s, Tier::Free, "report"));
        assert!(!can_use_feature_named(&s, Tier::Free, "export_pdf"));
    }

    #[test]
    fn test_consume_increments_by_one() {
        let s = snapshot(4, 0);
        let next = consume_quota(&s, Tier::Free, Feature::Report).unwrap();

        assert_eq!(next.reports_used, 5);
        assert_eq!(s.reports_used, 4);
        assert!(!can_use_feature(&next, Tier::Free, Feature::Report));
    }

    #[test]
    fn test_consume_at_limit_fails() {
        let s = snapshot(5, 0);
        let err = consume_quota(&s, Tier::Free, Feature::Report).unwrap_err();

        assert_eq!(
            err,
            EntitlementError::QuotaExceeded {
                feature: Feature::Report,
                tier: Tier::Free
            }
        );
        assert!(err.is_upgrade_required());
        assert_eq!(s, snapshot(5, 0));
    }

    #[test]
    fn test_consume_non_consumable() {
        let s = snapshot(0, 0);
        assert_eq!(
            consume_quota(&s, Tier::Pro, Feature::ExportPdf).unwrap_err(),
            EntitlementError::NotConsumable(Feature::ExportPdf)
        );
        assert_eq!(
            consume_quota(&s, Tier::Free, Feature::SaveProperty).unwrap_err(),
            EntitlementError::NotConsumable(Feature::SaveProperty)
        );
    }

    #[test]
    fn test_tier_change_applies_to_existing_counters() {
        // Counters carried over from a pro period are judged by free limits after a downgrade
        let s = snapshot(7, 12);
        assert!(can_use_feature(&s, Tier::Pro, Feature::Report));
        assert!(!can_use_feature(&s, Tier::Free, Feature::Report));
        assert!(!can_use_feature(&s, Tier::Free, Feature::AiQuestion));
    }

    #[test]
    fn test_five_report_cycle() {
        let mut s = snapshot(0, 0);

        for expected in 1..=5 {
            assert!(can_use_feature(&s, Tier::Free, Feature::Report));
            s = consume_quota(&s, Tier::Free, Feature::Report).unwrap();
            assert_eq!(s.reports_used, expected);
        }

        assert!(!can_use_feature(&s, Tier::Free, Feature::Report));
    }
}
