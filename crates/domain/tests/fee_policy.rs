use slotline_domain::appointments::AppointmentStatus;
use slotline_domain::plans::{Plan, PlanTier, Subscription, SubscriptionStatus, compute_split};
use time::Duration;
use time::macros::datetime;

#[test]
fn every_tier_waives_the_fee_at_its_window_boundary() {
    let cases = [
        (PlanTier::Free, 12),
        (PlanTier::Pro, 24),
        (PlanTier::Premium, 48),
    ];
    for (tier, window_hours) in cases {
        let plan = Plan::for_tier(tier);
        assert_eq!(plan.cancellation_window_hours, window_hours);
        assert_eq!(plan.cancellation_fee(10_000, Duration::hours(window_hours.into())), 0);
        assert!(plan.cancellation_fee(10_000, Duration::hours(i64::from(window_hours) - 1)) > 0);
    }
}

#[test]
fn late_cancellations_charge_the_tier_percentage() {
    assert_eq!(
        Plan::for_tier(PlanTier::Free).cancellation_fee(10_000, Duration::hours(1)),
        4_000
    );
    assert_eq!(
        Plan::for_tier(PlanTier::Pro).cancellation_fee(10_000, Duration::hours(1)),
        5_000
    );
    assert_eq!(
        Plan::for_tier(PlanTier::Premium).cancellation_fee(10_000, Duration::hours(1)),
        6_000
    );
    // A start already behind us still charges.
    assert_eq!(
        Plan::for_tier(PlanTier::Free).cancellation_fee(10_000, Duration::hours(-3)),
        4_000
    );
}

#[test]
fn splits_sum_exactly_for_awkward_amounts() {
    for amount in [1, 99, 101, 9_999, 12_345, 1_000_001] {
        for percent in [5, 7, 10] {
            let split = compute_split(amount, percent);
            assert_eq!(split.platform_fee_cents + split.recipient_cents, amount);
            assert_eq!(split.amount_cents, amount);
        }
    }
}

#[test]
fn only_live_subscriptions_grant_their_tier() {
    let now = datetime!(2026-03-01 12:00);
    let base = Subscription {
        owner_id: "est-1".to_string(),
        tier: PlanTier::Premium,
        status: SubscriptionStatus::Active,
        expires_at: Some(datetime!(2026-06-01 00:00)),
    };

    assert!(base.grants_tier(now));
    assert!(
        Subscription {
            status: SubscriptionStatus::Trial,
            ..base.clone()
        }
        .grants_tier(now)
    );
    for status in [
        SubscriptionStatus::PastDue,
        SubscriptionStatus::Cancelled,
        SubscriptionStatus::Expired,
    ] {
        assert!(
            !Subscription {
                status,
                ..base.clone()
            }
            .grants_tier(now)
        );
    }
    // Expiry is exclusive at the instant itself.
    assert!(!base.grants_tier(datetime!(2026-06-01 00:00)));
    assert!(
        Subscription {
            expires_at: None,
            ..base
        }
        .grants_tier(now)
    );
}

#[test]
fn terminal_statuses_accept_no_further_transitions() {
    let terminal = [
        AppointmentStatus::Cancelled,
        AppointmentStatus::Completed,
        AppointmentStatus::NoShow,
    ];
    for status in terminal {
        for next in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
            AppointmentStatus::NoShow,
        ] {
            assert!(!status.can_transition_to(next));
        }
        assert!(!status.is_blocking());
    }
}
