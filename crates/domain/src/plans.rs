use std::sync::Arc;
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Duration, PrimitiveDateTime};

use crate::DomainResult;
use crate::clock::Clock;
use crate::ports::subscriptions::SubscriptionStore;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Pro,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanTierParseError {
    Unknown,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Premium => "premium",
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = PlanTierParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "premium" => Ok(Self::Premium),
            _ => Err(PlanTierParseError::Unknown),
        }
    }
}

/// Policy row for a subscription tier. The catalog is static: tiers change
/// by releasing new code, not data.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Plan {
    pub tier: PlanTier,
    pub cancellation_window_hours: u32,
    pub cancellation_fee_percent: u8,
    pub platform_fee_percent: u8,
    pub requires_prepayment: bool,
}

impl Plan {
    pub fn for_tier(tier: PlanTier) -> Self {
        match tier {
            PlanTier::Free => Self {
                tier,
                cancellation_window_hours: 12,
                cancellation_fee_percent: 40,
                platform_fee_percent: 10,
                requires_prepayment: false,
            },
            PlanTier::Pro => Self {
                tier,
                cancellation_window_hours: 24,
                cancellation_fee_percent: 50,
                platform_fee_percent: 7,
                requires_prepayment: true,
            },
            PlanTier::Premium => Self {
                tier,
                cancellation_window_hours: 48,
                cancellation_fee_percent: 60,
                platform_fee_percent: 5,
                requires_prepayment: true,
            },
        }
    }

    /// Fee owed for cancelling with the given lead time. Cancelling at or
    /// before the window boundary is free; inside the window the fee is a
    /// half-up percentage of the booked price.
    pub fn cancellation_fee(&self, price_cents: i64, lead_time: Duration) -> i64 {
        if lead_time >= Duration::hours(i64::from(self.cancellation_window_hours)) {
            return 0;
        }
        percent_of(price_cents, self.cancellation_fee_percent)
    }
}

/// Half-up integer percentage, for non-negative amounts.
pub fn percent_of(amount_cents: i64, percent: u8) -> i64 {
    (amount_cents * i64::from(percent) + 50) / 100
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentSplit {
    pub amount_cents: i64,
    pub platform_fee_cents: i64,
    pub recipient_cents: i64,
}

/// The recipient share is the remainder, so both parts always sum exactly
/// to the amount.
pub fn compute_split(amount_cents: i64, platform_fee_percent: u8) -> PaymentSplit {
    let platform_fee_cents = percent_of(amount_cents, platform_fee_percent);
    PaymentSplit {
        amount_cents,
        platform_fee_cents,
        recipient_cents: amount_cents - platform_fee_cents,
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trial,
    PastDue,
    Cancelled,
    Expired,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub owner_id: String,
    pub tier: PlanTier,
    pub status: SubscriptionStatus,
    pub expires_at: Option<PrimitiveDateTime>,
}

impl Subscription {
    /// A subscription grants its tier only while active or trialing and not
    /// past its expiry. Everything else falls back to the free plan.
    pub fn grants_tier(&self, now: PrimitiveDateTime) -> bool {
        if !matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Trial
        ) {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}

#[derive(Clone)]
pub struct PlanService {
    subscriptions: Arc<dyn SubscriptionStore>,
    clock: Arc<dyn Clock>,
}

impl PlanService {
    pub fn new(subscriptions: Arc<dyn SubscriptionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            subscriptions,
            clock,
        }
    }

    pub async fn resolve_by_owner(&self, owner_id: &str) -> DomainResult<Plan> {
        let now = self.clock.now();
        let tier = self
            .subscriptions
            .find_by_owner(owner_id)
            .await?
            .filter(|subscription| subscription.grants_tier(now))
            .map(|subscription| subscription.tier)
            .unwrap_or(PlanTier::Free);
        Ok(Plan::for_tier(tier))
    }
}
