use metrics::counter;
use slotline_domain::events::{EventSink, SchedulingEvent};
use tracing::{info, warn};

const BOOKINGS_CREATED_TOTAL: &str = "slotline_bookings_created_total";
const BOOKINGS_REJECTED_TOTAL: &str = "slotline_bookings_rejected_total";
const CHAINS_COMMITTED_TOTAL: &str = "slotline_chains_committed_total";
const CANCELLATION_FEE_CENTS_TOTAL: &str = "slotline_cancellation_fee_cents_total";
const STATUS_CHANGES_TOTAL: &str = "slotline_status_changes_total";
const NOTIFICATION_FAILURES_TOTAL: &str = "slotline_notification_failures_total";

/// Bridges engine events into tracing and the metrics recorder. The domain
/// stays silent; this sink is where decisions become observable.
#[derive(Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: &SchedulingEvent) {
        match event {
            SchedulingEvent::BookingCreated {
                appointment_id,
                professional_id,
                request_id,
            } => {
                info!(%appointment_id, %professional_id, %request_id, "booking created");
                counter!(BOOKINGS_CREATED_TOTAL).increment(1);
            }
            SchedulingEvent::BookingRejected {
                request_id,
                reason,
                detail,
            } => {
                warn!(%request_id, %reason, %detail, "booking rejected");
                counter!(BOOKINGS_REJECTED_TOTAL, "reason" => reason.clone()).increment(1);
            }
            SchedulingEvent::ChainCommitted {
                request_id,
                appointment_count,
                total_price_cents,
                settlement,
            } => {
                info!(
                    %request_id,
                    appointment_count = *appointment_count,
                    total_price_cents = *total_price_cents,
                    %settlement,
                    "chain committed"
                );
                counter!(CHAINS_COMMITTED_TOTAL, "settlement" => settlement.clone()).increment(1);
            }
            SchedulingEvent::FeeComputed {
                appointment_id,
                fee_cents,
                plan_tier,
            } => {
                info!(
                    %appointment_id,
                    fee_cents = *fee_cents,
                    %plan_tier,
                    "cancellation fee computed"
                );
                counter!(CANCELLATION_FEE_CENTS_TOTAL, "plan_tier" => plan_tier.clone())
                    .increment(*fee_cents as u64);
            }
            SchedulingEvent::StatusChanged {
                appointment_id,
                from,
                to,
            } => {
                info!(%appointment_id, from = from.as_str(), to = to.as_str(), "status changed");
                counter!(STATUS_CHANGES_TOTAL, "to" => to.as_str()).increment(1);
            }
            SchedulingEvent::NotificationFailed { request_id, detail } => {
                warn!(%request_id, %detail, "confirmation notification failed");
                counter!(NOTIFICATION_FAILURES_TOTAL).increment(1);
            }
        }
    }
}
