use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::appointments::AppointmentStatus;

/// Structured audit record of what the engine decided. Services hand these
/// to an injected sink; the engine itself never logs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulingEvent {
    BookingCreated {
        appointment_id: String,
        professional_id: String,
        request_id: String,
    },
    BookingRejected {
        request_id: String,
        reason: String,
        detail: String,
    },
    ChainCommitted {
        request_id: String,
        appointment_count: usize,
        total_price_cents: i64,
        settlement: String,
    },
    FeeComputed {
        appointment_id: String,
        fee_cents: i64,
        plan_tier: String,
    },
    StatusChanged {
        appointment_id: String,
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    NotificationFailed {
        request_id: String,
        detail: String,
    },
}

impl SchedulingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BookingCreated { .. } => "booking_created",
            Self::BookingRejected { .. } => "booking_rejected",
            Self::ChainCommitted { .. } => "chain_committed",
            Self::FeeComputed { .. } => "fee_computed",
            Self::StatusChanged { .. } => "status_changed",
            Self::NotificationFailed { .. } => "notification_failed",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SchedulingEvent);
}

#[derive(Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: &SchedulingEvent) {}
}

/// Captures emitted events for assertions.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<SchedulingEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<SchedulingEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.snapshot().iter().map(SchedulingEvent::name).collect()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: &SchedulingEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
