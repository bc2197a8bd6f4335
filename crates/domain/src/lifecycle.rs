use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::appointments::{Appointment, AppointmentStatus};
use crate::clock::Clock;
use crate::error::DomainError;
use crate::events::{EventSink, SchedulingEvent};
use crate::plans::PlanService;
use crate::ports::appointments::AppointmentStore;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CancellationOutcome {
    pub appointment: Appointment,
    /// What the client owes for cancelling, under the establishment's plan
    /// at the moment of cancellation. Zero outside the fee window.
    pub fee_cents: i64,
}

/// Post-booking transitions. Every path goes through the store's
/// compare-and-set, so a stale read can only fail, never double-apply.
#[derive(Clone)]
pub struct LifecycleService {
    appointments: Arc<dyn AppointmentStore>,
    plans: PlanService,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl LifecycleService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        plans: PlanService,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            appointments,
            plans,
            clock,
            events,
        }
    }

    /// Cancels a scheduled appointment and quotes the cancellation fee. The
    /// fee follows the plan resolved now, not the plan at booking time.
    pub async fn cancel(&self, appointment_id: &str) -> DomainResult<CancellationOutcome> {
        let appointment = self
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or(DomainError::NotFound("appointment"))?;
        if !appointment.status.can_transition_to(AppointmentStatus::Cancelled) {
            return Err(DomainError::InvalidTransition(appointment.status));
        }
        let plan = self
            .plans
            .resolve_by_owner(&appointment.establishment_id)
            .await?;
        let lead_time = appointment.scheduled_at - self.clock.now();
        let fee_cents = plan.cancellation_fee(appointment.price_cents, lead_time);
        let from = appointment.status;
        let appointment = self
            .appointments
            .update_status(appointment_id, from, AppointmentStatus::Cancelled)
            .await?;
        self.events.emit(&SchedulingEvent::FeeComputed {
            appointment_id: appointment.appointment_id.clone(),
            fee_cents,
            plan_tier: plan.tier.as_str().to_string(),
        });
        self.events.emit(&SchedulingEvent::StatusChanged {
            appointment_id: appointment.appointment_id.clone(),
            from,
            to: AppointmentStatus::Cancelled,
        });
        Ok(CancellationOutcome {
            appointment,
            fee_cents,
        })
    }

    pub async fn mark_completed(&self, appointment_id: &str) -> DomainResult<Appointment> {
        self.transition(appointment_id, AppointmentStatus::Completed)
            .await
    }

    pub async fn mark_no_show(&self, appointment_id: &str) -> DomainResult<Appointment> {
        self.transition(appointment_id, AppointmentStatus::NoShow)
            .await
    }

    async fn transition(
        &self,
        appointment_id: &str,
        to: AppointmentStatus,
    ) -> DomainResult<Appointment> {
        let appointment = self
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or(DomainError::NotFound("appointment"))?;
        if !appointment.status.can_transition_to(to) {
            return Err(DomainError::InvalidTransition(appointment.status));
        }
        let updated = self
            .appointments
            .update_status(appointment_id, appointment.status, to)
            .await?;
        self.events.emit(&SchedulingEvent::StatusChanged {
            appointment_id: updated.appointment_id.clone(),
            from: appointment.status,
            to,
        });
        Ok(updated)
    }
}
