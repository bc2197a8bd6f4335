//! Booking orchestration: validation ladder, conflict checks, settlement
//! resolution and post-commit side effects. Persistence-level races are the
//! store's problem; this layer sequences the checks and snapshots pricing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::{Duration, PrimitiveDateTime, Time};

use crate::DomainResult;
use crate::appointments::{Appointment, AppointmentStatus, AppointmentSummary};
use crate::catalog::{self, Service, ServiceAssignment};
use crate::clock::Clock;
use crate::conflict;
use crate::credits::CreditSpend;
use crate::error::DomainError;
use crate::events::{EventSink, SchedulingEvent};
use crate::plans::{self, PaymentSplit, PlanService};
use crate::ports::appointments::AppointmentStore;
use crate::ports::catalog::ServiceCatalog;
use crate::ports::credits::CreditLedger;
use crate::ports::notify::NotificationSender;
use crate::ports::payment::PaymentGateway;
use crate::ports::schedule::ScheduleStore;
use crate::schedule::DayOfWeek;
use crate::util::{now_ms, uuid_v7_without_dashes};

/// Starts at most this far in the past are still accepted, absorbing clock
/// skew between callers and the engine.
pub const PAST_TOLERANCE_MINUTES: i64 = 2;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingRequest {
    pub request_id: String,
    pub requester_id: String,
    pub establishment_id: String,
    pub service_id: String,
    /// `None` lets the service's default professional take the visit.
    pub professional_id: Option<String>,
    pub scheduled_at: PrimitiveDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainRequest {
    pub request_id: String,
    pub requester_id: String,
    pub establishment_id: String,
    pub assignments: Vec<ServiceAssignment>,
    pub first_start: PrimitiveDateTime,
}

/// How a committed chain gets paid.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainSettlement {
    CreditConsumed { credit_id: String, units: u32 },
    DepositPending(PendingPayment),
    PayAtVenue,
}

impl ChainSettlement {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreditConsumed { .. } => "credit_consumed",
            Self::DepositPending(_) => "deposit_pending",
            Self::PayAtVenue => "pay_at_venue",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BookingChain {
    pub appointments: Vec<Appointment>,
    pub total_price_cents: i64,
    pub settlement: ChainSettlement,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DepositRequest {
    pub request_id: String,
    pub user_id: String,
    pub establishment_id: String,
    pub split: PaymentSplit,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PendingPayment {
    pub payment_id: String,
    pub request_id: String,
    pub split: PaymentSplit,
}

#[derive(Clone)]
pub struct BookingService {
    schedules: Arc<dyn ScheduleStore>,
    appointments: Arc<dyn AppointmentStore>,
    catalog: Arc<dyn ServiceCatalog>,
    credits: Arc<dyn CreditLedger>,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationSender>,
    plans: PlanService,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl BookingService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        appointments: Arc<dyn AppointmentStore>,
        catalog: Arc<dyn ServiceCatalog>,
        credits: Arc<dyn CreditLedger>,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationSender>,
        plans: PlanService,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            schedules,
            appointments,
            catalog,
            credits,
            payments,
            notifier,
            plans,
            clock,
            events,
        }
    }

    /// Books a single service. On success the appointment is persisted with
    /// status `scheduled`, a creation event is emitted and a confirmation is
    /// attempted; rejections emit an event carrying the error kind.
    pub async fn create_appointment(&self, request: &BookingRequest) -> DomainResult<Appointment> {
        match self.create_appointment_inner(request).await {
            Ok(appointment) => {
                self.events.emit(&SchedulingEvent::BookingCreated {
                    appointment_id: appointment.appointment_id.clone(),
                    professional_id: appointment.professional_id.clone(),
                    request_id: appointment.request_id.clone(),
                });
                self.send_confirmation(&request.request_id, &[appointment.summary()])
                    .await;
                Ok(appointment)
            }
            Err(err) => {
                self.emit_rejection(&request.request_id, &err);
                Err(err)
            }
        }
    }

    /// Books several services back to back as one visit. Steps are laid out
    /// cursor-style from `first_start`, each validated against its own
    /// professional; the chain persists atomically together with any credit
    /// consumption, or not at all.
    pub async fn create_chained_booking(
        &self,
        request: &ChainRequest,
    ) -> DomainResult<BookingChain> {
        match self.create_chain_inner(request).await {
            Ok(chain) => {
                self.events.emit(&SchedulingEvent::ChainCommitted {
                    request_id: request.request_id.clone(),
                    appointment_count: chain.appointments.len(),
                    total_price_cents: chain.total_price_cents,
                    settlement: chain.settlement.label().to_string(),
                });
                let summaries: Vec<AppointmentSummary> =
                    chain.appointments.iter().map(Appointment::summary).collect();
                self.send_confirmation(&request.request_id, &summaries).await;
                Ok(chain)
            }
            Err(err) => {
                self.emit_rejection(&request.request_id, &err);
                Err(err)
            }
        }
    }

    async fn create_appointment_inner(
        &self,
        request: &BookingRequest,
    ) -> DomainResult<Appointment> {
        validate_booking_request(request)?;
        let service = self
            .catalog
            .find_service(&request.service_id)
            .await?
            .ok_or(DomainError::NotFound("service"))?;
        ensure_same_establishment(&service, &request.establishment_id)?;
        let professional_id =
            catalog::resolve_professional(&service, request.professional_id.as_deref())?;
        ensure_not_past(request.scheduled_at, self.clock.now())?;
        self.ensure_within_schedule(
            &professional_id,
            request.scheduled_at,
            service.duration_minutes,
        )
        .await?;
        self.ensure_slot_free(&professional_id, request.scheduled_at, service.duration_minutes)
            .await?;
        let appointment = build_appointment(
            &request.request_id,
            &request.requester_id,
            &professional_id,
            &service,
            request.scheduled_at,
            now_ms(),
        );
        self.appointments.save(&appointment).await
    }

    async fn create_chain_inner(&self, request: &ChainRequest) -> DomainResult<BookingChain> {
        validate_chain_request(request)?;
        let steps =
            catalog::resolve_visit_steps(self.catalog.as_ref(), &request.assignments).await?;
        for step in &steps {
            ensure_same_establishment(&step.service, &request.establishment_id)?;
        }
        ensure_not_past(request.first_start, self.clock.now())?;

        let created_at_ms = now_ms();
        let mut appointments = Vec::with_capacity(steps.len());
        let mut cursor = request.first_start;
        for step in &steps {
            self.ensure_within_schedule(
                &step.professional_id,
                cursor,
                step.service.duration_minutes,
            )
            .await?;
            self.ensure_slot_free(&step.professional_id, cursor, step.service.duration_minutes)
                .await?;
            let appointment = build_appointment(
                &request.request_id,
                &request.requester_id,
                &step.professional_id,
                &step.service,
                cursor,
                created_at_ms,
            );
            cursor = appointment.ends_at();
            appointments.push(appointment);
        }

        let total_price_cents = appointments.iter().map(|a| a.price_cents).sum();
        let settlement = self
            .resolve_settlement(request, appointments.len(), total_price_cents)
            .await?;
        let credit_spend = match &settlement {
            ChainSettlement::CreditConsumed { credit_id, units } => Some(CreditSpend {
                credit_id: credit_id.clone(),
                units: *units,
            }),
            _ => None,
        };
        let appointments = self
            .appointments
            .save_chain(&appointments, credit_spend.as_ref())
            .await?;
        Ok(BookingChain {
            appointments,
            total_price_cents,
            settlement,
        })
    }

    /// Settlement precedence: a credit pack with unspent units wins, then
    /// the resolved plan decides between an upfront deposit and paying at
    /// the venue. A spent pack counts as no pack at all, while one covering
    /// only part of the chain fails the whole booking rather than falling
    /// through to a deposit.
    async fn resolve_settlement(
        &self,
        request: &ChainRequest,
        step_count: usize,
        total_price_cents: i64,
    ) -> DomainResult<ChainSettlement> {
        let now = self.clock.now();
        let credit = self
            .credits
            .find_active_credit(&request.requester_id, &request.establishment_id, now)
            .await?
            .filter(|credit| credit.remaining() > 0);
        if let Some(credit) = credit {
            let units = step_count as u32;
            if credit.remaining() < units {
                return Err(DomainError::InsufficientCredit);
            }
            return Ok(ChainSettlement::CreditConsumed {
                credit_id: credit.credit_id,
                units,
            });
        }

        let plan = self.plans.resolve_by_owner(&request.establishment_id).await?;
        if !plan.requires_prepayment {
            return Ok(ChainSettlement::PayAtVenue);
        }
        let deposit = DepositRequest {
            request_id: request.request_id.clone(),
            user_id: request.requester_id.clone(),
            establishment_id: request.establishment_id.clone(),
            split: plans::compute_split(total_price_cents, plan.platform_fee_percent),
        };
        let pending = self.payments.create_pending_deposit(&deposit).await?;
        Ok(ChainSettlement::DepositPending(pending))
    }

    /// The requested span must sit inside a single availability interval of
    /// the professional's weekday template; split-day intervals never merge.
    async fn ensure_within_schedule(
        &self,
        professional_id: &str,
        start: PrimitiveDateTime,
        duration_minutes: u32,
    ) -> DomainResult<()> {
        let end = span_end(start, duration_minutes)?;
        if end.date() != start.date() {
            return Err(DomainError::OutsideSchedule);
        }
        let day: DayOfWeek = start.date().weekday().into();
        let rows = self.schedules.list_by_professional(professional_id).await?;
        let day_rows: Vec<_> = rows
            .iter()
            .filter(|row| row.day_of_week == day && row.is_available)
            .collect();
        if day_rows.is_empty() {
            return Err(DomainError::NoAvailability);
        }
        let start_minute = minute_of_day(start.time());
        let end_minute = minute_of_day(end.time());
        let fits = day_rows.iter().any(|row| {
            conflict::fits_within_schedule(
                start_minute,
                end_minute,
                u32::from(row.start_minute),
                u32::from(row.end_minute),
            )
        });
        if fits {
            Ok(())
        } else {
            Err(DomainError::OutsideSchedule)
        }
    }

    async fn ensure_slot_free(
        &self,
        professional_id: &str,
        start: PrimitiveDateTime,
        duration_minutes: u32,
    ) -> DomainResult<()> {
        let end = span_end(start, duration_minutes)?;
        let day_start = PrimitiveDateTime::new(start.date(), Time::MIDNIGHT);
        let day_end = day_start
            .checked_add(Duration::days(1))
            .unwrap_or(PrimitiveDateTime::MAX);
        let booked = self
            .appointments
            .find_scheduled_between(professional_id, day_start, day_end)
            .await?;
        let clash = booked.iter().any(|existing| {
            conflict::overlaps(start, end, existing.scheduled_at, existing.ends_at())
        });
        if clash {
            Err(DomainError::SlotTaken)
        } else {
            Ok(())
        }
    }

    async fn send_confirmation(&self, request_id: &str, summaries: &[AppointmentSummary]) {
        if let Err(err) = self.notifier.notify_confirmation(summaries).await {
            self.events.emit(&SchedulingEvent::NotificationFailed {
                request_id: request_id.to_string(),
                detail: err.to_string(),
            });
        }
    }

    fn emit_rejection(&self, request_id: &str, err: &DomainError) {
        self.events.emit(&SchedulingEvent::BookingRejected {
            request_id: request_id.to_string(),
            reason: err.kind().to_string(),
            detail: err.to_string(),
        });
    }
}

fn build_appointment(
    request_id: &str,
    user_id: &str,
    professional_id: &str,
    service: &Service,
    scheduled_at: PrimitiveDateTime,
    created_at_ms: i64,
) -> Appointment {
    Appointment {
        appointment_id: uuid_v7_without_dashes(),
        request_id: request_id.to_string(),
        user_id: user_id.to_string(),
        establishment_id: service.establishment_id.clone(),
        professional_id: professional_id.to_string(),
        service_id: service.service_id.clone(),
        service_name: service.name.clone(),
        scheduled_at,
        duration_minutes: service.duration_minutes,
        price_cents: service.price_cents,
        status: AppointmentStatus::Scheduled,
        created_at_ms,
    }
}

fn validate_booking_request(request: &BookingRequest) -> DomainResult<()> {
    ensure_id_field(&request.request_id, "request_id")?;
    ensure_id_field(&request.requester_id, "requester_id")?;
    ensure_id_field(&request.establishment_id, "establishment_id")?;
    ensure_id_field(&request.service_id, "service_id")?;
    ensure_minute_aligned(request.scheduled_at)
}

fn validate_chain_request(request: &ChainRequest) -> DomainResult<()> {
    ensure_id_field(&request.request_id, "request_id")?;
    ensure_id_field(&request.requester_id, "requester_id")?;
    ensure_id_field(&request.establishment_id, "establishment_id")?;
    ensure_minute_aligned(request.first_start)
}

fn ensure_id_field(value: &str, field: &'static str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::InvalidRequest(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

fn ensure_minute_aligned(at: PrimitiveDateTime) -> DomainResult<()> {
    if at.second() != 0 || at.nanosecond() != 0 {
        return Err(DomainError::InvalidRequest(
            "times must align to whole minutes".into(),
        ));
    }
    Ok(())
}

fn ensure_same_establishment(service: &Service, establishment_id: &str) -> DomainResult<()> {
    if service.establishment_id != establishment_id {
        return Err(DomainError::Mismatch(format!(
            "service {} belongs to another establishment",
            service.service_id
        )));
    }
    Ok(())
}

fn ensure_not_past(scheduled_at: PrimitiveDateTime, now: PrimitiveDateTime) -> DomainResult<()> {
    // A start within the tolerance of the calendar ceiling cannot be past.
    let cutoff = scheduled_at
        .checked_add(Duration::minutes(PAST_TOLERANCE_MINUTES))
        .unwrap_or(PrimitiveDateTime::MAX);
    if cutoff < now {
        return Err(DomainError::InvalidRequest(
            "scheduled_at is in the past".into(),
        ));
    }
    Ok(())
}

/// End of a span starting at `start`. Spans that run past the last
/// representable datetime land outside any schedule window.
fn span_end(start: PrimitiveDateTime, duration_minutes: u32) -> DomainResult<PrimitiveDateTime> {
    start
        .checked_add(Duration::minutes(i64::from(duration_minutes)))
        .ok_or(DomainError::OutsideSchedule)
}

fn minute_of_day(time: Time) -> u32 {
    u32::from(time.hour()) * 60 + u32::from(time.minute())
}
