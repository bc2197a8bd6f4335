use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use slotline_domain::DomainResult;
use slotline_domain::appointments::{Appointment, AppointmentStatus, AppointmentSummary};
use slotline_domain::booking::{DepositRequest, PendingPayment};
use slotline_domain::catalog::Service;
use slotline_domain::conflict;
use slotline_domain::credits::{ClientCredit, CreditSpend};
use slotline_domain::error::{DomainError, NotifyError};
use slotline_domain::plans::Subscription;
use slotline_domain::ports::BoxFuture;
use slotline_domain::ports::appointments::AppointmentStore;
use slotline_domain::ports::catalog::ServiceCatalog;
use slotline_domain::ports::credits::CreditLedger;
use slotline_domain::ports::notify::NotificationSender;
use slotline_domain::ports::payment::PaymentGateway;
use slotline_domain::ports::schedule::ScheduleStore;
use slotline_domain::ports::subscriptions::SubscriptionStore;
use slotline_domain::schedule::ScheduleInterval;
use slotline_domain::util::uuid_v7_without_dashes;
use time::PrimitiveDateTime;
use tokio::sync::RwLock;

const STORE_CONFLICTS_TOTAL: &str = "slotline_store_conflicts_total";

#[derive(Default)]
pub struct InMemoryScheduleStore {
    rows: Arc<RwLock<HashMap<String, Vec<ScheduleInterval>>>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScheduleStore for InMemoryScheduleStore {
    fn list_by_professional(
        &self,
        professional_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<ScheduleInterval>>> {
        let professional_id = professional_id.to_string();
        let rows = self.rows.clone();
        Box::pin(async move {
            let rows = rows.read().await;
            Ok(rows.get(&professional_id).cloned().unwrap_or_default())
        })
    }

    fn replace_for_professional(
        &self,
        professional_id: &str,
        intervals: &[ScheduleInterval],
    ) -> BoxFuture<'_, DomainResult<()>> {
        let professional_id = professional_id.to_string();
        let intervals = intervals.to_vec();
        let rows = self.rows.clone();
        Box::pin(async move {
            rows.write().await.insert(professional_id, intervals);
            Ok(())
        })
    }
}

#[derive(Default)]
pub struct InMemoryServiceCatalog {
    services: Arc<RwLock<HashMap<String, Service>>>,
}

impl InMemoryServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, service: Service) {
        self.services
            .write()
            .await
            .insert(service.service_id.clone(), service);
    }
}

impl ServiceCatalog for InMemoryServiceCatalog {
    fn find_service(&self, service_id: &str) -> BoxFuture<'_, DomainResult<Option<Service>>> {
        let service_id = service_id.to_string();
        let services = self.services.clone();
        Box::pin(async move { Ok(services.read().await.get(&service_id).cloned()) })
    }
}

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: Arc<RwLock<HashMap<String, Subscription>>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, subscription: Subscription) {
        self.subscriptions
            .write()
            .await
            .insert(subscription.owner_id.clone(), subscription);
    }
}

impl SubscriptionStore for InMemorySubscriptionStore {
    fn find_by_owner(&self, owner_id: &str) -> BoxFuture<'_, DomainResult<Option<Subscription>>> {
        let owner_id = owner_id.to_string();
        let subscriptions = self.subscriptions.clone();
        Box::pin(async move { Ok(subscriptions.read().await.get(&owner_id).cloned()) })
    }
}

#[derive(Default)]
struct BookingState {
    appointments: HashMap<String, Appointment>,
    credits: HashMap<String, ClientCredit>,
}

/// Appointments and credit packs share one lock so a chain commit and its
/// credit consumption land together or not at all.
#[derive(Default)]
pub struct InMemoryBookingStore {
    state: Arc<RwLock<BookingState>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_credit(&self, credit: ClientCredit) {
        self.state
            .write()
            .await
            .credits
            .insert(credit.credit_id.clone(), credit);
    }
}

fn overlaps_existing(appointments: &HashMap<String, Appointment>, candidate: &Appointment) -> bool {
    appointments.values().any(|existing| {
        existing.professional_id == candidate.professional_id
            && existing.status.is_blocking()
            && conflict::overlaps(
                candidate.scheduled_at,
                candidate.ends_at(),
                existing.scheduled_at,
                existing.ends_at(),
            )
    })
}

impl AppointmentStore for InMemoryBookingStore {
    fn find_by_id(&self, appointment_id: &str) -> BoxFuture<'_, DomainResult<Option<Appointment>>> {
        let appointment_id = appointment_id.to_string();
        let state = self.state.clone();
        Box::pin(async move { Ok(state.read().await.appointments.get(&appointment_id).cloned()) })
    }

    fn find_scheduled_between(
        &self,
        professional_id: &str,
        from: PrimitiveDateTime,
        to: PrimitiveDateTime,
    ) -> BoxFuture<'_, DomainResult<Vec<Appointment>>> {
        let professional_id = professional_id.to_string();
        let state = self.state.clone();
        Box::pin(async move {
            let state = state.read().await;
            let mut rows: Vec<Appointment> = state
                .appointments
                .values()
                .filter(|appointment| {
                    appointment.professional_id == professional_id
                        && appointment.status.is_blocking()
                        && appointment.scheduled_at >= from
                        && appointment.scheduled_at < to
                })
                .cloned()
                .collect();
            rows.sort_by(|a, b| {
                a.scheduled_at
                    .cmp(&b.scheduled_at)
                    .then_with(|| a.appointment_id.cmp(&b.appointment_id))
            });
            Ok(rows)
        })
    }

    fn save(&self, appointment: &Appointment) -> BoxFuture<'_, DomainResult<Appointment>> {
        let appointment = appointment.clone();
        let state = self.state.clone();
        Box::pin(async move {
            let mut state = state.write().await;
            if state.appointments.contains_key(&appointment.appointment_id) {
                return Err(DomainError::Store(format!(
                    "duplicate appointment id {}",
                    appointment.appointment_id
                )));
            }
            // Re-checked under the write lock; the service-level check can
            // race a concurrent booking.
            if overlaps_existing(&state.appointments, &appointment) {
                counter!(STORE_CONFLICTS_TOTAL, "op" => "save").increment(1);
                return Err(DomainError::SlotTaken);
            }
            state
                .appointments
                .insert(appointment.appointment_id.clone(), appointment.clone());
            Ok(appointment)
        })
    }

    fn save_chain(
        &self,
        appointments: &[Appointment],
        credit_spend: Option<&CreditSpend>,
    ) -> BoxFuture<'_, DomainResult<Vec<Appointment>>> {
        let incoming = appointments.to_vec();
        let credit_spend = credit_spend.cloned();
        let state = self.state.clone();
        Box::pin(async move {
            let mut state = state.write().await;
            for (index, appointment) in incoming.iter().enumerate() {
                if state.appointments.contains_key(&appointment.appointment_id) {
                    return Err(DomainError::Store(format!(
                        "duplicate appointment id {}",
                        appointment.appointment_id
                    )));
                }
                if overlaps_existing(&state.appointments, appointment) {
                    counter!(STORE_CONFLICTS_TOTAL, "op" => "save_chain").increment(1);
                    return Err(DomainError::SlotTaken);
                }
                let intra_batch_clash = incoming[..index].iter().any(|earlier| {
                    earlier.professional_id == appointment.professional_id
                        && conflict::overlaps(
                            appointment.scheduled_at,
                            appointment.ends_at(),
                            earlier.scheduled_at,
                            earlier.ends_at(),
                        )
                });
                if intra_batch_clash {
                    counter!(STORE_CONFLICTS_TOTAL, "op" => "save_chain").increment(1);
                    return Err(DomainError::SlotTaken);
                }
            }
            if let Some(spend) = &credit_spend {
                let credit = state
                    .credits
                    .get_mut(&spend.credit_id)
                    .ok_or(DomainError::NotFound("credit"))?;
                if credit.used_credits + spend.units > credit.total_credits {
                    return Err(DomainError::InsufficientCredit);
                }
                credit.used_credits += spend.units;
            }
            for appointment in &incoming {
                state
                    .appointments
                    .insert(appointment.appointment_id.clone(), appointment.clone());
            }
            Ok(incoming)
        })
    }

    fn update_status(
        &self,
        appointment_id: &str,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> BoxFuture<'_, DomainResult<Appointment>> {
        let appointment_id = appointment_id.to_string();
        let state = self.state.clone();
        Box::pin(async move {
            let mut state = state.write().await;
            let appointment = state
                .appointments
                .get_mut(&appointment_id)
                .ok_or(DomainError::NotFound("appointment"))?;
            if appointment.status != from || !from.can_transition_to(to) {
                counter!(STORE_CONFLICTS_TOTAL, "op" => "update_status").increment(1);
                return Err(DomainError::InvalidTransition(appointment.status));
            }
            appointment.status = to;
            Ok(appointment.clone())
        })
    }
}

impl CreditLedger for InMemoryBookingStore {
    fn find_active_credit(
        &self,
        user_id: &str,
        establishment_id: &str,
        now: PrimitiveDateTime,
    ) -> BoxFuture<'_, DomainResult<Option<ClientCredit>>> {
        let user_id = user_id.to_string();
        let establishment_id = establishment_id.to_string();
        let state = self.state.clone();
        Box::pin(async move {
            let state = state.read().await;
            let mut matches: Vec<&ClientCredit> = state
                .credits
                .values()
                .filter(|credit| {
                    credit.user_id == user_id
                        && credit.establishment_id == establishment_id
                        && credit.is_active(now)
                        && credit.remaining() > 0
                })
                .collect();
            // Soonest-expiring pack first; open-ended packs last.
            matches.sort_by(|a, b| match (a.expires_at, b.expires_at) {
                (Some(a_exp), Some(b_exp)) => {
                    a_exp.cmp(&b_exp).then_with(|| a.credit_id.cmp(&b.credit_id))
                }
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.credit_id.cmp(&b.credit_id),
            });
            Ok(matches.first().map(|credit| (*credit).clone()))
        })
    }

    fn increment_used(
        &self,
        credit_id: &str,
        units: u32,
    ) -> BoxFuture<'_, DomainResult<ClientCredit>> {
        let credit_id = credit_id.to_string();
        let state = self.state.clone();
        Box::pin(async move {
            let mut state = state.write().await;
            let credit = state
                .credits
                .get_mut(&credit_id)
                .ok_or(DomainError::NotFound("credit"))?;
            if credit.used_credits + units > credit.total_credits {
                return Err(DomainError::InsufficientCredit);
            }
            credit.used_credits += units;
            Ok(credit.clone())
        })
    }
}

#[derive(Default)]
pub struct LoggingNotificationSender;

impl LoggingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationSender for LoggingNotificationSender {
    fn notify_confirmation(
        &self,
        summaries: &[AppointmentSummary],
    ) -> BoxFuture<'_, Result<(), NotifyError>> {
        let summaries = summaries.to_vec();
        Box::pin(async move {
            for summary in &summaries {
                tracing::info!(
                    appointment_id = %summary.appointment_id,
                    user_id = %summary.user_id,
                    professional_id = %summary.professional_id,
                    scheduled_at = %summary.scheduled_at,
                    "confirmation sent"
                );
            }
            Ok(())
        })
    }
}

#[derive(Default)]
pub struct InMemoryPaymentGateway {
    pending: Arc<RwLock<HashMap<String, PendingPayment>>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pending_by_request(&self, request_id: &str) -> Option<PendingPayment> {
        self.pending.read().await.get(request_id).cloned()
    }
}

impl PaymentGateway for InMemoryPaymentGateway {
    fn create_pending_deposit(
        &self,
        deposit: &DepositRequest,
    ) -> BoxFuture<'_, DomainResult<PendingPayment>> {
        let deposit = deposit.clone();
        let pending = self.pending.clone();
        Box::pin(async move {
            let mut pending = pending.write().await;
            // The same request replays its already-opened deposit.
            if let Some(existing) = pending.get(&deposit.request_id) {
                return Ok(existing.clone());
            }
            let payment = PendingPayment {
                payment_id: uuid_v7_without_dashes(),
                request_id: deposit.request_id.clone(),
                split: deposit.split,
            };
            pending.insert(deposit.request_id.clone(), payment.clone());
            Ok(payment)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotline_domain::plans::PaymentSplit;
    use time::macros::datetime;

    fn appointment(id: &str, professional_id: &str, at: PrimitiveDateTime) -> Appointment {
        Appointment {
            appointment_id: id.to_string(),
            request_id: format!("req-{id}"),
            user_id: "user-1".to_string(),
            establishment_id: "est-1".to_string(),
            professional_id: professional_id.to_string(),
            service_id: "cut".to_string(),
            service_name: "Haircut".to_string(),
            scheduled_at: at,
            duration_minutes: 60,
            price_cents: 5_000,
            status: AppointmentStatus::Scheduled,
            created_at_ms: 0,
        }
    }

    fn credit(id: &str, total: u32, used: u32) -> ClientCredit {
        ClientCredit {
            credit_id: id.to_string(),
            user_id: "user-1".to_string(),
            establishment_id: "est-1".to_string(),
            total_credits: total,
            used_credits: used,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn duplicate_ids_are_refused() {
        let store = InMemoryBookingStore::new();
        let first = appointment("apt-1", "prof-a", datetime!(2026-03-02 09:00));
        store.save(&first).await.unwrap();

        let duplicate = appointment("apt-1", "prof-a", datetime!(2026-03-02 12:00));
        let err = store.save(&duplicate).await.unwrap_err();
        assert!(matches!(err, DomainError::Store(_)));
    }

    #[tokio::test]
    async fn overlap_is_rechecked_at_save_time() {
        let store = InMemoryBookingStore::new();
        store
            .save(&appointment("apt-1", "prof-a", datetime!(2026-03-02 09:00)))
            .await
            .unwrap();

        let err = store
            .save(&appointment("apt-2", "prof-a", datetime!(2026-03-02 09:30)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::SlotTaken));

        // A different professional at the same time is fine.
        store
            .save(&appointment("apt-3", "prof-b", datetime!(2026-03-02 09:30)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn chain_shortfall_leaves_no_trace() {
        let store = InMemoryBookingStore::new();
        store.put_credit(credit("credit-1", 2, 1)).await;

        let chain = vec![
            appointment("apt-1", "prof-a", datetime!(2026-03-02 09:00)),
            appointment("apt-2", "prof-a", datetime!(2026-03-02 10:00)),
        ];
        let spend = CreditSpend {
            credit_id: "credit-1".to_string(),
            units: 2,
        };
        let err = store.save_chain(&chain, Some(&spend)).await.unwrap_err();
        assert!(matches!(err, DomainError::InsufficientCredit));

        let state = store.state.read().await;
        assert!(state.appointments.is_empty());
        assert_eq!(state.credits["credit-1"].used_credits, 1);
    }

    #[tokio::test]
    async fn chain_commit_consumes_the_credit() {
        let store = InMemoryBookingStore::new();
        store.put_credit(credit("credit-1", 5, 0)).await;

        let chain = vec![
            appointment("apt-1", "prof-a", datetime!(2026-03-02 09:00)),
            appointment("apt-2", "prof-b", datetime!(2026-03-02 10:00)),
        ];
        let spend = CreditSpend {
            credit_id: "credit-1".to_string(),
            units: 2,
        };
        store.save_chain(&chain, Some(&spend)).await.unwrap();

        let state = store.state.read().await;
        assert_eq!(state.appointments.len(), 2);
        assert_eq!(state.credits["credit-1"].used_credits, 2);
    }

    #[tokio::test]
    async fn chains_refuse_internal_overlaps() {
        let store = InMemoryBookingStore::new();
        let chain = vec![
            appointment("apt-1", "prof-a", datetime!(2026-03-02 09:00)),
            appointment("apt-2", "prof-a", datetime!(2026-03-02 09:30)),
        ];
        let err = store.save_chain(&chain, None).await.unwrap_err();
        assert!(matches!(err, DomainError::SlotTaken));
    }

    #[tokio::test]
    async fn stale_status_updates_fail_the_compare_and_set() {
        let store = InMemoryBookingStore::new();
        store
            .save(&appointment("apt-1", "prof-a", datetime!(2026-03-02 09:00)))
            .await
            .unwrap();

        store
            .update_status(
                "apt-1",
                AppointmentStatus::Scheduled,
                AppointmentStatus::Cancelled,
            )
            .await
            .unwrap();

        let err = store
            .update_status(
                "apt-1",
                AppointmentStatus::Scheduled,
                AppointmentStatus::Cancelled,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidTransition(AppointmentStatus::Cancelled)
        ));
    }

    #[tokio::test]
    async fn soonest_expiring_credit_wins() {
        let store = InMemoryBookingStore::new();
        let mut expiring = credit("credit-soon", 5, 0);
        expiring.expires_at = Some(datetime!(2026-04-01 00:00));
        let mut later = credit("credit-later", 5, 0);
        later.expires_at = Some(datetime!(2026-05-01 00:00));
        store.put_credit(credit("credit-open", 5, 0)).await;
        store.put_credit(later).await;
        store.put_credit(expiring).await;

        let found = store
            .find_active_credit("user-1", "est-1", datetime!(2026-03-01 00:00))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.credit_id, "credit-soon");
    }

    #[tokio::test]
    async fn spent_credits_never_shadow_a_fresh_pack() {
        let store = InMemoryBookingStore::new();
        let mut spent = credit("credit-spent", 2, 2);
        spent.expires_at = Some(datetime!(2026-04-01 00:00));
        store.put_credit(spent).await;
        store.put_credit(credit("credit-fresh", 5, 0)).await;

        // The spent pack sorts first but is passed over.
        let found = store
            .find_active_credit("user-1", "est-1", datetime!(2026-03-01 00:00))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.credit_id, "credit-fresh");

        store.increment_used("credit-fresh", 5).await.unwrap();
        let none = store
            .find_active_credit("user-1", "est-1", datetime!(2026-03-01 00:00))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn overdrawing_a_credit_is_refused() {
        let store = InMemoryBookingStore::new();
        store.put_credit(credit("credit-1", 3, 2)).await;

        store.increment_used("credit-1", 1).await.unwrap();
        let err = store.increment_used("credit-1", 1).await.unwrap_err();
        assert!(matches!(err, DomainError::InsufficientCredit));
    }

    #[tokio::test]
    async fn deposits_replay_by_request_id() {
        let gateway = InMemoryPaymentGateway::new();
        let deposit = DepositRequest {
            request_id: "req-1".to_string(),
            user_id: "user-1".to_string(),
            establishment_id: "est-1".to_string(),
            split: PaymentSplit {
                amount_cents: 10_000,
                platform_fee_cents: 700,
                recipient_cents: 9_300,
            },
        };

        let first = gateway.create_pending_deposit(&deposit).await.unwrap();
        let second = gateway.create_pending_deposit(&deposit).await.unwrap();
        assert_eq!(first.payment_id, second.payment_id);
        assert_eq!(
            gateway.pending_by_request("req-1").await.map(|p| p.payment_id),
            Some(first.payment_id)
        );
    }
}
