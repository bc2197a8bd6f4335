use time::PrimitiveDateTime;

use crate::DomainResult;
use crate::appointments::{Appointment, AppointmentStatus};
use crate::credits::CreditSpend;
use crate::ports::BoxFuture;

pub trait AppointmentStore: Send + Sync {
    fn find_by_id(
        &self,
        appointment_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<Appointment>>>;

    /// Blocking appointments for one professional with `scheduled_at` in
    /// `[from, to)`.
    fn find_scheduled_between(
        &self,
        professional_id: &str,
        from: PrimitiveDateTime,
        to: PrimitiveDateTime,
    ) -> BoxFuture<'_, DomainResult<Vec<Appointment>>>;

    /// Inserts one appointment, re-checking overlap against blocking rows of
    /// the same professional atomically with the insert. A losing race
    /// surfaces as `SlotTaken`.
    fn save(&self, appointment: &Appointment) -> BoxFuture<'_, DomainResult<Appointment>>;

    /// Inserts a chain and applies the optional credit spend as one atomic
    /// unit: overlap is re-checked for every member (including against each
    /// other) and the credit bound is enforced before anything mutates.
    fn save_chain(
        &self,
        appointments: &[Appointment],
        credit_spend: Option<&CreditSpend>,
    ) -> BoxFuture<'_, DomainResult<Vec<Appointment>>>;

    /// Compare-and-set status transition: fails with `InvalidTransition`
    /// carrying the current status unless the stored status equals `from`.
    fn update_status(
        &self,
        appointment_id: &str,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> BoxFuture<'_, DomainResult<Appointment>>;
}
