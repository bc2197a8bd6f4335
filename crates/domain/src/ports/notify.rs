use crate::appointments::AppointmentSummary;
use crate::error::NotifyError;
use crate::ports::BoxFuture;

/// Best-effort confirmation channel. Failures never fail a booking; the
/// orchestrator records them and moves on.
pub trait NotificationSender: Send + Sync {
    fn notify_confirmation(
        &self,
        summaries: &[AppointmentSummary],
    ) -> BoxFuture<'_, Result<(), NotifyError>>;
}
