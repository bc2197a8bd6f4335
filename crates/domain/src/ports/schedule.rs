use crate::DomainResult;
use crate::ports::BoxFuture;
use crate::schedule::ScheduleInterval;

pub trait ScheduleStore: Send + Sync {
    fn list_by_professional(
        &self,
        professional_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<ScheduleInterval>>>;

    /// Swaps the professional's whole weekly template in one step.
    fn replace_for_professional(
        &self,
        professional_id: &str,
        intervals: &[ScheduleInterval],
    ) -> BoxFuture<'_, DomainResult<()>>;
}
