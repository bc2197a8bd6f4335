use time::PrimitiveDateTime;

use crate::DomainResult;
use crate::credits::ClientCredit;
use crate::ports::BoxFuture;

pub trait CreditLedger: Send + Sync {
    /// The user's unexpired credit with unspent units at this
    /// establishment, if any. Spent packs are skipped so they never shadow
    /// a fresh one; whether the balance covers a whole chain is the
    /// caller's decision.
    fn find_active_credit(
        &self,
        user_id: &str,
        establishment_id: &str,
        now: PrimitiveDateTime,
    ) -> BoxFuture<'_, DomainResult<Option<ClientCredit>>>;

    /// Consumes `units`, enforcing `used + units <= total` atomically.
    /// Over-consumption fails with `InsufficientCredit`.
    fn increment_used(
        &self,
        credit_id: &str,
        units: u32,
    ) -> BoxFuture<'_, DomainResult<ClientCredit>>;
}
