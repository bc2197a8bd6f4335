use crate::DomainResult;
use crate::booking::{DepositRequest, PendingPayment};
use crate::ports::BoxFuture;

pub trait PaymentGateway: Send + Sync {
    /// Opens a pending deposit over a chain's total price. The split is a
    /// pass-through of the resolved plan's platform fee; no money moves in
    /// this engine.
    fn create_pending_deposit(
        &self,
        deposit: &DepositRequest,
    ) -> BoxFuture<'_, DomainResult<PendingPayment>>;
}
