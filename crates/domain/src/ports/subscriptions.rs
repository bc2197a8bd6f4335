use crate::DomainResult;
use crate::plans::Subscription;
use crate::ports::BoxFuture;

pub trait SubscriptionStore: Send + Sync {
    fn find_by_owner(&self, owner_id: &str) -> BoxFuture<'_, DomainResult<Option<Subscription>>>;
}
