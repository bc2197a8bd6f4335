use crate::DomainResult;
use crate::catalog::Service;
use crate::ports::BoxFuture;

pub trait ServiceCatalog: Send + Sync {
    fn find_service(&self, service_id: &str) -> BoxFuture<'_, DomainResult<Option<Service>>>;
}
