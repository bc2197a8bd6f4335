use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::catalog::ServiceCatalog;

/// A bookable service. Immutable once created; bookings snapshot its price
/// and duration so later catalog edits never rewrite history.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    pub service_id: String,
    pub professional_id: String,
    pub establishment_id: String,
    pub name: String,
    pub price_cents: i64,
    pub duration_minutes: u32,
}

impl Service {
    pub fn new(
        service_id: impl Into<String>,
        professional_id: impl Into<String>,
        establishment_id: impl Into<String>,
        name: impl Into<String>,
        price_cents: i64,
        duration_minutes: u32,
    ) -> DomainResult<Self> {
        let service = Self {
            service_id: service_id.into().trim().to_string(),
            professional_id: professional_id.into().trim().to_string(),
            establishment_id: establishment_id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            price_cents,
            duration_minutes,
        };
        if service.service_id.is_empty()
            || service.professional_id.is_empty()
            || service.establishment_id.is_empty()
        {
            return Err(DomainError::InvalidRequest(
                "service ids cannot be empty".into(),
            ));
        }
        if service.name.is_empty() {
            return Err(DomainError::InvalidRequest("name is required".into()));
        }
        if service.price_cents <= 0 {
            return Err(DomainError::InvalidRequest(
                "price_cents must be positive".into(),
            ));
        }
        if service.duration_minutes == 0 {
            return Err(DomainError::InvalidRequest(
                "duration_minutes must be positive".into(),
            ));
        }
        Ok(service)
    }
}

/// One entry of a visit request: which service, and optionally which
/// professional. A missing professional means "whoever provides it", which
/// resolves to the service's assigned professional.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceAssignment {
    pub service_id: String,
    pub professional_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisitStep {
    pub service: Service,
    pub professional_id: String,
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn ServiceCatalog>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn ServiceCatalog>) -> Self {
        Self { catalog }
    }

    pub async fn find_service(&self, service_id: &str) -> DomainResult<Service> {
        self.catalog
            .find_service(service_id)
            .await?
            .ok_or(DomainError::NotFound("service"))
    }

    /// Resolves raw assignments into ordered visit steps, defaulting
    /// flexible entries to each service's assigned professional.
    pub async fn resolve_steps(
        &self,
        assignments: &[ServiceAssignment],
    ) -> DomainResult<Vec<VisitStep>> {
        resolve_visit_steps(self.catalog.as_ref(), assignments).await
    }
}

pub(crate) async fn resolve_visit_steps(
    catalog: &dyn ServiceCatalog,
    assignments: &[ServiceAssignment],
) -> DomainResult<Vec<VisitStep>> {
    if assignments.is_empty() {
        return Err(DomainError::InvalidRequest(
            "at least one service is required".into(),
        ));
    }
    let mut steps = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let service = catalog
            .find_service(&assignment.service_id)
            .await?
            .ok_or(DomainError::NotFound("service"))?;
        let professional_id =
            resolve_professional(&service, assignment.professional_id.as_deref())?;
        steps.push(VisitStep {
            service,
            professional_id,
        });
    }
    Ok(steps)
}

pub(crate) fn resolve_professional(
    service: &Service,
    requested: Option<&str>,
) -> DomainResult<String> {
    match requested {
        None => Ok(service.professional_id.clone()),
        Some(requested) if requested == service.professional_id => {
            Ok(service.professional_id.clone())
        }
        Some(requested) => Err(DomainError::Mismatch(format!(
            "professional {requested} does not provide service {}",
            service.service_id
        ))),
    }
}
