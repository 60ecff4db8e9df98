pub mod dependency;
pub mod health;
mod service;

use std::collections::BTreeMap;

pub use dependency::{DependencyEdge, DependencyGraph};
pub use health::{HealthAggregator, HealthReport};
pub use service::{validate_id, HealthStatus, NewService, Service, ServicePatch, MAX_ID_LEN};

use crate::error::{CatalogError, Result};

/// Owns the set of registered services, keyed by id
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    /// Map of service id to service instance
    services: BTreeMap<String, Service>,
}

impl ServiceRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new service
    pub fn register(&mut self, new: NewService) -> Result<&Service> {
        new.validate()?;
        if self.services.contains_key(&new.id) {
            return Err(CatalogError::DuplicateId(new.id));
        }

        let id = new.id.clone();
        tracing::info!("Service '{}' registered", id);
        Ok(&*self.services.entry(id).or_insert(Service::new(new)))
    }

    /// Inserts a previously stored service, keeping its timestamps
    pub fn restore(&mut self, service: Service) -> Result<&Service> {
        service.validate()?;
        if self.services.contains_key(&service.id) {
            return Err(CatalogError::DuplicateId(service.id));
        }

        let id = service.id.clone();
        Ok(&*self.services.entry(id).or_insert(service))
    }

    /// Gets a service by id
    pub fn get(&self, id: &str) -> Result<&Service> {
        self.services.get(id).ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// Applies a patch to a registered service
    pub fn update(&mut self, id: &str, patch: ServicePatch) -> Result<&Service> {
        patch.validate()?;
        let service =
            self.services.get_mut(id).ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        service.apply(patch);
        tracing::info!("Service '{}' updated", id);
        Ok(&*service)
    }

    /// Removes a service. Callers are responsible for dependency checks.
    pub fn remove(&mut self, id: &str) -> Result<Service> {
        let service = self.services.remove(id).ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        tracing::info!("Service '{}' removed", id);
        Ok(service)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }

    /// Lists all registered services ordered by id
    pub fn list(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
