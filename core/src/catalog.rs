//! Shared catalog store.
//!
//! [`Catalog`] owns one [`ServiceRegistry`] and one [`DependencyGraph`] behind a
//! single read-write lock. Mutations take the write lock, queries the read
//! lock, and every call holds the lock only for its own duration.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::registry::{
    DependencyEdge, DependencyGraph, HealthAggregator, HealthReport, HealthStatus, NewService,
    Service, ServicePatch, ServiceRegistry,
};

/// Serializable copy of the whole catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub services: Vec<Service>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
}

/// Counts reported by [`Catalog::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub services: usize,
    pub dependencies: usize,
}

#[derive(Debug, Default)]
struct CatalogState {
    registry: ServiceRegistry,
    graph: DependencyGraph,
}

/// Thread-safe service catalog
#[derive(Debug, Default)]
pub struct Catalog {
    state: RwLock<CatalogState>,
    aggregator: HealthAggregator,
}

impl Catalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a catalog from a snapshot, re-checking every invariant
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Result<Self> {
        let mut state = CatalogState::default();
        for service in snapshot.services {
            state.registry.restore(service)?;
        }
        for edge in &snapshot.dependencies {
            state.graph.add_edge(&state.registry, &edge.dependent, &edge.dependency)?;
        }

        tracing::info!(
            "Catalog restored with {} services and {} dependencies",
            state.registry.len(),
            state.graph.edge_count()
        );
        Ok(Self { state: RwLock::new(state), aggregator: HealthAggregator::new() })
    }

    /// Copies the current state out
    pub fn snapshot(&self) -> CatalogSnapshot {
        let state = self.read();
        CatalogSnapshot {
            services: state.registry.list().cloned().collect(),
            dependencies: state.graph.edges(),
        }
    }

    pub fn stats(&self) -> CatalogStats {
        let state = self.read();
        CatalogStats { services: state.registry.len(), dependencies: state.graph.edge_count() }
    }

    /// Registers a new service
    pub fn register_service(&self, new: NewService) -> Result<Service> {
        self.write().registry.register(new).cloned()
    }

    /// Gets a service by id
    pub fn get_service(&self, id: &str) -> Result<Service> {
        self.read().registry.get(id).cloned()
    }

    /// Lists all services ordered by id
    pub fn list_services(&self) -> Vec<Service> {
        self.read().registry.list().cloned().collect()
    }

    /// Applies a patch to a service
    pub fn update_service(&self, id: &str, patch: ServicePatch) -> Result<Service> {
        self.write().registry.update(id, patch).cloned()
    }

    /// Records the health reported for a service
    pub fn report_health(&self, id: &str, status: HealthStatus) -> Result<Service> {
        self.update_service(id, ServicePatch::health(status))
    }

    /// Deletes a service that nothing depends on, along with its own
    /// outgoing dependencies
    pub fn delete_service(&self, id: &str) -> Result<Service> {
        let mut state = self.write();
        state.registry.get(id)?;

        let dependents = state.graph.dependents(id);
        if !dependents.is_empty() {
            return Err(CatalogError::Conflict { id: id.to_string(), dependents: dependents.to_vec() });
        }

        state.graph.remove_service(id);
        state.registry.remove(id)
    }

    /// Adds `from -> to`. Returns `false` when the edge already existed.
    pub fn add_dependency(&self, from: &str, to: &str) -> Result<bool> {
        let mut guard = self.write();
        let state = &mut *guard;
        state.graph.add_edge(&state.registry, from, to)
    }

    /// Adds `from -> to` and returns whether it was new together with the
    /// resulting direct dependencies of `from`, read under the same lock
    pub fn add_dependency_listing(&self, from: &str, to: &str) -> Result<(bool, Vec<String>)> {
        let mut guard = self.write();
        let state = &mut *guard;
        let added = state.graph.add_edge(&state.registry, from, to)?;
        Ok((added, state.graph.dependencies(from).to_vec()))
    }

    /// Removes `from -> to` if present
    pub fn remove_dependency(&self, from: &str, to: &str) -> bool {
        self.write().graph.remove_edge(from, to)
    }

    /// Direct dependencies of a service, in insertion order
    pub fn dependencies(&self, id: &str) -> Result<Vec<String>> {
        let state = self.read();
        state.registry.get(id)?;
        Ok(state.graph.dependencies(id).to_vec())
    }

    /// Services depending directly on `id`
    pub fn dependents(&self, id: &str) -> Result<Vec<String>> {
        let state = self.read();
        state.registry.get(id)?;
        Ok(state.graph.dependents(id).to_vec())
    }

    /// Every service that transitively depends on `id`
    pub fn impacted_services(&self, id: &str) -> Result<Vec<String>> {
        let state = self.read();
        state.registry.get(id)?;
        Ok(state.graph.transitive_dependents(id))
    }

    /// Startup order for the given services: dependencies before dependents
    pub fn startup_order(&self, ids: &[String]) -> Result<Vec<String>> {
        let state = self.read();
        for id in ids {
            state.registry.get(id)?;
        }
        Ok(state.graph.resolve_order(ids))
    }

    /// Worst status across a service and its transitive dependencies
    pub fn effective_health(&self, id: &str) -> Result<HealthStatus> {
        let state = self.read();
        self.aggregator.effective_health(&state.registry, &state.graph, id)
    }

    pub fn health_report(&self, id: &str) -> Result<HealthReport> {
        let state = self.read();
        self.aggregator.report(&state.registry, &state.graph, id)
    }

    // Every mutation validates before it writes, so a panic while holding
    // the lock cannot leave partial state behind.
    fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use pretty_assertions::assert_eq;

    use super::*;

    fn catalog_with(services: &[(&str, HealthStatus)]) -> Catalog {
        let catalog = Catalog::new();
        for (id, health) in services {
            catalog.register_service(NewService::new(*id, id.to_uppercase()).with_health(*health)).unwrap();
        }
        catalog
    }

    #[test]
    fn test_delete_dependency_conflicts() {
        let catalog = catalog_with(&[("api", HealthStatus::Healthy), ("db", HealthStatus::Healthy)]);
        catalog.add_dependency("api", "db").unwrap();

        let err = catalog.delete_service("db").unwrap_err();
        assert_eq!(err, CatalogError::Conflict { id: "db".to_string(), dependents: vec!["api".to_string()] });
        assert!(catalog.get_service("db").is_ok());
    }

    #[test]
    fn test_delete_drops_outgoing_edges() {
        let catalog = catalog_with(&[("api", HealthStatus::Healthy), ("db", HealthStatus::Healthy)]);
        catalog.add_dependency("api", "db").unwrap();

        let removed = catalog.delete_service("api").unwrap();
        assert_eq!(removed.id, "api");
        assert!(catalog.dependents("db").unwrap().is_empty());
        assert_eq!(catalog.stats(), CatalogStats { services: 1, dependencies: 0 });

        // db is now free to go
        catalog.delete_service("db").unwrap();
        assert!(catalog.list_services().is_empty());
    }

    #[test]
    fn test_delete_missing_service() {
        let catalog = Catalog::new();
        assert_eq!(catalog.delete_service("ghost"), Err(CatalogError::NotFound("ghost".to_string())));
    }

    #[test]
    fn test_health_follows_edges() {
        let catalog = catalog_with(&[("a", HealthStatus::Healthy), ("b", HealthStatus::Unhealthy)]);
        catalog.add_dependency("a", "b").unwrap();
        assert_eq!(catalog.effective_health("a").unwrap(), HealthStatus::Unhealthy);

        assert!(catalog.remove_dependency("a", "b"));
        assert_eq!(catalog.effective_health("a").unwrap(), HealthStatus::Healthy);
    }

    #[test]
    fn test_report_health_changes_effective_health() {
        let catalog = catalog_with(&[("a", HealthStatus::Healthy), ("b", HealthStatus::Healthy)]);
        catalog.add_dependency("a", "b").unwrap();

        catalog.report_health("b", HealthStatus::Degraded).unwrap();
        let report = catalog.health_report("a").unwrap();
        assert_eq!(report.effective, HealthStatus::Degraded);
        assert_eq!(report.cause, vec!["a", "b"]);
    }

    #[test]
    fn test_dependencies_of_missing_service() {
        let catalog = Catalog::new();
        assert_eq!(catalog.dependencies("ghost"), Err(CatalogError::NotFound("ghost".to_string())));
        assert!(!catalog.remove_dependency("ghost", "other"));
    }

    #[test]
    fn test_snapshot_round_trip_keeps_edges_and_timestamps() {
        let catalog = catalog_with(&[
            ("web", HealthStatus::Healthy),
            ("api", HealthStatus::Degraded),
            ("db", HealthStatus::Healthy),
        ]);
        catalog.add_dependency("web", "api").unwrap();
        catalog.add_dependency("api", "db").unwrap();

        let snapshot = catalog.snapshot();
        let restored = Catalog::from_snapshot(snapshot.clone()).unwrap();

        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.effective_health("web").unwrap(), HealthStatus::Degraded);
    }

    #[test]
    fn test_snapshot_round_trip_keeps_insertion_order() {
        let catalog = catalog_with(&[
            ("a", HealthStatus::Healthy),
            ("b", HealthStatus::Healthy),
            ("c", HealthStatus::Healthy),
        ]);
        catalog.add_dependency("b", "c").unwrap();
        catalog.add_dependency("a", "c").unwrap();
        catalog.add_dependency("a", "b").unwrap();

        let snapshot = catalog.snapshot();
        assert_eq!(
            snapshot.dependencies,
            vec![DependencyEdge::new("b", "c"), DependencyEdge::new("a", "c"), DependencyEdge::new("a", "b")]
        );

        let restored = Catalog::from_snapshot(snapshot).unwrap();
        assert_eq!(restored.dependents("c").unwrap(), vec!["b", "a"]);
        assert_eq!(restored.dependencies("a").unwrap(), vec!["c", "b"]);
        assert_eq!(restored.impacted_services("c").unwrap(), catalog.impacted_services("c").unwrap());

        let err = restored.delete_service("c").unwrap_err();
        assert_eq!(
            err,
            CatalogError::Conflict { id: "c".to_string(), dependents: vec!["b".to_string(), "a".to_string()] }
        );
    }

    #[test]
    fn test_add_dependency_listing() {
        let catalog = catalog_with(&[
            ("web", HealthStatus::Healthy),
            ("api", HealthStatus::Healthy),
            ("db", HealthStatus::Healthy),
        ]);

        assert_eq!(catalog.add_dependency_listing("web", "api").unwrap(), (true, vec!["api".to_string()]));
        assert_eq!(
            catalog.add_dependency_listing("web", "db").unwrap(),
            (true, vec!["api".to_string(), "db".to_string()])
        );
        assert_eq!(
            catalog.add_dependency_listing("web", "api").unwrap(),
            (false, vec!["api".to_string(), "db".to_string()])
        );
        assert!(matches!(
            catalog.add_dependency_listing("api", "web"),
            Err(CatalogError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_snapshot_with_cycle_is_rejected() {
        let catalog = catalog_with(&[("a", HealthStatus::Healthy), ("b", HealthStatus::Healthy)]);
        let mut snapshot = catalog.snapshot();
        snapshot.dependencies = vec![DependencyEdge::new("a", "b"), DependencyEdge::new("b", "a")];

        let err = Catalog::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, CatalogError::CycleDetected { .. }));
    }

    #[test]
    fn test_startup_order() {
        let catalog = catalog_with(&[
            ("web", HealthStatus::Healthy),
            ("api", HealthStatus::Healthy),
            ("db", HealthStatus::Healthy),
        ]);
        catalog.add_dependency("web", "api").unwrap();
        catalog.add_dependency("api", "db").unwrap();

        assert_eq!(catalog.startup_order(&["web".to_string()]).unwrap(), vec!["db", "api", "web"]);
        assert!(catalog.startup_order(&["ghost".to_string()]).is_err());
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let catalog = Arc::new(catalog_with(&[("root", HealthStatus::Healthy)]));

        let writers: Vec<_> = (0..4)
            .map(|n| {
                let catalog = Arc::clone(&catalog);
                thread::spawn(move || {
                    for i in 0..25 {
                        let id = format!("svc-{}-{}", n, i);
                        catalog.register_service(NewService::new(&id, &id)).unwrap();
                        catalog.add_dependency("root", &id).unwrap();
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                thread::spawn(move || {
                    for _ in 0..50 {
                        catalog.effective_health("root").unwrap();
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        assert_eq!(catalog.dependencies("root").unwrap().len(), 100);
        // Fresh services default to unknown
        assert_eq!(catalog.effective_health("root").unwrap(), HealthStatus::Unknown);
    }
}
