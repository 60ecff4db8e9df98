//! Core of the service catalog: registry, dependency graph and health aggregation

pub mod catalog;
pub mod error;
pub mod registry;

pub use catalog::{Catalog, CatalogSnapshot, CatalogStats};
pub use error::{CatalogError, Result};
pub use registry::{
    DependencyEdge, DependencyGraph, HealthAggregator, HealthReport, HealthStatus, NewService,
    Service, ServicePatch, ServiceRegistry,
};
