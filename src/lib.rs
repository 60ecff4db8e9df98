pub mod config;
pub mod error;
pub mod logging;
pub mod schema;
pub mod store;

pub use catalog_core::{
    Catalog, CatalogError, CatalogSnapshot, HealthReport, HealthStatus, NewService, Service,
    ServicePatch,
};
pub use config::Config;
pub use error::{CatalogdError, Result};
pub use store::SnapshotStore;
