//! Health probe plugins for the service catalog

mod runner;
mod tcp;

use async_trait::async_trait;
use catalog_core::HealthStatus;

pub use runner::{ProbeOutcome, ProbeRunner};
pub use tcp::TcpProbe;

/// Trait for implementing health probes that feed reported health into the catalog
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Id of the catalog service this probe reports for
    fn service_id(&self) -> &str;

    /// Checks the service once
    async fn probe(&self) -> HealthStatus;
}
