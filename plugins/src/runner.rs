use std::sync::Arc;
use std::time::Duration;

use catalog_core::{Catalog, HealthStatus};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::HealthProbe;

/// Result of one probe during a polling round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub service: String,
    pub status: HealthStatus,
    /// Whether the catalog accepted the result
    pub recorded: bool,
}

/// Runs health probes and records their results in the catalog
pub struct ProbeRunner {
    catalog: Arc<Catalog>,
    probes: Vec<Arc<dyn HealthProbe>>,
}

impl ProbeRunner {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog, probes: Vec::new() }
    }

    pub fn with_probe(mut self, probe: impl HealthProbe + 'static) -> Self {
        self.probes.push(Arc::new(probe));
        self
    }

    pub fn add_probe(&mut self, probe: Arc<dyn HealthProbe>) {
        self.probes.push(probe);
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Runs every probe concurrently and records the results. Outcomes are
    /// ordered by service id.
    pub async fn poll_once(&self) -> Vec<ProbeOutcome> {
        let mut tasks = JoinSet::new();
        for probe in &self.probes {
            let probe = Arc::clone(probe);
            tasks.spawn(async move {
                let status = probe.probe().await;
                (probe.service_id().to_string(), status)
            });
        }

        let mut outcomes = Vec::with_capacity(self.probes.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((service, status)) => {
                    let recorded = self.record(&service, status);
                    outcomes.push(ProbeOutcome { service, status, recorded });
                }
                Err(err) => tracing::error!("Health probe task failed: {}", err),
            }
        }

        outcomes.sort_by(|a, b| a.service.cmp(&b.service));
        outcomes
    }

    /// Polls on a fixed period until `shutdown` flips to `true` or its sender is dropped
    pub async fn run(self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Starting {} health probes every {:?}", self.probes.len(), period);

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Health probes stopped");
    }

    fn record(&self, service: &str, status: HealthStatus) -> bool {
        match self.catalog.get_service(service) {
            Ok(current) if current.health == status => true,
            Ok(current) => match self.catalog.report_health(service, status) {
                Ok(_) => {
                    tracing::info!("Health of '{}' changed from {} to {}", service, current.health, status);
                    true
                }
                Err(err) => {
                    tracing::warn!("Failed to record health of '{}': {}", service, err);
                    false
                }
            },
            Err(err) => {
                tracing::warn!("Skipping probe result for '{}': {}", service, err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use catalog_core::NewService;
    use pretty_assertions::assert_eq;
    use tokio_test::assert_ok;

    use super::*;

    struct StaticProbe {
        service: String,
        status: HealthStatus,
    }

    impl StaticProbe {
        fn new(service: &str, status: HealthStatus) -> Self {
            Self { service: service.to_string(), status }
        }
    }

    #[async_trait]
    impl HealthProbe for StaticProbe {
        fn service_id(&self) -> &str {
            &self.service
        }

        async fn probe(&self) -> HealthStatus {
            self.status
        }
    }

    fn catalog() -> Arc<Catalog> {
        let catalog = Catalog::new();
        catalog.register_service(NewService::new("api", "API")).unwrap();
        catalog.register_service(NewService::new("db", "Database")).unwrap();
        catalog.add_dependency("api", "db").unwrap();
        Arc::new(catalog)
    }

    #[tokio::test]
    async fn test_poll_once_records_results() {
        let catalog = catalog();
        let runner = ProbeRunner::new(Arc::clone(&catalog))
            .with_probe(StaticProbe::new("db", HealthStatus::Degraded))
            .with_probe(StaticProbe::new("api", HealthStatus::Healthy))
            .with_probe(StaticProbe::new("ghost", HealthStatus::Healthy));

        let outcomes = runner.poll_once().await;
        assert_eq!(
            outcomes,
            vec![
                ProbeOutcome { service: "api".into(), status: HealthStatus::Healthy, recorded: true },
                ProbeOutcome { service: "db".into(), status: HealthStatus::Degraded, recorded: true },
                ProbeOutcome { service: "ghost".into(), status: HealthStatus::Healthy, recorded: false },
            ]
        );
        assert_eq!(catalog.effective_health("api").unwrap(), HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_unchanged_status_keeps_timestamp() {
        let catalog = catalog();
        catalog.report_health("db", HealthStatus::Healthy).unwrap();
        let before = catalog.get_service("db").unwrap().updated_at;

        let runner = ProbeRunner::new(Arc::clone(&catalog))
            .with_probe(StaticProbe::new("db", HealthStatus::Healthy));
        runner.poll_once().await;

        assert_eq!(catalog.get_service("db").unwrap().updated_at, before);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let catalog = catalog();
        let runner = ProbeRunner::new(Arc::clone(&catalog))
            .with_probe(StaticProbe::new("db", HealthStatus::Unhealthy));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(runner.run(Duration::from_millis(10), rx));

        // The first tick fires immediately
        for _ in 0..100 {
            if catalog.get_service("db").unwrap().health == HealthStatus::Unhealthy {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(catalog.get_service("db").unwrap().health, HealthStatus::Unhealthy);

        tx.send(true).unwrap();
        let joined = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert_ok!(assert_ok!(joined));
    }
}
