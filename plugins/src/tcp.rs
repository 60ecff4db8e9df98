use std::time::{Duration, Instant};

use async_trait::async_trait;
use catalog_core::HealthStatus;
use tokio::net::TcpStream;

use crate::HealthProbe;

/// Connects to a TCP address.
///
/// Healthy when the connection opens within the slow threshold, degraded when
/// it opens later but within the timeout, unhealthy otherwise.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    service_id: String,
    address: String,
    timeout: Duration,
    slow_threshold: Duration,
}

impl TcpProbe {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
    pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_millis(500);

    pub fn new(service_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            address: address.into(),
            timeout: Self::DEFAULT_TIMEOUT,
            slow_threshold: Self::DEFAULT_SLOW_THRESHOLD,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_slow_threshold(mut self, slow_threshold: Duration) -> Self {
        self.slow_threshold = slow_threshold;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl HealthProbe for TcpProbe {
    fn service_id(&self) -> &str {
        &self.service_id
    }

    async fn probe(&self) -> HealthStatus {
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, TcpStream::connect(self.address.as_str())).await {
            Ok(Ok(_stream)) => {
                let elapsed = started.elapsed();
                if elapsed > self.slow_threshold {
                    tracing::debug!(
                        service = %self.service_id,
                        address = %self.address,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Slow TCP connect"
                    );
                    HealthStatus::Degraded
                } else {
                    HealthStatus::Healthy
                }
            }
            Ok(Err(err)) => {
                tracing::debug!(service = %self.service_id, address = %self.address, error = %err, "TCP connect failed");
                HealthStatus::Unhealthy
            }
            Err(_) => {
                tracing::debug!(service = %self.service_id, address = %self.address, "TCP connect timed out");
                HealthStatus::Unhealthy
            }
        }
    }
}
