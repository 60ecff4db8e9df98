use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{CatalogdError, Result};

/// Initializes the global tracing subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| CatalogdError::Config(format!("Invalid log level '{}': {}", config.level, e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json { builder.json().try_init() } else { builder.try_init() };

    result.map_err(|e| CatalogdError::Config(format!("Failed to initialize logging: {}", e)))
}
