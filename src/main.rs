//! catalogd service catalog

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use catalog_api::{create_router, ApiInfo, AppState};
use catalog_plugins::{ProbeRunner, TcpProbe};
use catalogd::config::Config;
use catalogd::schema::{ValidationService, ValidationSummary};
use catalogd::{logging, Catalog, HealthStatus, SnapshotStore};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Command-line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "CATALOGD_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Override the configured listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Catalog document to load when no snapshot exists
        #[arg(short, long)]
        seed: Option<PathBuf>,
    },

    /// Validate a catalog document
    Validate {
        /// Path to the catalog document (YAML or JSON)
        file: PathBuf,
    },

    /// Print the health report of a service in a catalog document
    Health {
        /// Path to the catalog document (YAML or JSON)
        file: PathBuf,

        /// Service id
        service: String,

        /// Override a reported status before computing the report
        #[arg(long = "assume", value_name = "ID=STATUS", value_parser = parse_assumption)]
        assume: Vec<(String, HealthStatus)>,
    },
}

/// Parses `id=status` for `health --assume`
fn parse_assumption(s: &str) -> Result<(String, HealthStatus), String> {
    let (id, status) =
        s.split_once('=').ok_or_else(|| format!("expected ID=STATUS, got '{}'", s))?;
    let status = status.parse::<HealthStatus>().map_err(|e| e.to_string())?;
    Ok((id.trim().to_string(), status))
}

/// Display validation summary
fn display_validation_summary(summary: &ValidationSummary) {
    println!("Validation Summary:");
    println!("------------------");
    println!("Total services: {}", summary.total_count());
    println!("Successful: {}", summary.successful_count());
    println!("Failed: {}", summary.failed_count());
    println!("Warnings: {}", summary.warning_count());
    println!("Timestamp: {}", summary.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));

    if !summary.successful.is_empty() {
        println!("\nSuccessful services:");
        for service in &summary.successful {
            println!("  ✅ {}", service);
        }
    }

    if !summary.warnings.is_empty() {
        println!("\nWarnings:");
        for (service, warnings) in &summary.warnings {
            for warning in warnings {
                println!("  ⚠️  {}: {}", service, warning);
            }
        }
    }

    if !summary.failed.is_empty() {
        println!("\nFailed services:");
        for (service, error) in &summary.failed {
            println!("  ❌ {}: {}", service, error);
        }
    }
}

/// Restores the snapshot if there is one, otherwise loads the seed document
fn build_catalog(store: Option<&SnapshotStore>, seed: Option<&Path>) -> anyhow::Result<Catalog> {
    if let Some(store) = store {
        if let Some(catalog) = store
            .load_catalog()
            .with_context(|| format!("Failed to restore snapshot {}", store.path().display()))?
        {
            info!("Restored catalog from {}", store.path().display());
            return Ok(catalog);
        }
    }

    if let Some(seed) = seed {
        return ValidationService::new()
            .load_catalog(seed)
            .with_context(|| format!("Failed to load seed document {}", seed.display()));
    }

    info!("Starting with an empty catalog");
    Ok(Catalog::new())
}

fn spawn_probes(
    config: &Config,
    catalog: &Arc<Catalog>,
    shutdown: watch::Receiver<bool>,
) -> Option<JoinHandle<()>> {
    if config.probes.targets.is_empty() {
        return None;
    }

    let mut runner = ProbeRunner::new(Arc::clone(catalog));
    for target in &config.probes.targets {
        let probe = TcpProbe::new(&target.service, &target.address)
            .with_timeout(config.probes.timeout())
            .with_slow_threshold(config.probes.slow_threshold());
        runner.add_probe(Arc::new(probe));
    }

    Some(tokio::spawn(runner.run(config.probes.interval(), shutdown)))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let store = config.storage.snapshot_path.as_ref().map(SnapshotStore::new);
    let catalog = Arc::new(build_catalog(store.as_ref(), config.storage.seed_path.as_deref())?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let probes = spawn_probes(&config, &catalog, shutdown_rx);

    let addr = config.socket_addr()?;
    let info = ApiInfo { version: env!("CARGO_PKG_VERSION").to_string(), ..ApiInfo::default() };
    let app = create_router(AppState::new(Arc::clone(&catalog)).with_info(info));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {addr}"))?;
    info!("catalogd listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "Server terminated unexpectedly");
    }

    let _ = shutdown_tx.send(true);
    if let Some(handle) = probes {
        if let Err(e) = handle.await {
            error!("Health probe task join error: {}", e);
        }
    }

    if let Some(store) = &store {
        store.save(&catalog.snapshot()).context("Failed to save snapshot")?;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("SIGINT received, starting graceful shutdown...");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received, starting graceful shutdown...");
        }
    }
}

/// Wait for shutdown signal (SIGINT only on non-Unix platforms)
#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
    info!("Shutdown signal received, starting graceful shutdown...");
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Parse command-line arguments
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(Commands::Serve { port, seed }) = &cli.command {
        if let Some(port) = port {
            config.server.port = *port;
        }
        if let Some(seed) = seed {
            config.storage.seed_path = Some(seed.clone());
        }
    }
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Some(Commands::Serve { .. }) => {
            info!(version = env!("CARGO_PKG_VERSION"), "Starting catalogd...");
            serve(config).await?;
        }
        Some(Commands::Validate { file }) => {
            info!("Validating {}...", file.display());
            let summary = ValidationService::new()
                .validate_file(&file)
                .with_context(|| format!("Failed to validate {}", file.display()))?;
            display_validation_summary(&summary);

            if summary.failed_count() > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Some(Commands::Health { file, service, assume }) => {
            let catalog = ValidationService::new()
                .load_catalog(&file)
                .with_context(|| format!("Failed to load {}", file.display()))?;
            for (id, status) in &assume {
                catalog.report_health(id, *status)?;
            }
            let report = catalog.health_report(&service)?;

            println!("Service: {}", report.service);
            println!("Reported: {}", report.reported);
            println!("Effective: {}", report.effective);
            println!("Cause: {}", report.cause.join(" -> "));
        }
        None => {
            info!("No command specified, use --help for available commands");
        }
    }

    Ok(ExitCode::SUCCESS)
}
