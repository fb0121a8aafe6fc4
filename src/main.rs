//! CRM export server
//!
//! Serves the export pipeline over HTTP: clients post a store snapshot and
//! a customer selection, receive a fingerprinted export id, and later
//! download the document with its integrity headers.
//!
//! Module structure:
//! - `domain/` - Record and export types, request validation, errors
//! - `services/` - Canonicalizer, fingerprint, registry, attestation, export service
//! - `io/` - HTTP API, proof authority client, export client
//! - `infra/` - Config, Metrics

use clap::Parser;
use crm_export::infra::{Config, Metrics};
use crm_export::io::{start_api_server, AuthorityAttestor};
use crm_export::services::{AttestationProvider, ExportRegistry, ExportService, FallbackAttestor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// CRM export server - deterministic, verifiable customer exports
#[derive(Parser, Debug)]
#[command(name = "crm-export-server", version, about)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE or config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the listen port from the config file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Structured logging, level via RUST_LOG (default: info)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(version = %env!("CARGO_PKG_VERSION"), git_hash = %env!("GIT_HASH"), "crm-export starting");

    let args = Args::parse();
    let config_path = Config::resolve_config_path(args.config.as_deref());
    let mut config = Config::load_from_path(&config_path);
    if let Some(port) = args.port {
        config = config.with_port(port);
    }

    info!(
        config_file = %config.config_file(),
        bind_address = %config.bind_address(),
        port = %config.port(),
        max_body_bytes = %config.max_body_bytes(),
        attestation_url = %config.attestation_url().unwrap_or("none"),
        site = %config.site_id(),
        "config_loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Registry lives for the whole process and is injected into the service
    let metrics = Arc::new(Metrics::new());
    let registry = Arc::new(ExportRegistry::new());

    let primary: Option<Arc<dyn AttestationProvider>> = match config.attestation_url() {
        Some(url) => {
            match AuthorityAttestor::new(url, Duration::from_millis(config.attestation_timeout_ms())) {
                Ok(authority) => Some(Arc::new(authority) as Arc<dyn AttestationProvider>),
                Err(e) => {
                    warn!(error = %e, "attestation_authority_unavailable");
                    None
                }
            }
        }
        None => None,
    };
    let attestor = Arc::new(FallbackAttestor::new(primary, metrics.clone()));
    let service = Arc::new(ExportService::new(registry.clone(), attestor, metrics.clone()));

    // Periodic metrics log line
    let metrics_interval = config.metrics_interval_secs();
    if metrics_interval > 0 {
        let metrics = metrics.clone();
        let registry = registry.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
            interval.tick().await;
            loop {
                interval.tick().await;
                metrics.report(registry.len()).log();
            }
        });
    }

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    start_api_server(&config, service, shutdown_rx).await?;

    info!(exports = %registry.len(), "crm-export shutdown complete");
    Ok(())
}
