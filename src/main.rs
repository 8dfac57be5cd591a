//! Acmegate: process entry point.
//!
//! Initializes tracing, loads configuration from a TOML file, starts the
//! plaintext listener, and, when a certificate pair is configured and loads
//! cleanly, starts the encrypted listener as well. A certificate failure
//! only costs the encrypted listener; the plaintext one keeps serving so
//! ACME challenges can still be answered.

use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use acmegate::config::{AppConfig, DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER};
use acmegate::http::shutdown_signal;
use acmegate::EdgeServer;

/// Acmegate: ACME HTTP-01 challenge responder and HTTPS redirect edge
#[derive(Parser, Debug)]
#[command(name = "acmegate", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Log level filter (e.g., "acmegate=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config = AppConfig::load(&args.config)?;

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&log_filter));
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Loaded configuration");

    let http_addr: SocketAddr = format!("{}:{}", config.http.host, config.http.port).parse()?;
    let https_addr: SocketAddr =
        format!("{}:{}", config.http.host, config.http.https_port).parse()?;

    let server = EdgeServer::new(http_addr, https_addr);

    let addr = server.start().await?;
    tracing::info!(%addr, "Plaintext listener ready");

    // The encrypted listener only comes up if a certificate pair is already
    // on disk; otherwise the process serves plaintext until its ACME client
    // obtains one and the process is restarted with the new pair.
    if let Some((cert_path, key_path)) = config.tls.cert_pair() {
        match start_encrypted_from_files(&server, cert_path, key_path).await {
            Ok(addr) => {
                tracing::info!(%addr, cert = %cert_path, "Encrypted listener ready");
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    cert = %cert_path,
                    key = %key_path,
                    "Encrypted listener failed to start; serving plaintext only"
                );
            }
        }
    } else {
        tracing::warn!("No certificate pair configured; encrypted listener not started");
    }

    shutdown_signal().await;
    server.shutdown().await;

    Ok(())
}

/// Reads the PEM certificate pair from disk and starts the encrypted listener.
async fn start_encrypted_from_files(
    server: &EdgeServer,
    cert_path: &str,
    key_path: &str,
) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    let cert_pem = tokio::fs::read(cert_path).await?;
    let key_pem = tokio::fs::read(key_path).await?;
    Ok(server.start_encrypted(&cert_pem, &key_pem).await?)
}
