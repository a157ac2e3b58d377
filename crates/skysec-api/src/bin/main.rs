//! SkySec command service entry point
//!
//! # Usage
//!
//! ```bash
//! # Serve the API and dashboard
//! SKYSEC_CONTROL_SECRET=... skysec serve --port 8000
//!
//! # One health snapshot as JSON
//! skysec status
//!
//! # Drop audit records older than the retention window
//! skysec purge --retention-days 30
//!
//! # Check Salesforce credentials
//! skysec auth-check
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use skysec_api::handler::{create_router, AppState};
use skysec_api::SalesforceClient;
use skysec_core::health::{HealthAggregator, HostSampler, ProcSampler};
use skysec_core::{SkysecConfig, SERVICE_NAME, SERVICE_VERSION};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "skysec")]
#[command(about = "SkySec Unified Command - mission readiness API")]
#[command(version)]
struct Cli {
    /// Path to a TOML or YAML config file
    #[arg(short, long, global = true, env = "SKYSEC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Print one health snapshot
    Status,

    /// Remove audit records older than the retention window
    Purge {
        /// Audit log to rewrite
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Days of history to keep
        #[arg(long)]
        retention_days: Option<u32>,
    },

    /// Diagnose Salesforce credentials with one raw token request
    AuthCheck,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { port, host } => {
            let config = SkysecConfig::load(config_path)?;
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

            let state = Arc::new(AppState::from_config(&config)?);
            let router = create_router(state);

            tracing::info!("Starting {} v{} on {}", SERVICE_NAME, SERVICE_VERSION, addr);
            tracing::info!(
                audit_log = %config.audit.log_file.display(),
                services = config.health.services.len(),
                "Demo mode: simulated service registry"
            );

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router).await?;
        }

        Commands::Status => {
            let config = SkysecConfig::load_offline(config_path)?;

            // CPU usage is a delta between two reads; take the baseline first
            let mut sampler = ProcSampler::new();
            sampler.sample()?;
            tokio::time::sleep(Duration::from_millis(250)).await;

            let mut aggregator = HealthAggregator::new(&config.health, Box::new(sampler));
            let snapshot = aggregator.snapshot()?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }

        Commands::Purge {
            log_file,
            retention_days,
        } => {
            let config = SkysecConfig::load_offline(config_path)?;
            let log_file = log_file.unwrap_or(config.audit.log_file);
            let retention_days = retention_days.unwrap_or(config.audit.retention_days);
            if retention_days == 0 {
                anyhow::bail!("--retention-days must be at least 1");
            }

            let report = skysec_audit::purge(&log_file, retention_days, chrono::Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::AuthCheck => {
            let config = SkysecConfig::load_offline(config_path)?;
            let client = SalesforceClient::new(config.salesforce)?;
            let report = client.diagnose().await;
            println!("{}", serde_json::to_string_pretty(&report)?);

            if !report.success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
