//! Front gateway (v1)
//!
//! A dynamic reverse proxy built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                    FRONT GATEWAY                      │
//!   Backend instance   │  ┌──────────────┐                                     │
//!   Handle.Update ─────┼─▶│   control    │──┐                                  │
//!   Handle.Delete      │  │   server     │  │   ┌──────────────┐               │
//!                      │  └──────────────┘  ├──▶│   registry   │◀── prober     │
//!   Client request     │  ┌──────────────┐  │   │ prefix → LB  │   (sweeps)    │
//!   ───────────────────┼─▶│ http gateway │──┘   └──────┬───────┘               │
//!                      │  └──────────────┘             ▼                       │
//!                      │                        ┌──────────────┐               │
//!   Client response    │                        │   cluster    │               │
//!   ◀──────────────────┼────────────────────────│ sticky / bal │◀──────────────┼── Backend
//!                      │                        └──────────────┘               │   /ping
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use front_gateway::config::{load_config, validate_config, ConfigError, FrontConfig};
use front_gateway::lifecycle::{launch, signals::wait_for_signal, Shutdown};
use front_gateway::observability::{logging::init_logging, metrics::init_metrics};

#[derive(Parser, Debug)]
#[command(name = "front")]
#[command(about = "Dynamic front gateway for self-registering backends", long_about = None)]
struct Cli {
    /// Config file in TOML; built-in defaults apply when omitted.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// HTTP gateway listen address, overrides listener.bind_address.
    #[arg(long)]
    http_address: Option<String>,

    /// Service registration (RPC) address, overrides control.bind_address.
    #[arg(long)]
    rpc_address: Option<String>,

    /// Log file, overrides observability.log_file.
    #[arg(long)]
    log: Option<String>,

    /// Force enable the front service.
    #[arg(short = 'F', long)]
    force: bool,

    /// Load balance across endpoints instead of sticky routing.
    #[arg(short = 'B', long)]
    balance: bool,
}

impl Cli {
    fn apply(&self, config: &mut FrontConfig) {
        if let Some(addr) = &self.http_address {
            config.listener.bind_address = addr.clone();
        }
        if let Some(addr) = &self.rpc_address {
            config.control.bind_address = addr.clone();
        }
        if let Some(log) = &self.log {
            config.observability.log_file = log.clone();
        }
        if self.force {
            config.front.enabled = true;
        }
        if self.balance {
            config.front.balance = true;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("[front] failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => FrontConfig::default(),
    };
    cli.apply(&mut config);

    if let Err(e) = init_logging(&config.observability) {
        eprintln!(
            "[front] failed to open log file {}: {}",
            config.observability.log_file, e
        );
        return ExitCode::FAILURE;
    }
    if let Err(e) = validate_config(&config).map_err(ConfigError::Validation) {
        tracing::error!(error = %e, "Invalid configuration");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        http = %config.listener.bind_address,
        rpc = %config.control.bind_address,
        balance = config.front.balance,
        probe_interval_secs = config.health_check.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let launched = match launch(&config, &shutdown).await {
        Ok(launched) => launched,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    wait_for_signal().await;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
    if !launched.drain().await {
        tracing::warn!("Forced exit after shutdown deadline");
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
