//! Startup orchestration.
//!
//! # Responsibilities
//! - Refuse to start when the front service is not enabled
//! - Build the registry and bind both listeners
//! - Spawn the gateway, the control server and the prober
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners bind before anything is spawned, so a half-started gateway
//!   never serves traffic

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::FrontConfig;
use crate::control::ControlServer;
use crate::health::Prober;
use crate::http::GatewayServer;
use crate::lifecycle::Shutdown;
use crate::routing::Registry;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Front service is not enabled, use -F to force.")]
    Disabled,

    #[error("failed to listen on {address} ({role}): {source}")]
    Bind {
        role: &'static str,
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// A running gateway.
pub struct Launched {
    pub gateway_addr: SocketAddr,
    pub control_addr: SocketAddr,
    pub registry: Arc<Registry>,
    pub shutdown_deadline: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl Launched {
    /// Wait for every background task to finish (after shutdown).
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "Background task panicked");
                }
            }
        }
    }

    /// Wait at most `deadline` for the tasks to drain, then abort the rest.
    /// Returns `true` when everything stopped on its own.
    pub async fn wait_for(self, deadline: Duration) -> bool {
        let handles: Vec<_> = self.tasks.iter().map(JoinHandle::abort_handle).collect();
        match tokio::time::timeout(deadline, self.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(deadline = ?deadline, "Shutdown deadline passed, aborting in-flight work");
                for handle in handles {
                    handle.abort();
                }
                false
            }
        }
    }

    /// [`Launched::wait_for`] with the configured `timeouts.shutdown_secs`.
    pub async fn drain(self) -> bool {
        let deadline = self.shutdown_deadline;
        self.wait_for(deadline).await
    }
}

async fn bind(role: &'static str, address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            role,
            address: address.to_string(),
            source,
        })
}

/// Start the gateway described by `config`; everything stops on `shutdown`.
pub async fn launch(config: &FrontConfig, shutdown: &Shutdown) -> Result<Launched, StartupError> {
    if !config.front.enabled {
        return Err(StartupError::Disabled);
    }

    let registry = Arc::new(Registry::from_config(config));

    let gateway_listener = bind("http gateway", &config.listener.bind_address).await?;
    let control_listener = bind("control plane", &config.control.bind_address).await?;
    let local = |listener: &TcpListener, role: &'static str, address: &str| {
        listener.local_addr().map_err(|source| StartupError::Bind {
            role,
            address: address.to_string(),
            source,
        })
    };
    let gateway_addr = local(&gateway_listener, "http gateway", &config.listener.bind_address)?;
    let control_addr = local(&control_listener, "control plane", &config.control.bind_address)?;

    tracing::info!(
        gateway = %gateway_addr,
        control = %control_addr,
        mode = ?registry.mode(),
        "Front gateway starting"
    );

    let mut tasks = Vec::with_capacity(3);

    let gateway = GatewayServer::new(registry.clone());
    let signalled = shutdown.signalled();
    tasks.push(tokio::spawn(async move {
        if let Err(e) = gateway.run(gateway_listener, signalled).await {
            tracing::error!(error = %e, "HTTP gateway failed");
        }
    }));

    let control = ControlServer::new(registry.clone());
    let signalled = shutdown.signalled();
    tasks.push(tokio::spawn(async move {
        if let Err(e) = control.run(control_listener, signalled).await {
            tracing::error!(error = %e, "Control server failed");
        }
    }));

    let prober = Prober::from_config(registry.clone(), &config.health_check);
    tasks.push(tokio::spawn(prober.run(shutdown.subscribe())));

    Ok(Launched {
        gateway_addr,
        control_addr,
        registry,
        shutdown_deadline: Duration::from_secs(config.timeouts.shutdown_secs),
        tasks,
    })
}
