//! Periodic health sweeps.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::routing::Registry;

/// Background loop that sweeps every cluster on a fixed interval.
pub struct Prober {
    registry: Arc<Registry>,
    interval: Duration,
}

impl Prober {
    pub fn new(registry: Arc<Registry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    pub fn from_config(registry: Arc<Registry>, config: &HealthCheckConfig) -> Self {
        Self::new(registry, Duration::from_secs(config.interval_secs))
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Health prober starting");

        // First sweep after one full interval, not at startup.
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health prober received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn sweep(&self) {
        let reports = self.registry.sweep_all().await;
        let evicted: usize = reports.iter().map(|(_, report)| report.evicted).sum();
        let empty = reports.iter().filter(|(_, report)| report.is_empty()).count();

        tracing::debug!(
            clusters = reports.len(),
            evicted,
            empty_clusters = empty,
            "Health sweep finished"
        );
    }
}
