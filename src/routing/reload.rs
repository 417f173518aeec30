//! Cross-process route freshness.
//!
//! Another process may install or uninstall a module at any time. It
//! publishes that through the durable change marker; this monitor polls the
//! marker on an interval (never per request), and when it moved, resyncs the
//! registry from the record store and invalidates the local route table.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::registry::ModuleRegistry;

pub struct ReloadMonitor {
    registry: Arc<ModuleRegistry>,
    interval: Duration,
    last_sync: f64,
}

impl ReloadMonitor {
    pub fn new(registry: Arc<ModuleRegistry>, interval: Duration) -> Self {
        let last_sync = registry.notifier().last_changed();
        Self {
            registry,
            interval,
            last_sync,
        }
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Route reload monitor starting");

        // Spread the first tick so processes started together don't poll
        // the marker in lockstep.
        let jitter_ms = fastrand::u64(0..=self.interval.as_millis() as u64);
        let start = Instant::now() + self.interval + Duration::from_millis(jitter_ms);
        let mut ticker = time::interval_at(start, self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Route reload monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Resync if the change marker moved since the last sync.
    pub async fn poll(&mut self) -> bool {
        let last_changed = self.registry.notifier().last_changed();
        if last_changed <= self.last_sync {
            return false;
        }
        tracing::debug!(last_changed, last_sync = self.last_sync, "Route change detected");
        self.last_sync = last_changed;
        self.registry.synchronize().await;
        true
    }
}
