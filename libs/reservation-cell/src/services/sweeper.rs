use std::sync::Arc;

use chrono::Utc;
use tokio::time::Duration;
use tracing::{debug, info, instrument};

use crate::services::holds::ReservationStore;

/// Periodic background task that expires overdue holds.
///
/// The sweeper only ever calls the store's per-key compare-and-set; it holds
/// no lock between keys and a concurrent consume that reaches a key first
/// simply wins.
pub struct ExpirySweeper {
    store: Arc<ReservationStore>,
    interval_seconds: u64,
    is_shutdown: tokio::sync::RwLock<bool>,
}

impl ExpirySweeper {
    pub fn new(store: Arc<ReservationStore>, interval_seconds: u64) -> Self {
        Self {
            store,
            interval_seconds,
            is_shutdown: tokio::sync::RwLock::new(false),
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) {
        info!(
            "Expiry sweeper started, interval {}s",
            self.interval_seconds
        );
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_seconds));

        loop {
            interval.tick().await;

            if *self.is_shutdown.read().await {
                info!("Expiry sweeper shutting down");
                break;
            }

            let swept = self.store.sweep_expired(Utc::now());
            if swept > 0 {
                info!("Swept {} expired holds", swept);
            } else {
                debug!("Sweep pass found no expired holds");
            }
        }
    }

    pub async fn shutdown(&self) {
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }
}
