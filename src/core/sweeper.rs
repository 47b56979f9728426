use crate::core::coordinator::Coordinator;
use crate::domain::ports::{PaymentGateway, ReservationStore, SlotGrid};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Background task that periodically force-expires reservations stuck in
/// pending. Each pass goes through `Coordinator::expire`, the same release
/// path a provider decline uses, so a concurrent provider action simply
/// wins the record's CAS and the sweep moves on.
pub struct ExpirySweeper<G, S, P>
where
    G: SlotGrid + Send + Sync + 'static,
    S: ReservationStore + Send + Sync + 'static,
    P: PaymentGateway + Send + Sync + 'static,
{
    coordinator: Arc<Coordinator<G, S, P>>,
    interval: Duration,
    pending_timeout: ChronoDuration,
}

impl<G, S, P> ExpirySweeper<G, S, P>
where
    G: SlotGrid + Send + Sync + 'static,
    S: ReservationStore + Send + Sync + 'static,
    P: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(
        coordinator: Arc<Coordinator<G, S, P>>,
        interval: Duration,
        pending_timeout: ChronoDuration,
    ) -> Self {
        Self {
            coordinator,
            interval,
            pending_timeout,
        }
    }

    /// Spawns the sweep loop. Flipping the returned channel to `true`
    /// stops it after the current pass.
    pub fn spawn(self) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick fires immediately; skip it so a fresh start
            // does not sweep before anything can be stale.
            ticker.tick().await;

            tracing::info!(
                "Expiry sweeper running every {:?}, timeout {}h",
                self.interval,
                self.pending_timeout.num_hours()
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.coordinator.sweep_expired(self.pending_timeout).await {
                            Ok(0) => {}
                            Ok(n) => tracing::info!("Expiry sweep released {} reservations", n),
                            Err(e) => tracing::error!("Expiry sweep failed: {}", e),
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Expiry sweeper stopping");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}
