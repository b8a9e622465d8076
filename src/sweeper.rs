//! Background expiry sweeping
//!
//! By default the group ledger evicts expired placements only when a repair
//! query runs. A [`Sweeper`] adds a periodic sweep on top, so stale
//! placements do not linger between repair rounds. It never changes what a
//! sweep does, only when one happens.

use crate::group::GroupIndex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Shortest period a sweeper will run at
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to a running sweep task.
#[derive(Debug)]
pub struct Sweeper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Start sweeping `index` every `interval`.
    ///
    /// Must be called from within a tokio runtime. The first sweep happens
    /// one full interval after spawning. Intervals shorter than
    /// [`MIN_SWEEP_INTERVAL`] are raised to it.
    pub fn spawn(index: Arc<GroupIndex>, interval: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        if interval < MIN_SWEEP_INTERVAL {
            warn!(requested = ?interval, used = ?MIN_SWEEP_INTERVAL, "sweep interval too short, clamping");
        }
        let interval = interval.max(MIN_SWEEP_INTERVAL);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval = ?interval, "ledger sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let both_cleaned = index.clean_expired_objects();
                        let stats = index.stats();
                        debug!(
                            both_cleaned,
                            objects = stats.objects,
                            peers = stats.peers,
                            "background sweep"
                        );
                    }
                    changed = shutdown_rx.changed() => {
                        // A dropped sender also means stop
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("ledger sweeper stopped");
        });

        Self { shutdown, handle }
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            if err.is_panic() {
                warn!(error = %err, "ledger sweeper panicked");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
