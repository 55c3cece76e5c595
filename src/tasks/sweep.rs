//! Local Tier Sweep Task
//!
//! Background task that periodically removes stale local-tier entries so
//! memory is reclaimed even for keys nobody reads again.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::LocalCache;

/// Owner handle of a running sweep task.
///
/// [`SweepHandle::stop`] signals the task and waits for it to finish;
/// [`SweepHandle::abort`] is the non-async fallback used on drop.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl SweepHandle {
    /// Stops the sweep and waits until the task has exited.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = self.join.await {
            if !e.is_cancelled() {
                warn!(error = %e, "sweep task ended abnormally");
            }
        }
    }

    /// Cancels the task without waiting.
    pub fn abort(&self) {
        self.join.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Spawns a task that sweeps `cache` every `interval`.
///
/// The first sweep happens one interval after spawning. The lock is held
/// only for the duration of one sweep.
///
/// # Panics
/// Panics if `interval` is zero or if called outside a tokio runtime.
///
/// # Example
/// ```ignore
/// let local = Arc::new(Mutex::new(LocalCache::<String>::new(1000)));
/// let sweeper = spawn_sweep_task(local.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// sweeper.stop().await;
/// ```
pub fn spawn_sweep_task<V>(cache: Arc<Mutex<LocalCache<V>>>, interval: Duration) -> SweepHandle
where
    V: Clone + Send + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let join = tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting local sweep task");

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("local sweep task stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let (removed, remaining) = {
                        let mut guard = cache.lock();
                        (guard.sweep_expired(), guard.len())
                    };

                    if removed > 0 {
                        info!(removed, remaining, "local sweep removed stale entries");
                    } else {
                        debug!(remaining, "local sweep found no stale entries");
                    }
                }
            }
        }
    });

    SweepHandle {
        shutdown: Some(shutdown_tx),
        join,
    }
}
