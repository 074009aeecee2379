//! Expiry Sweeper Task
//!
//! Background task that moves expired-but-unread entries to the back of the
//! eviction order, so capacity pressure reclaims stale data before live data.
//! It never deletes entries.

use std::hash::Hash;
use std::io;
use std::sync::{mpsc, Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime;
use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::cache::CacheStore;
use crate::error::Result;

// == Sweep Schedule ==
/// When the sweeper wakes up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepSchedule {
    /// Sleep until the earliest pending deadline, re-armed by sets with a
    /// sooner deadline.
    #[default]
    NearestExpiry,
    /// Sweep on a fixed period.
    Every(Duration),
}

impl SweepSchedule {
    fn follows_deadlines(&self) -> bool {
        matches!(self, SweepSchedule::NearestExpiry)
    }

    /// A zero period would spin; it sweeps at nearest expiry instead.
    pub(crate) fn normalized(self) -> Self {
        match self {
            SweepSchedule::Every(period) if period.is_zero() => SweepSchedule::NearestExpiry,
            schedule => schedule,
        }
    }
}

pub(crate) type SharedStore<K, V> = Arc<Mutex<CacheStore<K, V>>>;

// == Sweeper Handle ==
/// Handle to the running sweeper thread. Dropping it stops the sweeper and
/// waits for the thread to exit.
pub(crate) struct Sweeper {
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Signals the sweeper to exit after its current pass.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Expiry sweeper thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("running", &self.shutdown.is_some())
            .finish()
    }
}

/// Spawns the expiry sweeper for `store` on its own `ttl-sweeper` thread.
///
/// The thread drives a private current-thread runtime, so sweeping does not
/// depend on whatever runtime (if any) the caller is on. The sweeper only
/// holds a weak reference to the store and exits once the store is dropped
/// or the returned handle is stopped.
///
/// # Arguments
/// * `store` - Shared cache store to sweep
/// * `rearm` - Notified by sets whose deadline is sooner than the next wake-up
/// * `schedule` - Wake-up policy
pub(crate) fn spawn_sweeper<K, V>(
    store: &SharedStore<K, V>,
    rearm: Arc<Notify>,
    schedule: SweepSchedule,
) -> Result<Sweeper>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);
    let sweep = run_sweeper(Arc::downgrade(store), rearm, schedule, shutdown_rx);

    // The runtime is built and dropped on the sweeper thread, never inside
    // the caller's async context.
    let thread = thread::Builder::new()
        .name("ttl-sweeper".to_string())
        .spawn(move || {
            let runtime = match runtime::Builder::new_current_thread().enable_time().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            runtime.block_on(sweep);
        })?;

    let sweeper = Sweeper {
        shutdown: Some(shutdown_tx),
        thread: Some(thread),
    };
    match ready_rx.recv() {
        Ok(Ok(())) => Ok(sweeper),
        Ok(Err(err)) => Err(err.into()),
        Err(_) => {
            let err = io::Error::new(io::ErrorKind::Other, "sweeper thread exited during startup");
            Err(err.into())
        }
    }
}

async fn run_sweeper<K, V>(
    store: Weak<Mutex<CacheStore<K, V>>>,
    rearm: Arc<Notify>,
    schedule: SweepSchedule,
    mut shutdown: oneshot::Receiver<()>,
) where
    K: Hash + Eq + Clone,
{
    info!(?schedule, "Starting expiry sweeper");

    loop {
        let deadline = match schedule {
            SweepSchedule::Every(period) => Instant::now().checked_add(period),
            SweepSchedule::NearestExpiry => match pending_expiry(&store) {
                Some(next) => next,
                None => break,
            },
        };

        tokio::select! {
            _ = &mut shutdown => break,
            _ = rearm.notified(), if schedule.follows_deadlines() => {
                trace!("Sweeper re-armed");
                continue;
            }
            _ = sleep_until(deadline) => {}
        }

        let Some(report) = sweep_once(&store) else {
            break;
        };

        if report.demoted > 0 {
            debug!(
                demoted = report.demoted,
                examined = report.examined,
                "Expiry sweep demoted entries"
            );
        } else {
            trace!(examined = report.examined, "Expiry sweep found nothing new");
        }
    }

    info!("Expiry sweeper stopped");
}

/// Next deadline of a live store; None once the store is gone.
fn pending_expiry<K, V>(store: &Weak<Mutex<CacheStore<K, V>>>) -> Option<Option<Instant>>
where
    K: Hash + Eq + Clone,
{
    let store = store.upgrade()?;
    let next = store.lock().next_expiry();
    Some(next)
}

fn sweep_once<K, V>(store: &Weak<Mutex<CacheStore<K, V>>>) -> Option<crate::cache::SweepReport>
where
    K: Hash + Eq + Clone,
{
    let store = store.upgrade()?;
    let report = store.lock().sweep(Instant::now());
    Some(report)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
