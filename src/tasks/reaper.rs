//! Expiry Reaper
//!
//! Background task that periodically removes expired cache entries. It is
//! started lazily the first time an expiring entry is stored and stopped for
//! good by `destroy`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Something the reaper can sweep.
pub trait Sweep: Send + Sync + 'static {
    /// Removes dead entries, returning how many were removed.
    fn sweep(&self) -> usize;
}

// == Reaper State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaperState {
    NotStarted,
    Running,
    /// Terminal
    Stopped,
}

// == Reaper ==
#[derive(Debug)]
pub struct Reaper {
    state: ReaperState,
    interval_secs: Arc<AtomicU64>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    runtime: Option<Handle>,
}

impl Reaper {
    /// Creates a reaper that has not been started yet.
    ///
    /// `runtime` is used to spawn the task; when None the runtime current at
    /// start time is used.
    pub fn new(interval_secs: u64, runtime: Option<Handle>) -> Self {
        Self {
            state: ReaperState::NotStarted,
            interval_secs: Arc::new(AtomicU64::new(interval_secs)),
            cancel: CancellationToken::new(),
            handle: None,
            runtime,
        }
    }

    pub fn state(&self) -> ReaperState {
        self.state
    }

    /// Takes effect at the next sleep.
    pub fn set_interval(&self, secs: u64) {
        self.interval_secs.store(secs, Ordering::Relaxed);
    }

    // == Ensure Started ==
    /// Spawns the sweep loop unless it is already running or was stopped.
    ///
    /// Returns true if the reaper is running afterwards.
    pub fn ensure_started(&mut self, target: Weak<dyn Sweep>) -> bool {
        match self.state {
            ReaperState::Running => return true,
            ReaperState::Stopped => return false,
            ReaperState::NotStarted => {}
        }

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!("No Tokio runtime available, expired entries are only purged on access");
            return false;
        };

        let interval = Arc::clone(&self.interval_secs);
        let cancel = self.cancel.clone();
        self.handle = Some(runtime.spawn(sweep_loop(target, interval, cancel)));
        self.state = ReaperState::Running;
        true
    }

    // == Stop ==
    /// Cancels the sweep loop. The reaper cannot be restarted afterwards.
    ///
    /// Returns the handle of the loop if one was spawned, so callers can wait
    /// for it to exit.
    pub fn stop(&mut self) -> Option<JoinHandle<()>> {
        if self.state != ReaperState::Stopped {
            self.cancel.cancel();
            self.state = ReaperState::Stopped;
            info!("Reaper stopped");
        }
        self.handle.take()
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn sweep_loop(target: Weak<dyn Sweep>, interval: Arc<AtomicU64>, cancel: CancellationToken) {
    info!(
        "Starting reaper with interval of {} seconds",
        interval.load(Ordering::Relaxed)
    );

    loop {
        let period = Duration::from_secs(interval.load(Ordering::Relaxed).max(1));

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(period) => {}
        }

        // The cache is gone once every handle has been dropped
        let Some(target) = target.upgrade() else {
            break;
        };

        let removed = target.sweep();
        if removed > 0 {
            info!("Reaper: removed {} expired entries", removed);
        } else {
            debug!("Reaper: no expired entries found");
        }
    }

    debug!("Reaper loop exited");
}
