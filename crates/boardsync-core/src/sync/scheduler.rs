//! Fixed-interval scheduler with a single-active-run guard

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::task::{SyncReport, SyncRunner};
use crate::error::Result;

/// Default interval between ticks
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

/// Allows at most one run at a time
#[derive(Debug, Default)]
pub struct RunGuard {
    running: AtomicBool,
}

/// Held while a run is active; releases the guard on drop
#[derive(Debug)]
pub struct RunPermit {
    guard: Arc<RunGuard>,
}

impl RunGuard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `None` when another run holds the guard
    pub fn try_acquire(self: &Arc<Self>) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                guard: Arc::clone(self),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

/// Ticks a sync runner on a fixed interval until cancelled
pub struct SyncScheduler {
    runner: Arc<dyn SyncRunner>,
    interval: Duration,
    guard: Arc<RunGuard>,
}

impl std::fmt::Debug for SyncScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncScheduler")
            .field("target_type", &self.runner.target_type())
            .field("interval", &self.interval)
            .field("running", &self.guard.is_running())
            .finish()
    }
}

impl SyncScheduler {
    pub fn new(runner: Arc<dyn SyncRunner>) -> Self {
        Self {
            runner,
            interval: DEFAULT_INTERVAL,
            guard: RunGuard::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn guard(&self) -> Arc<RunGuard> {
        Arc::clone(&self.guard)
    }

    /// Run once now; `Ok(None)` if a run is already active
    pub async fn run_once(&self) -> Result<Option<SyncReport>> {
        let Some(_permit) = self.guard.try_acquire() else {
            debug!(target_type = %self.runner.target_type(), "Previous run still active, skipping");
            return Ok(None);
        };
        self.runner.run().await.map(Some)
    }

    /// Tick until `cancel` fires, then wait for the active run to finish
    ///
    /// Events stranded in PROCESSING by an earlier process are released first.
    /// Only one worker process per store is supported: a second worker starting
    /// up would put this one's claimed events back to WAIT.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let released = self.runner.release_in_flight().await?;
        info!(
            target_type = %self.runner.target_type(),
            interval_ms = self.interval.as_millis() as u64,
            released,
            "Sync scheduler started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut active: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(permit) = self.guard.try_acquire() else {
                        debug!("Previous run still active, skipping tick");
                        continue;
                    };
                    let runner = Arc::clone(&self.runner);
                    active = Some(tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(e) = runner.run().await {
                            error!(error = %e, "Sync run failed");
                        }
                    }));
                }
            }
        }

        if let Some(handle) = active
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Sync run task did not finish cleanly");
        }

        info!(target_type = %self.runner.target_type(), "Sync scheduler stopped");
        Ok(())
    }
}
