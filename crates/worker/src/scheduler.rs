//! Periodic and manual triggering of the job controller.
//!
//! [`Scheduler::run`] starts one run immediately, then fires on a fixed
//! interval until its [`CancellationToken`] is cancelled. Both the ticker
//! and [`Scheduler::trigger_now`] go through [`JobController::try_start`],
//! so periodic and manual runs can never overlap.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use favsync_core::{StatusStore, Timestamp};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::job::{JobController, RunOutcome};

/// Default time between scheduled runs.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Shortest interval the ticker accepts.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TriggerError {
    #[error("A run is already in progress")]
    Busy,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Cloneable handle that owns the run schedule.
#[derive(Clone)]
pub struct Scheduler {
    controller: Arc<JobController>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(controller: Arc<JobController>, interval: Duration) -> Self {
        Self {
            controller,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn status(&self) -> &StatusStore {
        self.controller.status()
    }

    pub fn is_running(&self) -> bool {
        self.controller.lock().is_running()
    }

    /// Start a run right away, without waiting for it.
    pub fn trigger_now(&self) -> Result<JoinHandle<RunOutcome>, TriggerError> {
        let handle = self.controller.try_start().ok_or(TriggerError::Busy)?;
        tracing::info!("Manual run triggered");
        Ok(handle)
    }

    /// Drive the schedule until `cancel` fires.
    ///
    /// In-flight runs are not awaited on shutdown.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            interval_mins = self.interval.as_secs() / 60,
            "Starting scheduler. First job runs immediately",
        );

        self.fire("startup");

        let mut ticker = Ticker::new(self.interval);
        self.status().set_next_run(Some(ticker.next_fire_at()));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.fire("interval");
                    self.status().set_next_run(Some(ticker.next_fire_at()));
                }
            }
        }

        self.status().set_next_run(None);
    }

    fn fire(&self, trigger: &'static str) {
        if self.controller.try_start().is_some() {
            tracing::debug!(trigger, "Run started");
        } else {
            tracing::info!(trigger, "A job is already running. Skipping this execution");
        }
    }
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Fixed-period timer that knows when it fires next.
///
/// The first tick happens one full period after creation. Late ticks push
/// the schedule back rather than bursting to catch up.
struct Ticker {
    interval: Interval,
    period: Duration,
    next: Instant,
}

impl Ticker {
    fn new(period: Duration) -> Self {
        let start = Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            period,
            next: start,
        }
    }

    async fn tick(&mut self) {
        self.interval.tick().await;
        self.next = Instant::now() + self.period;
    }

    /// Wall-clock time of the next tick.
    fn next_fire_at(&self) -> Timestamp {
        let remaining = self.next.saturating_duration_since(Instant::now());
        Utc::now() + chrono::Duration::from_std(remaining).unwrap_or_else(|_| chrono::Duration::zero())
    }
}
