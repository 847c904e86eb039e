//! Bounded-concurrency batch execution.
//!
//! [`BatchExecutor::run`] pushes a list of favorites through a worker pool
//! in fixed-size chunks. Every item is its own spawned task, capped by a
//! semaphore and a per-item deadline; a failing, hanging or panicking item
//! is recorded and never affects its siblings.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use favsync_core::{CatalogError, FavoriteItem};
use tokio::sync::Semaphore;
use tokio::task::JoinError;

/// Default per-item deadline: 10 minutes.
pub const DEFAULT_UNIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Default pause between chunks.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(3);

/// Default number of items per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for one [`BatchExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum units running at the same time.
    pub max_workers: usize,
    /// Items submitted per chunk.
    pub chunk_size: usize,
    /// How long a single unit may run before it is abandoned.
    pub unit_timeout: Duration,
    /// Pause between two chunks. Not applied after the last one.
    pub cooldown: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            unit_timeout: DEFAULT_UNIT_TIMEOUT,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why a unit ended up in [`BatchOutcome::failed`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FailureReason {
    /// The download or the favorite removal returned an error.
    #[error(transparent)]
    Error(#[from] CatalogError),

    /// The unit did not finish within the deadline and was abandoned.
    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// The unit panicked.
    #[error("worker panicked: {0}")]
    Panicked(String),

    /// The unit's task was cancelled before it finished.
    #[error("worker cancelled: {0}")]
    Cancelled(String),
}

impl FailureReason {
    /// Timeouts, panics and cancellations are faults of the worker rather
    /// than of the catalog; they are surfaced as the run's last error.
    pub fn is_worker_fault(&self) -> bool {
        !matches!(self, FailureReason::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedItem {
    pub item: FavoriteItem,
    pub reason: FailureReason,
}

/// Result of a batch. `succeeded` and `failed` partition the input.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<FavoriteItem>,
    pub failed: Vec<FailedItem>,
    /// Number of chunks processed.
    pub chunks: usize,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct BatchExecutor {
    config: BatchConfig,
}

impl BatchExecutor {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    /// Run `work` once for every item.
    ///
    /// Chunks run strictly one after another; inside a chunk, completion
    /// order is unspecified. Never fails: every item lands in either
    /// `succeeded` or `failed`.
    pub async fn run<F, Fut>(&self, items: Vec<FavoriteItem>, work: F) -> BatchOutcome
    where
        F: Fn(FavoriteItem) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CatalogError>> + Send + 'static,
    {
        let mut outcome = BatchOutcome::default();
        if items.is_empty() {
            return outcome;
        }

        let total = items.len();
        let chunk_size = self.config.chunk_size.clamp(1, total);
        let chunk_count = total.div_ceil(chunk_size);
        let workers = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let work = Arc::new(work);

        for (index, chunk) in items.chunks(chunk_size).enumerate() {
            let first = index * chunk_size + 1;
            let last = first + chunk.len() - 1;
            tracing::info!(
                chunk = index + 1,
                chunks = chunk_count,
                "Processing chunk of {} items ({first}-{last} of {total})",
                chunk.len(),
            );

            let handles: Vec<_> = chunk
                .iter()
                .map(|item| {
                    let handle = tokio::spawn(run_unit(
                        Arc::clone(&workers),
                        Arc::clone(&work),
                        item.clone(),
                        self.config.unit_timeout,
                    ));
                    (item.clone(), handle)
                })
                .collect();

            for (item, handle) in handles {
                let result = handle.await.unwrap_or_else(|e| Err(join_failure(e)));

                match result {
                    Ok(()) => outcome.succeeded.push(item),
                    Err(reason) => {
                        tracing::error!(
                            item_id = %item.id,
                            category = %item.category,
                            error = %reason,
                            "Failed to process item",
                        );
                        outcome.failed.push(FailedItem { item, reason });
                    }
                }
            }

            outcome.chunks += 1;

            if index + 1 < chunk_count {
                tokio::time::sleep(self.config.cooldown).await;
            }
        }

        outcome
    }
}

/// One unit: wait for a worker slot, then run `work` under the deadline.
async fn run_unit<F, Fut>(
    workers: Arc<Semaphore>,
    work: Arc<F>,
    item: FavoriteItem,
    unit_timeout: Duration,
) -> Result<(), FailureReason>
where
    F: Fn(FavoriteItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CatalogError>> + Send + 'static,
{
    let _permit = workers
        .acquire()
        .await
        .map_err(|_| FailureReason::Cancelled("worker pool closed".to_string()))?;

    match tokio::time::timeout(unit_timeout, work(item)).await {
        Ok(result) => result.map_err(FailureReason::from),
        Err(_) => Err(FailureReason::TimedOut(unit_timeout)),
    }
}

/// Classify a unit task that did not return.
fn join_failure(e: JoinError) -> FailureReason {
    if e.is_panic() {
        FailureReason::Panicked(panic_message(e.into_panic()))
    } else {
        FailureReason::Cancelled(e.to_string())
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
