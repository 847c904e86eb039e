//! Scheduled batch-download orchestration.
//!
//! - [`fetcher`]: paginated favorites retrieval.
//! - [`executor`]: chunked, bounded-concurrency batch execution.
//! - [`job`]: the single-run job controller.
//! - [`scheduler`]: startup, periodic and manual run triggering.

pub mod executor;
pub mod fetcher;
pub mod job;
pub mod scheduler;

pub use executor::{BatchConfig, BatchExecutor, BatchOutcome, FailedItem, FailureReason};
pub use fetcher::FavoritesFetcher;
pub use job::{CategoryResult, JobController, JobError, JobSettings, RunOutcome, RunSummary};
pub use scheduler::{Scheduler, TriggerError};
