//! The job controller: one full pass over the user's favorites.
//!
//! A run authenticates, fetches all three favorite categories, then
//! downloads tracks, albums and artists in that order through a
//! [`BatchExecutor`]. Progress is mirrored into the [`StatusStore`] as it
//! happens. The [`JobLock`] guarantees at most one run at a time; its guard
//! is held for the whole run and dropped on every exit path.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use favsync_core::{
    CatalogAuth, CatalogError, CatalogUser, Category, Credentials, CurrentItem, Downloader,
    FavoriteItem, FavoritesCount, JobGuard, JobLock, RunPhase, StatusStore,
};
use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::executor::{panic_message, BatchConfig, BatchExecutor};
use crate::fetcher::FavoritesFetcher;

// ---------------------------------------------------------------------------
// Settings and results
// ---------------------------------------------------------------------------

/// Per-category batch configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSettings {
    pub tracks: BatchConfig,
    pub albums: BatchConfig,
    pub artists: BatchConfig,
}

impl JobSettings {
    pub fn batch(&self, category: Category) -> &BatchConfig {
        match category {
            Category::Tracks => &self.tracks,
            Category::Albums => &self.albums,
            Category::Artists => &self.artists,
        }
    }
}

/// Faults that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Catalog login failed: {0}")]
    Auth(#[source] CatalogError),

    #[error("Run panicked: {0}")]
    Panicked(String),
}

/// What one category's batch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryResult {
    pub category: Category,
    pub succeeded: usize,
    pub failed: usize,
    pub chunks: usize,
}

/// Summary of a completed run. Categories with no favorites are absent
/// from `categories`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub favorites_count: FavoritesCount,
    pub categories: Vec<CategoryResult>,
}

impl RunSummary {
    pub fn category(&self, category: Category) -> Option<&CategoryResult> {
        self.categories.iter().find(|r| r.category == category)
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunSummary),
    Failed(JobError),
    /// Another run held the lock; nothing was done.
    Skipped,
}

// ---------------------------------------------------------------------------
// JobController
// ---------------------------------------------------------------------------

pub struct JobController {
    lock: JobLock,
    status: StatusStore,
    auth: Arc<dyn CatalogAuth>,
    downloader: Arc<dyn Downloader>,
    credentials: Credentials,
    fetcher: FavoritesFetcher,
    settings: JobSettings,
}

impl JobController {
    pub fn new(
        auth: Arc<dyn CatalogAuth>,
        downloader: Arc<dyn Downloader>,
        credentials: Credentials,
        settings: JobSettings,
        lock: JobLock,
        status: StatusStore,
    ) -> Self {
        Self {
            lock,
            status,
            auth,
            downloader,
            credentials,
            fetcher: FavoritesFetcher::new(),
            settings,
        }
    }

    pub fn lock(&self) -> &JobLock {
        &self.lock
    }

    pub fn status(&self) -> &StatusStore {
        &self.status
    }

    /// Run once in the current task.
    ///
    /// Returns [`RunOutcome::Skipped`] without touching the status if a run
    /// is already active.
    pub async fn run_once(&self) -> RunOutcome {
        let Some(guard) = self.lock.try_acquire() else {
            tracing::info!("A job is already running. Skipping this execution");
            return RunOutcome::Skipped;
        };
        self.run_locked(guard).await
    }

    /// Acquire the lock and start a run on a new task.
    ///
    /// The lock is taken before returning, so a `None` here is a reliable
    /// busy signal and two callers can never both get `Some`.
    pub fn try_start(self: &Arc<Self>) -> Option<JoinHandle<RunOutcome>> {
        let guard = self.lock.try_acquire()?;
        let controller = Arc::clone(self);
        Some(tokio::spawn(async move { controller.run_locked(guard).await }))
    }

    async fn run_locked(&self, guard: JobGuard) -> RunOutcome {
        tracing::info!("Job started");
        let started = Instant::now();

        let outcome = match AssertUnwindSafe(self.process()).catch_unwind().await {
            Ok(Ok(summary)) => {
                self.status.mark_completed();
                RunOutcome::Completed(summary)
            }
            Ok(Err(e)) => self.fail(e),
            Err(payload) => self.fail(JobError::Panicked(panic_message(payload))),
        };

        self.status.set_current_item(None);
        drop(guard);

        tracing::info!(elapsed_secs = started.elapsed().as_secs(), "Job finished");
        outcome
    }

    fn fail(&self, error: JobError) -> RunOutcome {
        tracing::error!(error = %error, "Process favorites error");
        self.status.mark_failed(error.to_string());
        RunOutcome::Failed(error)
    }

    async fn process(&self) -> Result<RunSummary, JobError> {
        self.status.set_phase(RunPhase::Initializing);
        let user = self
            .auth
            .authenticate(&self.credentials)
            .await
            .map_err(JobError::Auth)?;

        self.status.set_phase(RunPhase::FetchingFavorites);
        tracing::info!("Fetching favorite items");

        let mut favorites_count = FavoritesCount::default();
        let mut favorites = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let items = self.fetcher.fetch_all(user.as_ref(), category).await;
            favorites_count.set(category, items.len());
            favorites.push((category, items));
        }
        self.status.set_favorites_count(favorites_count);

        tracing::info!(
            tracks = favorites_count.tracks,
            albums = favorites_count.albums,
            artists = favorites_count.artists,
            "Found favorites",
        );

        let mut summary = RunSummary {
            favorites_count,
            categories: Vec::new(),
        };

        for (category, items) in favorites {
            if items.is_empty() {
                tracing::debug!(%category, "No favorites, skipping");
                continue;
            }
            self.status.set_phase(RunPhase::downloading(category));
            let result = self.download_category(&user, category, items).await;
            summary.categories.push(result);
        }

        Ok(summary)
    }

    async fn download_category(
        &self,
        user: &Arc<dyn CatalogUser>,
        category: Category,
        items: Vec<FavoriteItem>,
    ) -> CategoryResult {
        tracing::info!(%category, count = items.len(), "Processing favorites");

        let downloader = Arc::clone(&self.downloader);
        let user = Arc::clone(user);
        let status = self.status.clone();
        let work = move |item: FavoriteItem| {
            let downloader = Arc::clone(&downloader);
            let user = Arc::clone(&user);
            let status = status.clone();
            async move {
                status.set_current_item(Some(CurrentItem::from(&item)));
                downloader.download(&item, category.is_collection()).await?;
                user.remove_favorite(&item).await?;
                tracing::debug!(item_id = %item.id, %category, "Downloaded and unfavorited");
                Ok::<(), CatalogError>(())
            }
        };

        let executor = BatchExecutor::new(self.settings.batch(category).clone());
        let outcome = executor.run(items, work).await;

        self.status
            .record_batch(category, outcome.succeeded.len(), outcome.failed.len());

        if let Some(fault) = outcome
            .failed
            .iter()
            .rev()
            .find(|f| f.reason.is_worker_fault())
        {
            self.status.set_last_error(format!(
                "{} {}: {}",
                category.singular(),
                fault.item.id,
                fault.reason
            ));
        }

        tracing::info!(
            %category,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Category finished",
        );

        CategoryResult {
            category,
            succeeded: outcome.succeeded.len(),
            failed: outcome.failed.len(),
            chunks: outcome.chunks,
        }
    }
}
