//! Observable run status shared with the dashboard.
//!
//! [`StatusStore`] is a cheaply cloneable handle around the one
//! [`RunStatus`] of the process. The job controller writes it field by
//! field while a run progresses; readers take whole snapshots and may see a
//! run between two updates.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{Category, FavoriteItem, Timestamp};

// ---------------------------------------------------------------------------
// RunPhase
// ---------------------------------------------------------------------------

/// Named stage of the current (or last) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Idle,
    Initializing,
    FetchingFavorites,
    DownloadingTracks,
    DownloadingAlbums,
    DownloadingArtists,
    Error,
}

impl RunPhase {
    /// The download phase for a category.
    pub fn downloading(category: Category) -> Self {
        match category {
            Category::Tracks => RunPhase::DownloadingTracks,
            Category::Albums => RunPhase::DownloadingAlbums,
            Category::Artists => RunPhase::DownloadingArtists,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Initializing => "initializing",
            RunPhase::FetchingFavorites => "fetching_favorites",
            RunPhase::DownloadingTracks => "downloading_tracks",
            RunPhase::DownloadingAlbums => "downloading_albums",
            RunPhase::DownloadingArtists => "downloading_artists",
            RunPhase::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Number of favorites found per category in the last fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FavoritesCount {
    pub tracks: usize,
    pub albums: usize,
    pub artists: usize,
}

impl FavoritesCount {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Tracks => self.tracks,
            Category::Albums => self.albums,
            Category::Artists => self.artists,
        }
    }

    pub fn set(&mut self, category: Category, count: usize) {
        match category {
            Category::Tracks => self.tracks = count,
            Category::Albums => self.albums = count,
            Category::Artists => self.artists = count,
        }
    }
}

/// Download counters, accumulated over the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub tracks_downloaded: u64,
    pub albums_downloaded: u64,
    pub artists_downloaded: u64,
    pub tracks_failed: u64,
    pub albums_failed: u64,
    pub artists_failed: u64,
    pub last_error: Option<String>,
}

impl RunStats {
    /// Add one batch worth of results for `category`.
    pub fn record(&mut self, category: Category, succeeded: usize, failed: usize) {
        let (downloaded, failures) = match category {
            Category::Tracks => (&mut self.tracks_downloaded, &mut self.tracks_failed),
            Category::Albums => (&mut self.albums_downloaded, &mut self.albums_failed),
            Category::Artists => (&mut self.artists_downloaded, &mut self.artists_failed),
        };
        *downloaded += succeeded as u64;
        *failures += failed as u64;
    }

    pub fn downloaded(&self, category: Category) -> u64 {
        match category {
            Category::Tracks => self.tracks_downloaded,
            Category::Albums => self.albums_downloaded,
            Category::Artists => self.artists_downloaded,
        }
    }

    pub fn failed(&self, category: Category) -> u64 {
        match category {
            Category::Tracks => self.tracks_failed,
            Category::Albums => self.albums_failed,
            Category::Artists => self.artists_failed,
        }
    }
}

/// The item a worker most recently picked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentItem {
    pub id: String,
    pub category: Category,
    pub title: Option<String>,
}

impl From<&FavoriteItem> for CurrentItem {
    fn from(item: &FavoriteItem) -> Self {
        Self {
            id: item.id.clone(),
            category: item.category,
            title: item.title.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Full status record exposed to the dashboard.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunStatus {
    pub phase: RunPhase,
    pub last_run_at: Option<Timestamp>,
    pub next_run_at: Option<Timestamp>,
    pub favorites_count: FavoritesCount,
    pub stats: RunStats,
    pub current_item: Option<CurrentItem>,
}

// ---------------------------------------------------------------------------
// StatusStore
// ---------------------------------------------------------------------------

/// Shared handle to the process-wide [`RunStatus`].
///
/// The lock is only held to copy or update a field and never across an
/// `.await`. A poisoned lock is recovered rather than propagated.
#[derive(Debug, Clone, Default)]
pub struct StatusStore {
    inner: Arc<RwLock<RunStatus>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the full status.
    pub fn snapshot(&self) -> RunStatus {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Copy of the counters only.
    pub fn stats(&self) -> RunStats {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .stats
            .clone()
    }

    pub fn phase(&self) -> RunPhase {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).phase
    }

    pub fn set_phase(&self, phase: RunPhase) {
        self.update(|s| s.phase = phase);
    }

    pub fn set_favorites_count(&self, count: FavoritesCount) {
        self.update(|s| s.favorites_count = count);
    }

    pub fn record_batch(&self, category: Category, succeeded: usize, failed: usize) {
        self.update(|s| s.stats.record(category, succeeded, failed));
    }

    pub fn set_last_error(&self, error: impl Into<String>) {
        let error = error.into();
        self.update(|s| s.stats.last_error = Some(error));
    }

    pub fn set_current_item(&self, item: Option<CurrentItem>) {
        self.update(|s| s.current_item = item);
    }

    pub fn set_next_run(&self, at: Option<Timestamp>) {
        self.update(|s| s.next_run_at = at);
    }

    /// Mark the run as finished: phase back to idle, `last_run_at = now`.
    pub fn mark_completed(&self) {
        self.update(|s| {
            s.phase = RunPhase::Idle;
            s.last_run_at = Some(Utc::now());
        });
    }

    /// Mark the run as aborted with `error`.
    pub fn mark_failed(&self, error: impl Into<String>) {
        let error = error.into();
        self.update(|s| {
            s.phase = RunPhase::Error;
            s.stats.last_error = Some(error);
        });
    }

    fn update(&self, f: impl FnOnce(&mut RunStatus)) {
        let mut status = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut status);
    }
}
