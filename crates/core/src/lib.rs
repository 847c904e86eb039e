//! Domain types and shared state for the favsync orchestration engine.
//!
//! - [`types`]: categories, favorite items, credentials.
//! - [`catalog`]: async traits for the remote catalog and downloader.
//! - [`error`]: collaborator error type.
//! - [`lock`]: the single-run exclusion gate.
//! - [`status`]: the observable run status shared with the dashboard.

pub mod catalog;
pub mod error;
pub mod lock;
pub mod status;
pub mod types;

pub use catalog::{CatalogAuth, CatalogUser, Downloader};
pub use error::CatalogError;
pub use lock::{JobGuard, JobLock};
pub use status::{CurrentItem, FavoritesCount, RunPhase, RunStats, RunStatus, StatusStore};
pub use types::{Category, Credentials, FavoriteItem, Timestamp};
