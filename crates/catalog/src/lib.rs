//! Concrete collaborators for the job controller.
//!
//! - [`qobuz`]: HTTP client for login and favorites management.
//! - [`downloader`]: runs an external downloader program per item.
//! - [`history`]: on-disk ledger of items already downloaded.

pub mod downloader;
pub mod history;
pub mod qobuz;

pub use downloader::{CommandDownloader, DownloaderAccount};
pub use history::{DownloadHistory, HistoryDownloader, HistoryError};
pub use qobuz::{QobuzApi, QobuzSession};
