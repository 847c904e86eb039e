use favsync_core::StatusStore;
use favsync_worker::Scheduler;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: both handles share their data behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Run status written by the job controller.
    pub status: StatusStore,
    /// Used to start manual runs and to report whether one is active.
    pub scheduler: Scheduler,
}

impl AppState {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            status: scheduler.status().clone(),
            scheduler,
        }
    }
}
