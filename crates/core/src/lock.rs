//! Single-run exclusion gate.
//!
//! [`JobLock`] is a cloneable handle to one shared flag. A run holds the
//! lock through a [`JobGuard`]; dropping the guard clears the flag, so every
//! exit path (normal return, early `?`, panic unwind) releases it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared `running` / `idle` flag.
#[derive(Debug, Clone, Default)]
pub struct JobLock {
    running: Arc<AtomicBool>,
}

impl JobLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock if it is idle.
    ///
    /// Returns `None` when another run already holds it.
    pub fn try_acquire(&self) -> Option<JobGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| JobGuard {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Proof of holding the [`JobLock`]. Releases it on drop.
#[derive(Debug)]
pub struct JobGuard {
    running: Arc<AtomicBool>,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
