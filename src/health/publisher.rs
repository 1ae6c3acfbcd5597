//! Lock-free snapshot publication
//!
//! One writer (the monitor task) replaces the current snapshot with a fully
//! built new one; any number of readers load it without blocking. The swap
//! is a single atomic pointer store with release ordering and loads use
//! acquire ordering, so a reader that sees the new snapshot sees all of it.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::state::MonitorStatus;

/// Atomically replaceable `MonitorStatus`
#[derive(Debug)]
pub struct StatusCell {
    current: ArcSwap<MonitorStatus>,
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new(MonitorStatus::default())
    }
}

impl StatusCell {
    pub fn new(initial: MonitorStatus) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Publish a new snapshot
    pub fn publish(&self, status: MonitorStatus) {
        self.current.store(Arc::new(status));
    }

    /// Current snapshot
    pub fn load(&self) -> Arc<MonitorStatus> {
        self.current.load_full()
    }

    /// Copy of the current snapshot
    pub fn get(&self) -> MonitorStatus {
        **self.current.load()
    }
}
