//! Host status snapshots and the liveness threshold
//!
//! A `MonitorStatus` is one complete observation of a host. Snapshots are
//! never edited after publication; every probe produces a fresh value.
//! `Liveness` counts consecutive probe failures so that a single network
//! blip does not flip a host to dead.

use std::sync::atomic::{AtomicU32, Ordering};

/// One point-in-time observation of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStatus {
    /// Host reported itself as primary (not in recovery)
    pub is_master: bool,
    /// Host answered recently enough to be considered alive
    pub alive: bool,
    /// Milliseconds since the last replayed transaction, `None` if unknown
    pub delay_ms: Option<u64>,
    /// WAL bytes between the primary position and the replay position,
    /// `None` if unknown
    pub delay_bytes: Option<u64>,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        Self {
            is_master: false,
            alive: false,
            delay_ms: Some(0),
            delay_bytes: Some(0),
        }
    }
}

impl MonitorStatus {
    /// Snapshot of a reachable primary
    pub fn primary() -> Self {
        Self {
            is_master: true,
            alive: true,
            delay_ms: Some(0),
            delay_bytes: Some(0),
        }
    }

    /// Snapshot of a reachable standby
    pub fn standby(delay_ms: Option<u64>, delay_bytes: Option<u64>) -> Self {
        Self {
            is_master: false,
            alive: true,
            delay_ms,
            delay_bytes,
        }
    }

    /// Dead version of this snapshot
    ///
    /// Lag fields are carried forward from the last published value.
    pub fn dead(&self) -> Self {
        Self {
            is_master: false,
            alive: false,
            ..*self
        }
    }
}

/// Outcome of recording a probe result against the failure counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessVerdict {
    /// Probe succeeded, counter reset
    Alive,
    /// Probe failed but the threshold has not been exceeded yet
    Tolerated { failures: u32 },
    /// Probe failed and consecutive failures exceed `max_fails`
    Dead { failures: u32 },
}

/// Outcome of recording a failed probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureVerdict {
    /// The threshold has not been exceeded yet
    Tolerated { failures: u32 },
    /// Consecutive failures exceed `max_fails`
    Dead { failures: u32 },
}

impl From<FailureVerdict> for LivenessVerdict {
    fn from(verdict: FailureVerdict) -> Self {
        match verdict {
            FailureVerdict::Tolerated { failures } => LivenessVerdict::Tolerated { failures },
            FailureVerdict::Dead { failures } => LivenessVerdict::Dead { failures },
        }
    }
}

/// Consecutive failure counter for one host
///
/// Written and read only by the monitor task. Atomic so the owning
/// registry can be shared with readers.
#[derive(Debug, Default)]
pub struct Liveness {
    failed_connections: AtomicU32,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of consecutive failures
    pub fn failed_connections(&self) -> u32 {
        self.failed_connections.load(Ordering::Relaxed)
    }

    /// Record a successful probe
    pub fn record_success(&self) -> LivenessVerdict {
        self.failed_connections.store(0, Ordering::Relaxed);
        LivenessVerdict::Alive
    }

    /// Record a failed probe
    pub fn record_failure(&self, max_fails: u32) -> FailureVerdict {
        let failures = self
            .failed_connections
            .load(Ordering::Relaxed)
            .saturating_add(1);
        self.failed_connections.store(failures, Ordering::Relaxed);

        if failures > max_fails {
            FailureVerdict::Dead { failures }
        } else {
            FailureVerdict::Tolerated { failures }
        }
    }
}
