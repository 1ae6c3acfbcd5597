//! Replication health monitoring
//!
//! This module provides:
//! - A fixed registry of monitored PostgreSQL hosts
//! - Per-host probing of role and replication lag
//! - Failure-threshold liveness to avoid flapping on transient errors
//! - Lock-free publication of per-host status snapshots
//! - The background monitor loop with graceful shutdown

pub mod lsn;
mod monitor;
mod prober;
mod publisher;
mod registry;
mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use lsn::{parse_lsn, Lsn, LsnError};
pub use monitor::{CycleReport, Monitor, MonitorHandle, MonitorState};
pub use prober::{
    Observation, ProbeError, ProbeReport, ReplicationProber, REPLICATION_STATUS_QUERY,
};
pub use publisher::StatusCell;
pub use registry::{HostEntry, HostRegistry, RegistryStats};
pub use state::{FailureVerdict, Liveness, LivenessVerdict, MonitorStatus};
