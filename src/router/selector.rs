//! Host selection over published snapshots
//!
//! Two strategies:
//! - Predicate search: first host in registry order whose snapshot matches,
//!   optionally falling back to the first host flagged as primary
//! - Round-robin: rotates over alive replicas, falling back to the primary
//!   when none are alive
//!
//! Both only read published snapshots and never block.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::MonitorParameters;
use crate::health::{HostEntry, HostRegistry, MonitorStatus};
use crate::metrics::metrics;

use super::Route;

/// Alive primary
pub fn is_master(status: &MonitorStatus) -> bool {
    status.alive && status.is_master
}

/// Alive standby
pub fn is_alive_replica(status: &MonitorStatus) -> bool {
    status.alive && !status.is_master
}

/// Lag bounds for a replica to count as synchronous
///
/// Unknown lag never satisfies a bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    pub max_lag_ms: u64,
    pub max_lag_bytes: u64,
}

impl SyncPolicy {
    pub fn new(max_lag_ms: u64, max_lag_bytes: u64) -> Self {
        Self {
            max_lag_ms,
            max_lag_bytes,
        }
    }

    pub fn from_params(params: &MonitorParameters) -> Self {
        Self::new(params.sync_max_lag_ms, params.sync_max_lag_bytes)
    }

    pub fn is_sync_by_time(&self, status: &MonitorStatus) -> bool {
        is_alive_replica(status) && status.delay_ms.is_some_and(|ms| ms <= self.max_lag_ms)
    }

    pub fn is_sync_by_bytes(&self, status: &MonitorStatus) -> bool {
        is_alive_replica(status) && status.delay_bytes.is_some_and(|b| b <= self.max_lag_bytes)
    }

    pub fn is_sync_by_time_or_bytes(&self, status: &MonitorStatus) -> bool {
        self.is_sync_by_time(status) || self.is_sync_by_bytes(status)
    }

    pub fn is_sync_by_time_and_bytes(&self, status: &MonitorStatus) -> bool {
        self.is_sync_by_time(status) && self.is_sync_by_bytes(status)
    }
}

/// Result of a host lookup, noting whether the primary fallback was used
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    Matched(&'a HostEntry),
    Fallback(&'a HostEntry),
    NotFound,
}

impl<'a> Lookup<'a> {
    pub fn host(&self) -> Option<&'a HostEntry> {
        match *self {
            Lookup::Matched(h) | Lookup::Fallback(h) => Some(h),
            Lookup::NotFound => None,
        }
    }

    /// Outcome label for metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            Lookup::Matched(_) => "found",
            Lookup::Fallback(_) => "fallback",
            Lookup::NotFound => "not_found",
        }
    }
}

/// Scan hosts in registry order for the first snapshot matching `predicate`
///
/// Remembers the first host whose snapshot carries the primary flag and
/// returns it when nothing matches and `fallback_to_master` is set.
pub fn find_host<P>(registry: &HostRegistry, predicate: P, fallback_to_master: bool) -> Lookup<'_>
where
    P: Fn(&MonitorStatus) -> bool,
{
    let mut master = None;

    for host in registry.hosts() {
        let status = host.load_status();
        if master.is_none() && status.is_master {
            master = Some(host);
        }
        if predicate(&status) {
            return Lookup::Matched(host);
        }
    }

    match master {
        Some(host) if fallback_to_master => Lookup::Fallback(host),
        _ => Lookup::NotFound,
    }
}

/// Rotating replica picker
///
/// The cursor is the registry index of the last host returned. It is only a
/// fairness hint: concurrent callers may race on it without affecting
/// correctness.
#[derive(Debug)]
pub struct RoundRobinSelector {
    last: AtomicUsize,
}

impl Default for RoundRobinSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundRobinSelector {
    const NONE: usize = usize::MAX;

    pub fn new() -> Self {
        Self {
            last: AtomicUsize::new(Self::NONE),
        }
    }

    /// Next alive replica after the cursor, or the primary if there is none
    pub fn select<'a>(&self, registry: &'a HostRegistry) -> Lookup<'a> {
        let hosts = registry.hosts();
        if hosts.is_empty() {
            return Lookup::NotFound;
        }

        let last = self.last.load(Ordering::Relaxed);
        let start = if last < hosts.len() {
            (last + 1) % hosts.len()
        } else {
            0
        };

        let mut idx = start;
        loop {
            let host = &hosts[idx];
            if is_alive_replica(&host.load_status()) {
                self.last.store(idx, Ordering::Relaxed);
                return Lookup::Matched(host);
            }
            idx = (idx + 1) % hosts.len();
            if idx == start {
                break;
            }
        }

        match find_host(registry, is_master, false) {
            Lookup::Matched(host) => Lookup::Fallback(host),
            other => other,
        }
    }
}

/// Routing-facing entry point over a shared registry
pub struct HostSelector {
    registry: Arc<HostRegistry>,
    policy: SyncPolicy,
    round_robin: RoundRobinSelector,
}

impl HostSelector {
    pub fn new(registry: Arc<HostRegistry>, policy: SyncPolicy) -> Self {
        Self {
            registry,
            policy,
            round_robin: RoundRobinSelector::new(),
        }
    }

    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// First host matching `predicate`, see [`find_host`]
    pub fn find_host<P>(&self, predicate: P, fallback_to_master: bool) -> Option<&str>
    where
        P: Fn(&MonitorStatus) -> bool,
    {
        find_host(&self.registry, predicate, fallback_to_master)
            .host()
            .map(HostEntry::host)
    }

    /// Next alive replica in rotation, or the primary if none is alive
    pub fn round_robin_replica(&self) -> Option<&str> {
        self.round_robin.select(&self.registry).host().map(HostEntry::host)
    }

    /// All alive replicas in registry order
    pub fn alive_replicas(&self) -> Vec<&str> {
        self.registry
            .hosts()
            .iter()
            .filter(|h| is_alive_replica(&h.load_status()))
            .map(HostEntry::host)
            .collect()
    }

    /// Resolve a route to a host
    pub fn select(&self, route: Route) -> Option<&str> {
        self.select_with_outcome(route).host().map(HostEntry::host)
    }

    /// Resolve a route, reporting whether the primary fallback was used
    pub fn select_with_outcome(&self, route: Route) -> Lookup<'_> {
        let policy = self.policy;
        let registry = &*self.registry;

        let lookup = match route {
            Route::Master => find_host(registry, is_master, false),
            Route::Replica => self.round_robin.select(registry),
            Route::SyncByTime => find_host(registry, |s| policy.is_sync_by_time(s), true),
            Route::SyncByBytes => find_host(registry, |s| policy.is_sync_by_bytes(s), true),
            Route::SyncByTimeOrBytes => {
                find_host(registry, |s| policy.is_sync_by_time_or_bytes(s), true)
            }
            Route::SyncByTimeAndBytes => {
                find_host(registry, |s| policy.is_sync_by_time_and_bytes(s), true)
            }
        };

        metrics().record_selection(route.as_str(), lookup.outcome());
        lookup
    }
}
