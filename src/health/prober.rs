//! Replication prober
//!
//! Runs one diagnostic query per host and turns the answer into a new
//! `MonitorStatus`:
//! 1. Primary (`pg_is_in_recovery() = f`): no lag, remember its WAL position
//! 2. Standby: replay delay from the query, byte lag from LSN arithmetic
//!    against the last primary position seen in any cycle
//!
//! Failures feed the liveness counter and never escape this module.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::MonitorParameters;
use crate::driver::{DriverError, QueryExecutor, TextRow};

use super::lsn::Lsn;
use super::registry::HostEntry;
use super::state::{FailureVerdict, LivenessVerdict, MonitorStatus};

/// Diagnostic query, one row with five columns:
/// is_replica, primary_lsn, received_lsn, replayed_lsn, replay_delay_ms
pub const REPLICATION_STATUS_QUERY: &str = "\
SELECT pg_is_in_recovery() AS is_replica, \
CASE WHEN pg_is_in_recovery() THEN NULL ELSE pg_current_wal_lsn() END AS primary_lsn, \
pg_last_wal_receive_lsn() AS received_lsn, \
pg_last_wal_replay_lsn() AS replayed_lsn, \
CASE WHEN pg_is_in_recovery() THEN \
COALESCE(GREATEST(0, EXTRACT(EPOCH FROM (now() - pg_last_xact_replay_timestamp())) * 1000), 0)::bigint \
ELSE 0 END AS replay_delay_ms";

const COL_IS_REPLICA: usize = 0;
const COL_PRIMARY_LSN: usize = 1;
const COL_RECEIVED_LSN: usize = 2;
const COL_REPLAYED_LSN: usize = 3;
const COL_REPLAY_DELAY_MS: usize = 4;

/// Error during a probe
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("Malformed status row: {0}")]
    MalformedRow(String),
}

/// What a successful probe learned about a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Primary {
        /// Current WAL write position, `None` if unreadable
        lsn: Option<Lsn>,
    },
    Standby {
        received_lsn: Option<Lsn>,
        replayed_lsn: Option<Lsn>,
        delay_ms: Option<u64>,
    },
}

impl Observation {
    /// Decode the diagnostic query row
    pub fn from_row(row: &TextRow) -> Result<Self, ProbeError> {
        let is_replica = match row.get(COL_IS_REPLICA) {
            Some("t") | Some("true") => true,
            Some("f") | Some("false") => false,
            other => {
                return Err(ProbeError::MalformedRow(format!(
                    "unexpected is_replica value {:?}",
                    other
                )))
            }
        };

        if !is_replica {
            return Ok(Observation::Primary {
                lsn: lsn_column(row, COL_PRIMARY_LSN),
            });
        }

        let delay_ms = row.get(COL_REPLAY_DELAY_MS).and_then(|v| match v.trim().parse::<u64>() {
            Ok(ms) => Some(ms),
            Err(_) => {
                warn!(value = %v, "Unparsable replay delay, lag unknown");
                None
            }
        });

        Ok(Observation::Standby {
            received_lsn: lsn_column(row, COL_RECEIVED_LSN),
            replayed_lsn: lsn_column(row, COL_REPLAYED_LSN),
            delay_ms,
        })
    }
}

/// LSN column; NULL and unparsable text both come back as `None`
fn lsn_column(row: &TextRow, idx: usize) -> Option<Lsn> {
    let text = row.get(idx)?;
    match text.parse::<Lsn>() {
        Ok(lsn) => Some(lsn),
        Err(e) => {
            warn!(column = idx, error = %e, "Unparsable LSN");
            None
        }
    }
}

/// Result of probing one host, for logging and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub verdict: LivenessVerdict,
    /// Snapshot published by this probe, `None` if the previous one stands
    pub published: Option<MonitorStatus>,
    /// The failure was a timeout
    pub timed_out: bool,
}

/// Probes hosts and publishes their status
///
/// Owned by the monitor task. Holds the last primary WAL position across
/// cycles so standbys can be measured even when the primary was not
/// reachable in the same cycle.
pub struct ReplicationProber<E> {
    executor: E,
    max_fails: u32,
    probe_timeout: Duration,
    last_primary_lsn: Lsn,
}

impl<E: QueryExecutor> ReplicationProber<E> {
    pub fn new(executor: E, max_fails: u32, probe_timeout: Duration) -> Self {
        Self {
            executor,
            max_fails,
            probe_timeout,
            last_primary_lsn: Lsn::ZERO,
        }
    }

    pub fn from_params(executor: E, params: &MonitorParameters) -> Self {
        Self::new(executor, params.max_fails, params.connect_timeout())
    }

    /// Last WAL position reported by any primary
    pub fn last_primary_lsn(&self) -> Lsn {
        self.last_primary_lsn
    }

    /// Query a host and decode its status row
    pub async fn observe(&self, host: &HostEntry) -> Result<Observation, ProbeError> {
        let row = tokio::time::timeout(
            self.probe_timeout,
            self.executor
                .query_row(host.descriptor(), REPLICATION_STATUS_QUERY),
        )
        .await
        .map_err(|_| ProbeError::Timeout(self.probe_timeout))??;

        Observation::from_row(&row)
    }

    /// Probe a host and publish the result
    pub async fn probe(&mut self, host: &HostEntry) -> ProbeReport {
        let result = self.observe(host).await;
        self.apply(host, result)
    }

    /// Run the liveness state machine and publish
    pub fn apply(
        &mut self,
        host: &HostEntry,
        result: Result<Observation, ProbeError>,
    ) -> ProbeReport {
        let previous = host.current_status();

        match result {
            Ok(observation) => {
                let verdict = host.liveness().record_success();
                let status = self.status_for(observation);
                host.publish(status);

                if !previous.alive {
                    info!(addr = %host.addr(), is_master = status.is_master, "Host is alive");
                } else if status.is_master != previous.is_master {
                    info!(addr = %host.addr(), is_master = status.is_master, "Host role changed");
                }
                debug!(
                    addr = %host.addr(),
                    is_master = status.is_master,
                    delay_ms = ?status.delay_ms,
                    delay_bytes = ?status.delay_bytes,
                    "Probe succeeded"
                );

                ProbeReport {
                    verdict,
                    published: Some(status),
                    timed_out: false,
                }
            }
            Err(e) => {
                let timed_out = matches!(e, ProbeError::Timeout(_));
                let verdict = host.liveness().record_failure(self.max_fails);

                let published = match verdict {
                    FailureVerdict::Dead { failures } => {
                        let status = previous.dead();
                        host.publish(status);
                        if previous.alive {
                            warn!(addr = %host.addr(), failures, error = %e, "Host is dead");
                        } else {
                            debug!(addr = %host.addr(), failures, error = %e, "Host still dead");
                        }
                        Some(status)
                    }
                    FailureVerdict::Tolerated { failures } => {
                        debug!(
                            addr = %host.addr(),
                            failures,
                            max_fails = self.max_fails,
                            error = %e,
                            "Probe failed"
                        );
                        None
                    }
                };

                ProbeReport {
                    verdict: verdict.into(),
                    published,
                    timed_out,
                }
            }
        }
    }

    /// Build the snapshot for a successful observation
    fn status_for(&mut self, observation: Observation) -> MonitorStatus {
        match observation {
            Observation::Primary { lsn } => {
                if let Some(lsn) = lsn {
                    self.last_primary_lsn = lsn;
                }
                MonitorStatus::primary()
            }
            Observation::Standby {
                received_lsn,
                replayed_lsn,
                delay_ms,
            } => {
                // The standby may have received WAL past the last primary
                // position we saw; measure from whichever is further.
                let delay_bytes = replayed_lsn.map(|replayed| {
                    let head = self.last_primary_lsn.max(received_lsn.unwrap_or(Lsn::ZERO));
                    head.distance_from(replayed)
                });
                MonitorStatus::standby(delay_ms, delay_bytes)
            }
        }
    }
}
