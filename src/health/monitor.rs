//! Monitor loop
//!
//! A single background task probes every registered host in order, then
//! sleeps for the probe interval. Stopping cancels the sleep (or an
//! in-flight probe) immediately and waits for the task to exit, so nothing
//! is published after `stop` returns.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::driver::QueryExecutor;
use crate::metrics::metrics;

use super::prober::ReplicationProber;
use super::registry::HostRegistry;
use super::state::LivenessVerdict;

/// Lifecycle of the monitor task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MonitorState {
    Stopped = 0,
    Running = 1,
    StopRequested = 2,
}

impl MonitorState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => MonitorState::Running,
            2 => MonitorState::StopRequested,
            _ => MonitorState::Stopped,
        }
    }
}

/// Summary of one pass over the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub probed: usize,
    pub failed: usize,
    pub duration: Duration,
}

/// Drives the prober over the registry
pub struct Monitor<E> {
    registry: Arc<HostRegistry>,
    prober: ReplicationProber<E>,
    interval: Duration,
}

impl<E: QueryExecutor + 'static> Monitor<E> {
    pub fn new(registry: Arc<HostRegistry>, prober: ReplicationProber<E>, interval: Duration) -> Self {
        Self {
            registry,
            prober,
            interval,
        }
    }

    pub fn registry(&self) -> Arc<HostRegistry> {
        self.registry.clone()
    }

    /// Probe every host once, sequentially
    pub async fn run_cycle(&mut self) -> CycleReport {
        let start = Instant::now();
        let m = metrics();
        let mut failed = 0;

        for host in self.registry.hosts() {
            let report = self.prober.probe(host).await;

            let result = match report.verdict {
                LivenessVerdict::Alive => "success",
                _ if report.timed_out => "timeout",
                _ => "failure",
            };
            m.record_probe(result);
            if result != "success" {
                failed += 1;
            }

            let status = host.current_status();
            m.set_replication_delay(host.host(), status.delay_ms, status.delay_bytes);
        }

        let stats = self.registry.stats();
        m.set_hosts(stats.alive as i64, stats.dead as i64);

        let duration = start.elapsed();
        m.observe_cycle(duration.as_secs_f64());
        debug!(
            duration_ms = duration.as_millis() as u64,
            alive = stats.alive,
            dead = stats.dead,
            "Probe cycle completed"
        );

        CycleReport {
            probed: self.registry.len(),
            failed,
            duration,
        }
    }

    /// Spawn the monitor task
    pub fn start(self) -> MonitorHandle {
        let cancel = CancellationToken::new();
        let state = Arc::new(AtomicU8::new(MonitorState::Running as u8));

        info!(
            hosts = self.registry.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Monitor started"
        );

        let task = tokio::spawn(self.run(cancel.clone(), state.clone()));

        MonitorHandle {
            cancel,
            state,
            task: Some(task),
        }
    }

    async fn run(mut self, cancel: CancellationToken, state: Arc<AtomicU8>) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.run_cycle() => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        state.store(MonitorState::Stopped as u8, Ordering::Release);
        info!("Monitor stopped");
    }
}

/// Handle to a running monitor task
pub struct MonitorHandle {
    cancel: CancellationToken,
    state: Arc<AtomicU8>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Current lifecycle state; `Stopped` once the task has exited for any reason
    pub fn state(&self) -> MonitorState {
        match &self.task {
            Some(task) if task.is_finished() => MonitorState::Stopped,
            _ => MonitorState::from_u8(self.state.load(Ordering::Acquire)),
        }
    }

    /// Signal the task to stop without waiting for it
    pub fn request_stop(&self) {
        let _ = self.state.compare_exchange(
            MonitorState::Running as u8,
            MonitorState::StopRequested as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.cancel.cancel();
    }

    /// Request shutdown and wait for the task to exit
    ///
    /// Calling it again after the task has exited is a no-op.
    pub async fn stop(&mut self) {
        self.request_stop();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Monitor task ended abnormally");
            }
        }
        self.state.store(MonitorState::Stopped as u8, Ordering::Release);
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
