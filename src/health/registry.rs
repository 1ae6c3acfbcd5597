//! Host registry
//!
//! Owns the fixed, ordered list of monitored hosts. The list is built once
//! from configuration and never changes shape afterwards, so positions are
//! stable for the lifetime of the process and can be used as cursors.

use std::sync::Arc;

use tracing::info;

use crate::config::{ConfigError, HostTarget, MonitorParameters, MAX_HOSTS};
use crate::driver::ConnectionDescriptor;

use super::publisher::StatusCell;
use super::state::{Liveness, MonitorStatus};

/// One monitored host
#[derive(Debug)]
pub struct HostEntry {
    descriptor: ConnectionDescriptor,
    liveness: Liveness,
    status: StatusCell,
}

impl HostEntry {
    pub fn new(descriptor: ConnectionDescriptor) -> Self {
        Self {
            descriptor,
            liveness: Liveness::new(),
            status: StatusCell::default(),
        }
    }

    /// Host as configured, the value handed to routing callers
    pub fn host(&self) -> &str {
        &self.descriptor.host
    }

    /// "host:port"
    pub fn addr(&self) -> String {
        self.descriptor.addr()
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    /// Copy of the currently published snapshot
    pub fn current_status(&self) -> MonitorStatus {
        self.status.get()
    }

    /// Shared handle to the currently published snapshot
    pub fn load_status(&self) -> Arc<MonitorStatus> {
        self.status.load()
    }

    /// Publish a new snapshot for this host
    ///
    /// Only the monitor task publishes in production; readers never do.
    pub fn publish(&self, status: MonitorStatus) {
        self.status.publish(status);
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    pub fn failed_connections(&self) -> u32 {
        self.liveness.failed_connections()
    }
}

/// Fixed, ordered set of monitored hosts
#[derive(Debug)]
pub struct HostRegistry {
    hosts: Vec<HostEntry>,
}

impl HostRegistry {
    /// Build the registry from configuration
    pub fn from_params(params: &MonitorParameters) -> Result<Self, ConfigError> {
        let targets = params.host_targets()?;
        Self::new(&targets, params)
    }

    /// Build one entry per target, in order
    pub fn new(targets: &[HostTarget], params: &MonitorParameters) -> Result<Self, ConfigError> {
        if targets.len() > MAX_HOSTS {
            return Err(ConfigError::TooManyHosts { max: MAX_HOSTS });
        }
        if targets.is_empty() {
            return Err(ConfigError::MissingHosts);
        }

        let hosts: Vec<HostEntry> = targets
            .iter()
            .map(|t| HostEntry::new(ConnectionDescriptor::new(t, params)))
            .collect();

        for host in &hosts {
            info!(addr = %host.addr(), "Registered host for monitoring");
        }

        Ok(Self { hosts })
    }

    /// First host in registration order
    pub fn head(&self) -> Option<&HostEntry> {
        self.hosts.first()
    }

    /// All hosts in registration order
    pub fn hosts(&self) -> &[HostEntry] {
        &self.hosts
    }

    pub fn get(&self, idx: usize) -> Option<&HostEntry> {
        self.hosts.get(idx)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Counts taken from the currently published snapshots
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            total: self.hosts.len(),
            ..Default::default()
        };

        for host in &self.hosts {
            let status = host.load_status();
            if status.alive {
                stats.alive += 1;
                if status.is_master {
                    stats.masters += 1;
                } else {
                    stats.replicas += 1;
                }
            } else {
                stats.dead += 1;
            }
        }
        stats
    }
}

/// Statistics about the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub total: usize,
    pub alive: usize,
    pub dead: usize,
    pub masters: usize,
    pub replicas: usize,
}
