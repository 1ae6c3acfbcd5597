use std::time::Duration;

use serde::Deserialize;

use super::ConfigError;

/// Maximum number of monitored hosts
pub const MAX_HOSTS: usize = 10;

// ============================================================================
// Monitor Parameters
// ============================================================================

/// Monitor configuration
///
/// Loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorParameters {
    /// PostgreSQL username
    #[serde(default = "default_user")]
    pub user: String,
    /// PostgreSQL password
    #[serde(default = "default_password")]
    pub password: String,
    /// Database to connect to
    #[serde(default = "default_database")]
    pub database: String,
    /// Delimited host list (required)
    #[serde(default)]
    pub hosts: Option<String>,
    /// Delimiter for `hosts` and `port`
    #[serde(default = "default_hosts_delimiter")]
    pub hosts_delimiter: String,
    /// Single port, or one port per host using the same delimiter
    #[serde(default = "default_port")]
    pub port: String,
    /// Connect timeout (seconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Interval between probe cycles (seconds)
    #[serde(default = "default_sleep")]
    pub sleep: u64,
    /// Consecutive failures tolerated before a host is marked dead
    #[serde(default = "default_max_fails")]
    pub max_fails: u32,
    /// Maximum replay delay for a sync replica (milliseconds)
    #[serde(default = "default_sync_max_lag_ms")]
    pub sync_max_lag_ms: u64,
    /// Maximum WAL distance for a sync replica (bytes)
    #[serde(default = "default_sync_max_lag_bytes")]
    pub sync_max_lag_bytes: u64,
    /// Prometheus endpoint listen address, disabled when unset
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

fn default_user() -> String {
    "postgres".to_string()
}

fn default_password() -> String {
    "postgres".to_string()
}

fn default_database() -> String {
    "postgres".to_string()
}

fn default_hosts_delimiter() -> String {
    ",".to_string()
}

fn default_port() -> String {
    "5432".to_string()
}

fn default_connect_timeout() -> u64 {
    2
}

fn default_sleep() -> u64 {
    5
}

fn default_max_fails() -> u32 {
    3
}

fn default_sync_max_lag_ms() -> u64 {
    1000
}

fn default_sync_max_lag_bytes() -> u64 {
    1_000_000
}

impl Default for MonitorParameters {
    fn default() -> Self {
        Self {
            user: default_user(),
            password: default_password(),
            database: default_database(),
            hosts: None,
            hosts_delimiter: default_hosts_delimiter(),
            port: default_port(),
            connect_timeout: default_connect_timeout(),
            sleep: default_sleep(),
            max_fails: default_max_fails(),
            sync_max_lag_ms: default_sync_max_lag_ms(),
            sync_max_lag_bytes: default_sync_max_lag_bytes(),
            metrics_addr: None,
        }
    }
}

/// Prefix shared by all environment overrides
pub const ENV_PREFIX: &str = "pg_status__";

impl MonitorParameters {
    /// Override fields from `pg_status__*` environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Override fields from an arbitrary variable lookup
    ///
    /// Empty values are ignored, matching an unset variable.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}")).filter(|v| !v.is_empty())
        };

        if let Some(v) = get("pg_user") {
            self.user = v;
        }
        if let Some(v) = get("pg_password") {
            self.password = v;
        }
        if let Some(v) = get("pg_database") {
            self.database = v;
        }
        if let Some(v) = get("hosts") {
            self.hosts = Some(v);
        }
        if let Some(v) = get("delimiter") {
            self.hosts_delimiter = v;
        }
        if let Some(v) = get("port") {
            self.port = v;
        }
        if let Some(v) = get("connect_timeout") {
            self.connect_timeout = parse_number("connect_timeout", &v)?;
        }
        if let Some(v) = get("sleep") {
            self.sleep = parse_number("sleep", &v)?;
        }
        if let Some(v) = get("max_fails") {
            self.max_fails = parse_number("max_fails", &v)?;
        }
        if let Some(v) = get("sync_max_lag_ms") {
            self.sync_max_lag_ms = parse_number("sync_max_lag_ms", &v)?;
        }
        if let Some(v) = get("sync_max_lag_bytes") {
            self.sync_max_lag_bytes = parse_number("sync_max_lag_bytes", &v)?;
        }
        if let Some(v) = get("metrics_addr") {
            self.metrics_addr = Some(v);
        }
        Ok(())
    }

    /// Connect timeout as a Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Probe interval as a Duration
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.sleep)
    }

    /// Split the host and port lists into ordered targets
    ///
    /// Ports pair up with hosts by position. When the port list is shorter
    /// than the host list, the last port is reused for the remaining hosts.
    pub fn host_targets(&self) -> Result<Vec<HostTarget>, ConfigError> {
        let hosts = self.hosts.as_deref().ok_or(ConfigError::MissingHosts)?;
        let delimiter = self.hosts_delimiter.as_str();
        if delimiter.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "hosts_delimiter",
                value: String::new(),
            });
        }

        let mut ports = self
            .port
            .split(delimiter)
            .map(str::trim)
            .filter(|p| !p.is_empty());
        let mut last_port: Option<u16> = None;

        let mut targets = Vec::new();
        for host in hosts.split(delimiter).map(str::trim).filter(|h| !h.is_empty()) {
            if targets.len() == MAX_HOSTS {
                return Err(ConfigError::TooManyHosts { max: MAX_HOSTS });
            }

            if let Some(raw) = ports.next() {
                let port = raw
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort(raw.to_string()))?;
                last_port = Some(port);
            }
            let port = last_port.ok_or_else(|| ConfigError::InvalidPort(self.port.clone()))?;

            targets.push(HostTarget {
                host: host.to_string(),
                port,
            });
        }

        if targets.is_empty() {
            return Err(ConfigError::MissingHosts);
        }
        Ok(targets)
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

/// One (host, port) pair from the configured host list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    pub host: String,
    pub port: u16,
}
