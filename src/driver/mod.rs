//! Database driver seam
//!
//! The monitor only needs one capability from a driver: connect to a host,
//! run a query, and hand back the first row as text columns.

mod postgres;

pub use postgres::PostgresExecutor;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{HostTarget, MonitorParameters};

/// Pre-built connection settings for one host
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub connect_timeout: Duration,
}

impl ConnectionDescriptor {
    pub fn new(target: &HostTarget, params: &MonitorParameters) -> Self {
        Self {
            host: target.host.clone(),
            port: target.port,
            user: params.user.clone(),
            password: params.password.clone(),
            database: params.database.clone(),
            connect_timeout: params.connect_timeout(),
        }
    }

    /// "host:port"
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Keeps the password out of logs
impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

/// One result row, columns as text (`None` for SQL NULL)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRow {
    columns: Vec<Option<String>>,
}

impl TextRow {
    pub fn new(columns: Vec<Option<String>>) -> Self {
        Self { columns }
    }

    /// Column value by index, `None` for NULL or out of range
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.columns.get(idx).and_then(|c| c.as_deref())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<S: Into<String>> FromIterator<Option<S>> for TextRow {
    fn from_iter<I: IntoIterator<Item = Option<S>>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|c| c.map(Into::into)).collect())
    }
}

/// Error from the driver
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Query returned no rows")]
    NoRows,
}

/// Executes a single query against a host
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Connect using `descriptor`, run `sql`, return its first row
    async fn query_row(
        &self,
        descriptor: &ConnectionDescriptor,
        sql: &str,
    ) -> Result<TextRow, DriverError>;
}
