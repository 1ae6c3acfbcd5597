//! pg_status: replication-aware host discovery for PostgreSQL
//!
//! A background monitor probes a fixed set of PostgreSQL hosts, works out
//! which one is primary and how far each standby lags, and publishes a
//! snapshot per host. Routing code reads those snapshots lock-free through
//! [`router::HostSelector`] to pick a primary, a round-robin replica, or a
//! replica within a lag bound.

pub mod config;
pub mod driver;
pub mod health;
pub mod metrics;
pub mod router;

pub use config::{load_config, ConfigError, MonitorParameters};
pub use health::{HostEntry, HostRegistry, Monitor, MonitorHandle, MonitorStatus};
pub use router::{HostSelector, Route, SyncPolicy};
