//! Integration test entry point
//!
//! Scenario tests run against an in-memory cluster and always run.
//! Live tests need PostgreSQL and are gated:
//!
//! Run with: PG_STATUS_RUN_INTEGRATION_TESTS=1 cargo test --test integration
//!
//! Environment variables:
//! - PG_STATUS_RUN_INTEGRATION_TESTS: Set to "1" to enable live tests
//! - PG_STATUS_TEST_HOSTS: Comma-separated hosts (default: 127.0.0.1)
//! - PG_STATUS_TEST_PORT: Port or comma-separated ports (default: 5432)
//! - PG_STATUS_TEST_USER: User (default: postgres)
//! - PG_STATUS_TEST_PASS: Password (default: postgres)

mod live;
mod scenario;

use std::collections::HashMap;
use std::env;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pg_status::driver::{ConnectionDescriptor, DriverError, QueryExecutor, TextRow};
use pg_status::MonitorParameters;

/// Check if live integration tests should run
pub fn should_run_integration_tests() -> bool {
    env::var("PG_STATUS_RUN_INTEGRATION_TESTS")
        .map(|v| v == "1")
        .unwrap_or(false)
}

/// Skip test if integration tests are not enabled
#[macro_export]
macro_rules! skip_if_not_enabled {
    () => {
        if !crate::should_run_integration_tests() {
            eprintln!("Skipping integration test (set PG_STATUS_RUN_INTEGRATION_TESTS=1 to run)");
            return;
        }
    };
}

/// Monitor parameters for the live cluster, from environment
pub fn live_params() -> MonitorParameters {
    MonitorParameters {
        hosts: Some(env::var("PG_STATUS_TEST_HOSTS").unwrap_or_else(|_| "127.0.0.1".to_string())),
        port: env::var("PG_STATUS_TEST_PORT").unwrap_or_else(|_| "5432".to_string()),
        user: env::var("PG_STATUS_TEST_USER").unwrap_or_else(|_| "postgres".to_string()),
        password: env::var("PG_STATUS_TEST_PASS").unwrap_or_else(|_| "postgres".to_string()),
        ..Default::default()
    }
}

/// Monitor parameters for an in-memory cluster
pub fn fake_params(hosts: &str, max_fails: u32) -> MonitorParameters {
    MonitorParameters {
        hosts: Some(hosts.to_string()),
        max_fails,
        sync_max_lag_ms: 1000,
        sync_max_lag_bytes: 1024,
        ..Default::default()
    }
}

/// Node behaviour in the in-memory cluster
#[derive(Debug, Clone)]
pub enum Node {
    Primary { lsn: &'static str },
    Standby {
        received: &'static str,
        replayed: &'static str,
        delay_ms: u64,
    },
    Down,
}

impl Node {
    fn row(&self) -> Option<TextRow> {
        match self {
            Node::Primary { lsn } => Some(
                vec![Some("f".to_string()), Some(lsn.to_string()), None, None, Some("0".to_string())]
                    .into_iter()
                    .collect(),
            ),
            Node::Standby {
                received,
                replayed,
                delay_ms,
            } => Some(
                vec![
                    Some("t".to_string()),
                    None,
                    Some(received.to_string()),
                    Some(replayed.to_string()),
                    Some(delay_ms.to_string()),
                ]
                .into_iter()
                .collect(),
            ),
            Node::Down => None,
        }
    }
}

/// In-memory cluster answering the diagnostic query per host
#[derive(Debug, Clone, Default)]
pub struct FakeCluster {
    nodes: Arc<Mutex<HashMap<String, Node>>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, host: &str, node: Node) {
        self.nodes.lock().unwrap().insert(host.to_string(), node);
    }
}

#[async_trait]
impl QueryExecutor for FakeCluster {
    async fn query_row(
        &self,
        descriptor: &ConnectionDescriptor,
        _sql: &str,
    ) -> Result<TextRow, DriverError> {
        let node = self.nodes.lock().unwrap().get(&descriptor.host).cloned();
        node.and_then(|n| n.row())
            .ok_or_else(|| DriverError::Connect(format!("{} is down", descriptor.host)))
    }
}
