//! Live PostgreSQL tests

use std::sync::Arc;

use pg_status::driver::{PostgresExecutor, QueryExecutor};
use pg_status::health::{HostRegistry, Monitor, Observation, ReplicationProber, REPLICATION_STATUS_QUERY};
use pg_status::{HostSelector, Route, SyncPolicy};

use crate::{live_params, skip_if_not_enabled};

#[tokio::test]
async fn test_status_query_decodes() {
    skip_if_not_enabled!();

    let params = live_params();
    let registry = HostRegistry::from_params(&params).unwrap();
    let host = registry.head().unwrap();

    let row = PostgresExecutor::new()
        .query_row(host.descriptor(), REPLICATION_STATUS_QUERY)
        .await
        .unwrap();
    assert_eq!(row.len(), 5);

    match Observation::from_row(&row).unwrap() {
        Observation::Primary { lsn } => assert!(lsn.is_some()),
        Observation::Standby { delay_ms, .. } => assert!(delay_ms.is_some()),
    }
}

#[tokio::test]
async fn test_cycle_finds_primary() {
    skip_if_not_enabled!();

    let params = live_params();
    let registry = Arc::new(HostRegistry::from_params(&params).unwrap());
    let prober = ReplicationProber::from_params(PostgresExecutor::new(), &params);
    let mut monitor = Monitor::new(registry.clone(), prober, params.probe_interval());

    let report = monitor.run_cycle().await;
    assert_eq!(report.failed, 0);

    let selector = HostSelector::new(registry.clone(), SyncPolicy::from_params(&params));
    assert!(selector.select(Route::Master).is_some());
    assert_eq!(registry.stats().masters, 1);
}
