//! Monitor + selector scenarios against the in-memory cluster

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use pg_status::health::{HostRegistry, Monitor, ReplicationProber};
use pg_status::router::{is_alive_replica, is_master};
use pg_status::{HostSelector, Route, SyncPolicy};

use crate::{fake_params, FakeCluster, Node};

fn build(
    hosts: &str,
    max_fails: u32,
    cluster: &FakeCluster,
) -> (Monitor<FakeCluster>, HostSelector) {
    let params = fake_params(hosts, max_fails);
    let registry = Arc::new(HostRegistry::from_params(&params).unwrap());
    let prober = ReplicationProber::from_params(cluster.clone(), &params);
    let monitor = Monitor::new(registry.clone(), prober, params.probe_interval());
    let selector = HostSelector::new(registry, SyncPolicy::from_params(&params));
    (monitor, selector)
}

#[tokio::test]
async fn test_primary_sync_standby_and_dead_host() {
    let cluster = FakeCluster::new();
    cluster.set("a", Node::Primary { lsn: "10/0" });
    cluster.set(
        "b",
        Node::Standby {
            received: "10/0",
            replayed: "10/0",
            delay_ms: 0,
        },
    );
    cluster.set(
        "c",
        Node::Standby {
            received: "10/0",
            replayed: "F/FFFFFF00",
            delay_ms: 5,
        },
    );

    let max_fails = 2;
    let (mut monitor, selector) = build("a,b,c", max_fails, &cluster);
    monitor.run_cycle().await;

    let registry = selector.registry();
    let b = registry.get(1).unwrap().current_status();
    assert!(b.alive);
    assert_eq!(b.delay_bytes, Some(0));
    assert_eq!(b.delay_ms, Some(0));
    let policy = selector.policy();
    assert!(policy.is_sync_by_time(&b));
    assert!(policy.is_sync_by_bytes(&b));

    assert_eq!(registry.get(2).unwrap().current_status().delay_bytes, Some(0x100));
    assert!(registry.get(2).unwrap().current_status().alive);

    // C goes down; tolerated for max_fails cycles
    cluster.set("c", Node::Down);
    for _ in 0..max_fails {
        monitor.run_cycle().await;
        assert!(registry.get(2).unwrap().current_status().alive);
    }

    monitor.run_cycle().await;
    assert!(!registry.get(2).unwrap().current_status().alive);

    for _ in 0..10 {
        assert_eq!(selector.find_host(is_alive_replica, false), Some("b"));
        assert_eq!(selector.round_robin_replica(), Some("b"));
    }
    assert_eq!(selector.find_host(is_master, false), Some("a"));
    assert_eq!(selector.alive_replicas(), vec!["b"]);
}

#[tokio::test]
async fn test_recovery_after_outage() {
    let cluster = FakeCluster::new();
    cluster.set("a", Node::Down);

    let (mut monitor, selector) = build("a", 0, &cluster);
    monitor.run_cycle().await;
    monitor.run_cycle().await;
    let host = selector.registry().head().unwrap();
    assert!(!host.current_status().alive);
    assert_eq!(host.failed_connections(), 2);

    cluster.set("a", Node::Primary { lsn: "1/0" });
    monitor.run_cycle().await;
    assert!(host.current_status().alive);
    assert_eq!(host.failed_connections(), 0);
    assert_eq!(selector.select(Route::Master), Some("a"));
}

#[tokio::test]
async fn test_round_robin_visits_each_replica_once() {
    let cluster = FakeCluster::new();
    cluster.set("p", Node::Primary { lsn: "1/0" });
    for host in ["r1", "r2", "r3"] {
        cluster.set(
            host,
            Node::Standby {
                received: "1/0",
                replayed: "1/0",
                delay_ms: 0,
            },
        );
    }

    let (mut monitor, selector) = build("r1,p,r2,r3", 3, &cluster);
    monitor.run_cycle().await;

    let first: Vec<_> = (0..3).map(|_| selector.round_robin_replica().unwrap()).collect();
    let unique: HashSet<_> = first.iter().collect();
    assert_eq!(unique.len(), 3);
    assert!(!first.contains(&"p"));

    // The fourth call starts the rotation again
    assert_eq!(selector.round_robin_replica(), Some(first[0]));
}

#[tokio::test]
async fn test_no_replicas_falls_back_to_primary() {
    let cluster = FakeCluster::new();
    cluster.set("b", Node::Primary { lsn: "1/0" });

    let (mut monitor, selector) = build("a,b,c", 0, &cluster);
    monitor.run_cycle().await;

    assert_eq!(
        selector.round_robin_replica(),
        selector.find_host(is_master, false)
    );
    assert_eq!(selector.select(Route::Replica), Some("b"));
    assert_eq!(selector.select(Route::SyncByTimeOrBytes), Some("b"));
}

#[tokio::test]
async fn test_lagging_replica_excluded_from_sync_routes() {
    let cluster = FakeCluster::new();
    cluster.set("a", Node::Primary { lsn: "1/10000" });
    cluster.set(
        "b",
        Node::Standby {
            received: "1/10000",
            replayed: "1/0",
            delay_ms: 60_000,
        },
    );
    cluster.set(
        "c",
        Node::Standby {
            received: "1/10000",
            replayed: "1/FF00",
            delay_ms: 20,
        },
    );

    let (mut monitor, selector) = build("a,b,c", 3, &cluster);
    monitor.run_cycle().await;

    assert_eq!(selector.select(Route::SyncByTime), Some("c"));
    assert_eq!(selector.select(Route::SyncByBytes), Some("c"));
    assert_eq!(selector.select(Route::SyncByTimeAndBytes), Some("c"));

    // Once c falls behind too, sync routes fall back to the primary
    cluster.set(
        "c",
        Node::Standby {
            received: "1/10000",
            replayed: "1/0",
            delay_ms: 60_000,
        },
    );
    monitor.run_cycle().await;
    assert_eq!(selector.select(Route::SyncByTime), Some("a"));
    assert_eq!(selector.select(Route::Master), Some("a"));
}

#[tokio::test(start_paused = true)]
async fn test_started_monitor_publishes_and_stops() {
    let cluster = FakeCluster::new();
    cluster.set("a", Node::Primary { lsn: "1/0" });

    let (monitor, selector) = build("a,b", 0, &cluster);
    let mut handle = monitor.start();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(selector.select(Route::Master), Some("a"));

    handle.stop().await;
}
