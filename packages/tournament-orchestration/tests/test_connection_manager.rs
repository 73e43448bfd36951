//! Integration tests for the connection lifecycle
//!
//! - Handle caching and health-checked reuse
//! - Wide-column schema bootstrap on every fresh open
//! - Failed and timed-out opens are not cached
//! - Shutdown keeps closing after a failure

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use tournament_orchestration::{
    ConnectionManager, FailureKind, InMemoryConnector, ReplicaOrchestrator,
};
use tournament_storage::{journalist_session_key, StoreKind, SESSION_LEASE};

fn manager(connect_timeout: Duration) -> (Arc<InMemoryConnector>, ConnectionManager) {
    let connector = Arc::new(InMemoryConnector::new());
    let manager = ConnectionManager::new(connector.clone(), connect_timeout);
    (connector, manager)
}

#[tokio::test]
async fn test_handles_are_cached() {
    let (connector, mut mgr) = manager(Duration::from_secs(1));

    mgr.relational().await.expect("first open");
    mgr.relational().await.expect("cached");
    mgr.get_or_connect(StoreKind::Relational).await.expect("cached");

    assert_eq!(connector.open_count(StoreKind::Relational), 1);
    assert!(mgr.is_open(StoreKind::Relational));
    assert!(!mgr.is_open(StoreKind::Graph));
}

#[tokio::test]
async fn test_wide_column_bootstrap_on_fresh_open() {
    let (connector, mut mgr) = manager(Duration::from_secs(1));

    mgr.wide_column().await.expect("open wide column");
    mgr.wide_column().await.expect("cached");
    assert_eq!(connector.wide_column.schema_bootstraps(), 1);

    // A reconnect bootstraps again
    connector.wide_column.faults().set_unhealthy(true);
    let err = mgr
        .wide_column()
        .await
        .err()
        .expect("unhealthy wide column must not be handed out");
    assert_eq!(err.kind(), FailureKind::ConnectionFailure);
    assert!(!mgr.is_open(StoreKind::WideColumn));

    connector.wide_column.faults().set_unhealthy(false);
    mgr.wide_column().await.expect("reopen wide column");
    assert_eq!(connector.wide_column.schema_bootstraps(), 2);
    assert_eq!(connector.open_count(StoreKind::WideColumn), 3);
}

#[tokio::test]
async fn test_failed_open_is_not_cached() {
    let (connector, mut mgr) = manager(Duration::from_secs(1));
    connector.fail_connect(StoreKind::Graph, true);

    let err = mgr.graph().await.err().expect("refused open must fail");
    assert_eq!(err.kind(), FailureKind::ConnectionFailure);
    assert!(err.to_string().contains("graph"));
    assert!(!mgr.is_open(StoreKind::Graph));

    connector.fail_connect(StoreKind::Graph, false);
    mgr.graph().await.expect("graph reachable again");
    assert_eq!(connector.open_count(StoreKind::Graph), 1);
}

#[tokio::test]
async fn test_unhealthy_cached_handle_is_replaced() {
    let (connector, mut mgr) = manager(Duration::from_secs(1));

    let first = mgr.documents().await.expect("open documents");
    connector.documents.faults().set_unhealthy(true);
    assert!(mgr.documents().await.is_err());

    connector.documents.faults().set_unhealthy(false);
    let second = mgr.documents().await.expect("reconnect documents");

    assert_eq!(connector.open_count(StoreKind::Document), 3);
    // The stale handle was closed on the way out
    assert!(first.ping().await.is_err());
    assert!(second.ping().await.is_ok());
}

#[tokio::test]
async fn test_open_is_bounded_by_connect_timeout() {
    let (connector, mut mgr) = manager(Duration::from_millis(50));
    connector.set_open_delay(Some(Duration::from_millis(500)));

    let err = mgr.sessions().await.err().expect("slow open must time out");
    assert_eq!(err.kind(), FailureKind::ConnectionFailure);
    assert!(err.to_string().contains("timed out"));
    assert!(!mgr.is_open(StoreKind::Session));

    connector.set_open_delay(None);
    mgr.sessions().await.expect("open without delay");
}

#[tokio::test]
async fn test_shutdown_closes_everything_despite_failure() {
    let (connector, mut mgr) = manager(Duration::from_secs(1));
    let relational = mgr.relational().await.unwrap();
    let documents = mgr.documents().await.unwrap();
    let graph = mgr.graph().await.unwrap();

    connector.documents.faults().set_close_failure(true);
    let report = mgr.shutdown().await;

    assert_eq!(report.closed, vec![StoreKind::Relational, StoreKind::Graph]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, StoreKind::Document);
    assert!(!report.is_clean());

    assert!(relational.ping().await.is_err());
    assert!(graph.ping().await.is_err());
    assert!(documents.ping().await.is_ok());
    for kind in StoreKind::ALL {
        assert!(!mgr.is_open(kind));
    }
}

#[tokio::test]
async fn test_use_case_reports_connection_failure() {
    let connector = Arc::new(InMemoryConnector::new());
    connector.fail_connect(StoreKind::WideColumn, true);
    let mut orch = ReplicaOrchestrator::with_connector(connector.clone(), Duration::from_secs(1));

    let outcome = orch.group_standings("Mundial 2030", "A").await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::ConnectionFailure));

    let report = orch.shutdown().await;
    assert_eq!(report.closed, vec![StoreKind::Relational]);
}

#[tokio::test]
async fn test_journalist_session_through_manager() {
    let (_connector, mut mgr) = manager(Duration::from_secs(1));
    let sessions = mgr.sessions().await.expect("open sessions");
    let key = journalist_session_key("  Ana   Pérez ");

    sessions
        .put(&key, &json!({"name": "Ana Pérez", "outlet": "El Observador"}), SESSION_LEASE)
        .await
        .unwrap();

    let payload = sessions.get(&key).await.unwrap().expect("session stored");
    assert_eq!(payload["outlet"], "El Observador");
    assert!(sessions.renew(&key, SESSION_LEASE).await.unwrap());

    let ttl = sessions.remaining_ttl(&key).await.unwrap().expect("ttl set");
    assert!(ttl <= SESSION_LEASE);
    assert!(ttl > SESSION_LEASE - Duration::from_secs(5));
}
