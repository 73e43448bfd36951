//! [`StoreConnector`] implementations

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tournament_storage::{
    InMemoryDocuments, InMemoryGraph, InMemoryRelational, InMemorySessions, InMemoryWideColumn,
    StorageError, StoreKind,
};

use crate::connection::{StoreConnector, StoreHandle};

#[derive(Default)]
struct ConnectorState {
    failing: HashSet<StoreKind>,
    open_delay: Option<Duration>,
    opens: HashMap<StoreKind, usize>,
}

/// Connector over in-process stores.
///
/// Every `open` hands out a fresh handle onto the same shared data, so the
/// stores behave like servers that outlive individual connections. Fixtures
/// and fault switches are reached through the public store fields.
#[derive(Default)]
pub struct InMemoryConnector {
    pub relational: InMemoryRelational,
    pub wide_column: InMemoryWideColumn,
    pub documents: InMemoryDocuments,
    pub graph: InMemoryGraph,
    pub sessions: InMemorySessions,
    state: Mutex<ConnectorState>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent open of `kind` fail (or succeed again)
    pub fn fail_connect(&self, kind: StoreKind, on: bool) {
        let mut state = self.state.lock();
        if on {
            state.failing.insert(kind);
        } else {
            state.failing.remove(&kind);
        }
    }

    /// Delays every open, used to exercise the connect timeout
    pub fn set_open_delay(&self, delay: Option<Duration>) {
        self.state.lock().open_delay = delay;
    }

    /// Successful opens of `kind` so far
    pub fn open_count(&self, kind: StoreKind) -> usize {
        self.state.lock().opens.get(&kind).copied().unwrap_or(0)
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    async fn open(&self, kind: StoreKind) -> tournament_storage::Result<StoreHandle> {
        let delay = self.state.lock().open_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.state.lock().failing.contains(&kind) {
            return Err(StorageError::connection(format!(
                "{} store refused the connection",
                kind
            )));
        }

        let handle = match kind {
            StoreKind::Relational => StoreHandle::Relational(Arc::new(self.relational.reopen())),
            StoreKind::WideColumn => StoreHandle::WideColumn(Arc::new(self.wide_column.reopen())),
            StoreKind::Document => StoreHandle::Document(Arc::new(self.documents.reopen())),
            StoreKind::Graph => StoreHandle::Graph(Arc::new(self.graph.reopen())),
            StoreKind::Session => StoreHandle::Session(Arc::new(self.sessions.reopen())),
        };
        *self.state.lock().opens.entry(kind).or_insert(0) += 1;
        Ok(handle)
    }
}

#[cfg(feature = "live")]
pub use live::LiveConnector;

#[cfg(feature = "live")]
mod live {
    use super::*;
    use tournament_storage::infrastructure::{
        CassandraStore, MongoStore, Neo4jGraph, PostgresSource, RedisSessions,
    };
    use tracing::debug;

    use crate::config::ReplicaConfig;

    /// Connector backed by the real drivers
    pub struct LiveConnector {
        config: ReplicaConfig,
    }

    impl LiveConnector {
        pub fn new(config: ReplicaConfig) -> Self {
            Self { config }
        }
    }

    fn required<'a>(value: &'a Option<String>, var: &str) -> tournament_storage::Result<&'a str> {
        value
            .as_deref()
            .ok_or_else(|| StorageError::config(format!("{} is not set", var)))
    }

    #[async_trait]
    impl StoreConnector for LiveConnector {
        async fn open(&self, kind: StoreKind) -> tournament_storage::Result<StoreHandle> {
            let timeout = self.config.connect_timeout();
            debug!("Opening {} store", kind);

            let handle = match kind {
                StoreKind::Relational => {
                    let url = required(&self.config.relational.url, "DATABASE_URL")?;
                    StoreHandle::Relational(Arc::new(PostgresSource::connect(url, timeout).await?))
                }
                StoreKind::WideColumn => {
                    let cfg = &self.config.wide_column;
                    let store =
                        CassandraStore::connect(&cfg.host, cfg.port, &cfg.keyspace, timeout)
                            .await?;
                    StoreHandle::WideColumn(Arc::new(store))
                }
                StoreKind::Document => {
                    let cfg = &self.config.documents;
                    let uri = required(&cfg.uri, "MONGODB_URI")?;
                    let store = MongoStore::connect(uri, &cfg.database, timeout).await?;
                    StoreHandle::Document(Arc::new(store))
                }
                StoreKind::Graph => {
                    let cfg = &self.config.graph;
                    let uri = required(&cfg.uri, "NEO4J_URI")?;
                    let password = cfg.password.clone().unwrap_or_default();
                    let graph = Neo4jGraph::connect(uri, &cfg.user, &password).await?;
                    StoreHandle::Graph(Arc::new(graph))
                }
                StoreKind::Session => {
                    let sessions = RedisSessions::connect(&self.config.sessions.url).await?;
                    StoreHandle::Session(Arc::new(sessions))
                }
            };
            Ok(handle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tournament_storage::ErrorKind;

    #[tokio::test]
    async fn test_in_memory_open_counts_and_failures() {
        let connector = InMemoryConnector::new();

        let handle = connector.open(StoreKind::Graph).await.unwrap();
        assert_eq!(handle.kind(), StoreKind::Graph);
        assert_eq!(connector.open_count(StoreKind::Graph), 1);

        connector.fail_connect(StoreKind::Graph, true);
        let err = connector.open(StoreKind::Graph).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Connection);
        assert_eq!(connector.open_count(StoreKind::Graph), 1);

        connector.fail_connect(StoreKind::Graph, false);
        assert!(connector.open(StoreKind::Graph).await.is_ok());
        assert_eq!(connector.open_count(StoreKind::Graph), 2);
    }

    #[tokio::test]
    async fn test_closing_one_handle_leaves_the_store_usable() {
        let connector = InMemoryConnector::new();
        let first = connector.open(StoreKind::Session).await.unwrap();
        first.close().await.unwrap();
        assert!(first.ping().await.is_err());

        let second = connector.open(StoreKind::Session).await.unwrap();
        assert!(second.ping().await.is_ok());
    }
}
