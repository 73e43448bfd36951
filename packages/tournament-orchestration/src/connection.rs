//! Lazily opened, health-checked store handles
//!
//! One [`ConnectionManager`] is owned by the orchestrator. It opens at most one
//! handle per [`StoreKind`], pings cached handles before handing them out, and
//! closes everything on [`shutdown`](ConnectionManager::shutdown).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use tournament_storage::{
    DocumentStore, GraphStore, RelationalSource, SessionStore, StorageError, StoreKind,
    WideColumnStore,
};

use crate::error::{OrchestratorError, Result};

/// A live handle to one backing store
#[derive(Clone)]
pub enum StoreHandle {
    Relational(Arc<dyn RelationalSource>),
    WideColumn(Arc<dyn WideColumnStore>),
    Document(Arc<dyn DocumentStore>),
    Graph(Arc<dyn GraphStore>),
    Session(Arc<dyn SessionStore>),
}

impl StoreHandle {
    pub fn kind(&self) -> StoreKind {
        match self {
            StoreHandle::Relational(_) => StoreKind::Relational,
            StoreHandle::WideColumn(_) => StoreKind::WideColumn,
            StoreHandle::Document(_) => StoreKind::Document,
            StoreHandle::Graph(_) => StoreKind::Graph,
            StoreHandle::Session(_) => StoreKind::Session,
        }
    }

    pub async fn ping(&self) -> tournament_storage::Result<()> {
        match self {
            StoreHandle::Relational(h) => h.ping().await,
            StoreHandle::WideColumn(h) => h.ping().await,
            StoreHandle::Document(h) => h.ping().await,
            StoreHandle::Graph(h) => h.ping().await,
            StoreHandle::Session(h) => h.ping().await,
        }
    }

    pub async fn close(&self) -> tournament_storage::Result<()> {
        match self {
            StoreHandle::Relational(h) => h.close().await,
            StoreHandle::WideColumn(h) => h.close().await,
            StoreHandle::Document(h) => h.close().await,
            StoreHandle::Graph(h) => h.close().await,
            StoreHandle::Session(h) => h.close().await,
        }
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StoreHandle({})", self.kind())
    }
}

/// Opens new store handles (real drivers or in-memory doubles)
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn open(&self, kind: StoreKind) -> tournament_storage::Result<StoreHandle>;
}

/// What `shutdown` managed to close
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub closed: Vec<StoreKind>,
    pub failures: Vec<(StoreKind, StorageError)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ConnectionManager {
    connector: Arc<dyn StoreConnector>,
    handles: HashMap<StoreKind, StoreHandle>,
    connect_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn StoreConnector>, connect_timeout: Duration) -> Self {
        Self {
            connector,
            handles: HashMap::new(),
            connect_timeout,
        }
    }

    pub fn is_open(&self, kind: StoreKind) -> bool {
        self.handles.contains_key(&kind)
    }

    /// Cached handle if it still answers a ping, otherwise a freshly opened one.
    ///
    /// Failed opens and failed schema bootstraps are never cached.
    pub async fn get_or_connect(&mut self, kind: StoreKind) -> Result<StoreHandle> {
        if let Some(handle) = self.handles.get(&kind).cloned() {
            match handle.ping().await {
                Ok(()) => return Ok(handle),
                Err(e) => {
                    warn!("Cached {} handle failed its ping, reconnecting: {}", kind, e);
                    self.handles.remove(&kind);
                    if let Err(e) = handle.close().await {
                        debug!("Closing stale {} handle failed: {}", kind, e);
                    }
                }
            }
        }

        let handle = self.open(kind).await?;
        self.handles.insert(kind, handle.clone());
        info!("Connected to {} store", kind);
        Ok(handle)
    }

    async fn open(&self, kind: StoreKind) -> Result<StoreHandle> {
        let attempt = async {
            let handle = self.connector.open(kind).await?;
            if let Err(e) = handle.ping().await {
                let _ = handle.close().await;
                return Err(e);
            }
            Ok::<_, StorageError>(handle)
        };
        let handle = match tokio::time::timeout(self.connect_timeout, attempt).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => return Err(OrchestratorError::connection(kind, e)),
            Err(_) => {
                return Err(OrchestratorError::connection(
                    kind,
                    StorageError::connection(format!(
                        "timed out after {} ms",
                        self.connect_timeout.as_millis()
                    )),
                ))
            }
        };

        if handle.kind() != kind {
            let _ = handle.close().await;
            return Err(OrchestratorError::connection(
                kind,
                StorageError::config(format!(
                    "connector returned a {} handle",
                    handle.kind()
                )),
            ));
        }

        if let StoreHandle::WideColumn(store) = &handle {
            if let Err(e) = store.ensure_schema().await {
                let _ = handle.close().await;
                return Err(OrchestratorError::connection(kind, e));
            }
            debug!("Wide-column schema ensured");
        }

        Ok(handle)
    }

    pub async fn relational(&mut self) -> Result<Arc<dyn RelationalSource>> {
        match self.get_or_connect(StoreKind::Relational).await? {
            StoreHandle::Relational(h) => Ok(h),
            other => Err(mismatch(StoreKind::Relational, &other)),
        }
    }

    pub async fn wide_column(&mut self) -> Result<Arc<dyn WideColumnStore>> {
        match self.get_or_connect(StoreKind::WideColumn).await? {
            StoreHandle::WideColumn(h) => Ok(h),
            other => Err(mismatch(StoreKind::WideColumn, &other)),
        }
    }

    pub async fn documents(&mut self) -> Result<Arc<dyn DocumentStore>> {
        match self.get_or_connect(StoreKind::Document).await? {
            StoreHandle::Document(h) => Ok(h),
            other => Err(mismatch(StoreKind::Document, &other)),
        }
    }

    pub async fn graph(&mut self) -> Result<Arc<dyn GraphStore>> {
        match self.get_or_connect(StoreKind::Graph).await? {
            StoreHandle::Graph(h) => Ok(h),
            other => Err(mismatch(StoreKind::Graph, &other)),
        }
    }

    pub async fn sessions(&mut self) -> Result<Arc<dyn SessionStore>> {
        match self.get_or_connect(StoreKind::Session).await? {
            StoreHandle::Session(h) => Ok(h),
            other => Err(mismatch(StoreKind::Session, &other)),
        }
    }

    /// Closes every open handle. A failing close is logged and the remaining
    /// handles are still closed.
    pub async fn shutdown(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        for kind in StoreKind::ALL {
            let Some(handle) = self.handles.remove(&kind) else {
                continue;
            };
            match handle.close().await {
                Ok(()) => {
                    debug!("Closed {} store", kind);
                    report.closed.push(kind);
                }
                Err(e) => {
                    warn!("Closing {} store failed: {}", kind, e);
                    report.failures.push((kind, e));
                }
            }
        }

        info!(
            "Shutdown complete ({} closed, {} failed)",
            report.closed.len(),
            report.failures.len()
        );
        report
    }
}

fn mismatch(expected: StoreKind, got: &StoreHandle) -> OrchestratorError {
    OrchestratorError::connection(
        expected,
        StorageError::config(format!("cached handle is a {} handle", got.kind())),
    )
}
