//! In-memory adapters
//!
//! Process-local implementations of every store port. They keep the same
//! ordering and keying rules as the live stores, and expose fault switches so
//! failure paths can be driven without a running database.
//!
//! A handle can be [`reopen`](InMemoryWideColumn::reopen)ed: the new handle
//! shares data and fault switches with the old one but has its own closed
//! flag, which is how a reconnect behaves against a real server.

mod documents;
mod graph;
mod relational;
mod sessions;
mod wide_column;

pub use documents::InMemoryDocuments;
pub use graph::InMemoryGraph;
pub use relational::InMemoryRelational;
pub use sessions::InMemorySessions;
pub use wide_column::InMemoryWideColumn;

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::domain::StoreKind;
use crate::error::{Result, StorageError};

/// Fault switches and mutation counter shared by all handles of one store
#[derive(Debug, Default)]
pub struct Faults {
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    unhealthy: AtomicBool,
    fail_close: AtomicBool,
    mutations: AtomicU64,
}

impl Faults {
    /// Every subsequent read returns a query error
    pub fn set_read_failure(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    /// Every subsequent mutation returns a write error
    pub fn set_write_failure(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    /// Pings fail while set
    pub fn set_unhealthy(&self, on: bool) {
        self.unhealthy.store(on, Ordering::SeqCst);
    }

    pub fn set_close_failure(&self, on: bool) {
        self.fail_close.store(on, Ordering::SeqCst);
    }

    /// Number of successful mutating calls (deletes, inserts, upserts, merges)
    pub fn mutations(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }
}

struct Shared<T> {
    faults: Faults,
    data: RwLock<T>,
}

/// One connection-like view over shared store state
pub(crate) struct MemoryHandle<T> {
    kind: StoreKind,
    shared: Arc<Shared<T>>,
    closed: AtomicBool,
}

impl<T> MemoryHandle<T> {
    pub(crate) fn new(kind: StoreKind, data: T) -> Self {
        Self {
            kind,
            shared: Arc::new(Shared {
                faults: Faults::default(),
                data: RwLock::new(data),
            }),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn reopen(&self) -> Self {
        Self {
            kind: self.kind,
            shared: Arc::clone(&self.shared),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn faults(&self) -> &Faults {
        &self.shared.faults
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn guard(&self) -> Result<()> {
        if self.is_closed() {
            return Err(StorageError::closed(self.kind.as_str()));
        }
        Ok(())
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&T) -> Result<R>) -> Result<R> {
        self.guard()?;
        if self.faults().fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::query(format!(
                "injected read failure on {} store",
                self.kind
            )));
        }
        f(&self.shared.data.read())
    }

    /// Runs a counted mutation
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        self.guard()?;
        if self.faults().fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::write(format!(
                "injected write failure on {} store",
                self.kind
            )));
        }
        let out = f(&mut self.shared.data.write())?;
        self.shared.faults.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(out)
    }

    /// Uncounted, fault-free access for schema work and fixture seeding
    pub(crate) fn admin<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.shared.data.write())
    }

    pub(crate) fn ping(&self) -> Result<()> {
        self.guard()?;
        if self.faults().unhealthy.load(Ordering::SeqCst) {
            return Err(StorageError::connection(format!(
                "{} store stopped answering",
                self.kind
            )));
        }
        Ok(())
    }

    pub(crate) fn close(&self) -> Result<()> {
        if self.faults().fail_close.load(Ordering::SeqCst) {
            return Err(StorageError::connection(format!(
                "{} store refused to close cleanly",
                self.kind
            )));
        }
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_write_counts_mutations() {
        let handle = MemoryHandle::new(StoreKind::Document, Vec::<i32>::new());
        handle.write(|v| Ok(v.push(1))).unwrap();
        handle.write(|v| Ok(v.push(2))).unwrap();
        handle.admin(|v| v.push(3));

        assert_eq!(handle.faults().mutations(), 2);
        assert_eq!(handle.read(|v| Ok(v.len())).unwrap(), 3);
    }

    #[test]
    fn test_injected_write_failure() {
        let handle = MemoryHandle::new(StoreKind::WideColumn, 0u32);
        handle.faults().set_write_failure(true);

        let err = handle.write(|n| Ok(*n += 1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Write);
        assert_eq!(handle.faults().mutations(), 0);
    }

    #[test]
    fn test_closed_handle_rejects_calls_but_reopen_shares_data() {
        let handle = MemoryHandle::new(StoreKind::Graph, 7u32);
        handle.close().unwrap();

        assert_eq!(handle.read(|n| Ok(*n)).unwrap_err().kind, ErrorKind::Closed);
        assert_eq!(handle.ping().unwrap_err().kind, ErrorKind::Closed);

        let reopened = handle.reopen();
        assert!(!reopened.is_closed());
        assert_eq!(reopened.read(|n| Ok(*n)).unwrap(), 7);
    }

    #[test]
    fn test_unhealthy_ping() {
        let handle = MemoryHandle::new(StoreKind::Session, ());
        handle.faults().set_unhealthy(true);
        assert_eq!(handle.ping().unwrap_err().kind, ErrorKind::Connection);

        handle.faults().set_unhealthy(false);
        assert!(handle.ping().is_ok());
    }
}
