//! tournament-storage - Store ports and adapters for the tournament replica
//!
//! > "One authoritative source, one shape per access pattern."
//!
//! ## Core Principles
//!
//! 1. **Typed source rows**: relational result shapes are resolved inside the
//!    PostgreSQL adapter; callers only see `*Row` structs
//! 2. **Edition identity**: the bracket graph is keyed by numeric edition id,
//!    never by the human label
//! 3. **Partition scope**: every delete names exactly the partition it clears
//!
//! ## Layout
//!
//! - `domain`: records and port traits
//! - `schema`: wide-column DDL
//! - `infrastructure`: in-memory doubles plus feature-gated live adapters
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tournament_storage::{GroupPartition, InMemoryWideColumn, WideColumnStore};
//!
//! let store = InMemoryWideColumn::new();
//! store.ensure_schema().await?;
//! store.insert_standings(&rows).await?;
//! let view = store.read_standings(&GroupPartition::new("Mundial 2030", "A")).await?;
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod schema;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::*;
pub use infrastructure::{
    Faults, InMemoryDocuments, InMemoryGraph, InMemoryRelational, InMemorySessions,
    InMemoryWideColumn,
};
