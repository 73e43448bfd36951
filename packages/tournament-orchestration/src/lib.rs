/*
 * Tournament Orchestration - Replica pipelines for the Mundial dataset
 *
 * Copies query-shaped views of the authoritative PostgreSQL store into the
 * replica stores and answers bracket questions from the graph.
 *
 * Architecture:
 * - ConnectionManager (lazy, health-checked handles per store)
 * - Extract / Transform / Load stages
 * - GraphSyncEngine (purge-then-merge per numeric edition id)
 * - PathFinder (edition-scoped shortest route)
 * - ReplicaOrchestrator (one use case at a time)
 */

// Public modules
pub mod config;
pub mod connection;
pub mod connectors;
pub mod error;
pub mod graph_sync;
pub mod orchestrator;
pub mod outcome;
pub mod path_finder;
pub mod stages;
pub mod use_case;

// Re-exports
pub use config::{ConfigError, ReplicaConfig};
pub use connection::{ConnectionManager, ShutdownReport, StoreConnector, StoreHandle};
pub use connectors::InMemoryConnector;
#[cfg(feature = "live")]
pub use connectors::LiveConnector;
pub use error::{FailureKind, OrchestratorError, Result};
pub use graph_sync::{GraphSyncEngine, SyncReport};
pub use orchestrator::ReplicaOrchestrator;
pub use outcome::{Extracted, PipelineReport, UseCaseOutcome};
pub use path_finder::{PathFinder, PathLookup, PathReport};
pub use stages::{BracketMerge, LoadCount};
pub use use_case::{normalize_group, UseCaseId};
