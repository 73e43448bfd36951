//! Domain layer
//!
//! # Records
//!
//! - Source rows (`StandingRow`, `BracketEdgeRow`, ...): typed extraction
//!   contract of the primary relational store
//! - Target records (`GroupStanding`, `RefereePanel`, `TeamNode`, ...): what
//!   each secondary store persists
//!
//! # Port Traits
//!
//! - `RelationalSource`: named reads against PostgreSQL
//! - `WideColumnStore`: ranked partitions (Cassandra)
//! - `DocumentStore`: nested documents (MongoDB)
//! - `GraphStore`: per-edition elimination bracket (Neo4j)
//! - `SessionStore`: TTL key/value (Redis)
//!
//! # Examples
//!
//! ```rust,ignore
//! use tournament_storage::domain::{GroupPartition, WideColumnStore};
//!
//! async fn example(store: &dyn WideColumnStore) -> Result<()> {
//!     let partition = GroupPartition::new("Mundial 2030", "A");
//!     store.delete_standings(&partition).await?;
//!     store.insert_standings(&rows).await?;
//!     let view = store.read_standings(&partition).await?;
//!     Ok(())
//! }
//! ```

pub mod models;
pub mod ports;

pub use models::*;
pub use ports::*;
