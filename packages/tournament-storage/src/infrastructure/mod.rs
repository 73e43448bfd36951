//! Infrastructure layer - Storage adapters
//!
//! - `memory`: in-process doubles for every port (always built)
//! - `postgres`: primary relational source (feature `postgres`)
//! - `cassandra`: wide-column replica (feature `cassandra`)
//! - `mongo`: document replica (feature `mongo`)
//! - `neo4j`: bracket graph (feature `neo4j`)
//! - `redis_sessions`: session cache (feature `redis-session`)

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "cassandra")]
pub mod cassandra;

#[cfg(feature = "mongo")]
pub mod mongo;

#[cfg(feature = "neo4j")]
pub mod neo4j;

#[cfg(feature = "redis-session")]
pub mod redis_sessions;

pub use memory::{
    Faults, InMemoryDocuments, InMemoryGraph, InMemoryRelational, InMemorySessions,
    InMemoryWideColumn,
};

#[cfg(feature = "postgres")]
pub use postgres::PostgresSource;

#[cfg(feature = "cassandra")]
pub use cassandra::CassandraStore;

#[cfg(feature = "mongo")]
pub use mongo::MongoStore;

#[cfg(feature = "neo4j")]
pub use neo4j::Neo4jGraph;

#[cfg(feature = "redis-session")]
pub use redis_sessions::RedisSessions;
