//! Error types for tournament-storage

use std::fmt;
use thiserror::Error;

/// Storage error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Store unreachable or handshake rejected
    Connection,
    /// Read rejected by the store
    Query,
    /// Write rejected by the store
    Write,
    /// Row/record could not be mapped to a domain type
    Decode,
    /// Serialization/deserialization errors
    Serialization,
    /// Configuration errors
    Config,
    /// Handle used after close
    Closed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Query => "query",
            ErrorKind::Write => "write",
            ErrorKind::Decode => "decode",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Config => "config",
            ErrorKind::Closed => "closed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Query, message)
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Write, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn closed(store: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Closed,
            format!("Store handle already closed: {}", store.into()),
        )
    }

    /// Wraps any driver error with a kind and a short context string.
    pub fn from_driver<E>(kind: ErrorKind, context: &str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::new(kind, format!("{}: {}", context, err)).with_source(err)
    }
}

// PostgreSQL error conversions
#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => ErrorKind::Connection,
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_) => ErrorKind::Decode,
            _ => ErrorKind::Query,
        };
        StorageError::from_driver(kind, "PostgreSQL error", err)
    }
}

#[cfg(feature = "cassandra")]
impl From<scylla::transport::errors::NewSessionError> for StorageError {
    fn from(err: scylla::transport::errors::NewSessionError) -> Self {
        StorageError::from_driver(ErrorKind::Connection, "Cassandra session error", err)
    }
}

#[cfg(feature = "cassandra")]
impl From<scylla::transport::errors::QueryError> for StorageError {
    fn from(err: scylla::transport::errors::QueryError) -> Self {
        StorageError::from_driver(ErrorKind::Query, "Cassandra query error", err)
    }
}

#[cfg(feature = "mongo")]
impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        StorageError::from_driver(ErrorKind::Query, "MongoDB error", err)
    }
}

#[cfg(feature = "neo4j")]
impl From<neo4rs::Error> for StorageError {
    fn from(err: neo4rs::Error) -> Self {
        StorageError::from_driver(ErrorKind::Query, "Neo4j error", err)
    }
}

#[cfg(feature = "redis-session")]
impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        let kind = if err.is_connection_refusal() || err.is_io_error() {
            ErrorKind::Connection
        } else {
            ErrorKind::Query
        };
        StorageError::from_driver(kind, "Redis error", err)
    }
}

// JSON error conversions
impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StorageError>;
