use thiserror::Error;
use tournament_storage::{StorageError, StoreKind};

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Cannot connect to {store} store: {source}")]
    Connection {
        store: StoreKind,
        #[source]
        source: StorageError,
    },

    #[error("Edition not found in knockout view: {0}")]
    EditionNotFound(String),

    #[error("Extract failed ({query}): {source}")]
    Extract {
        query: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("Load into {target} failed: {source}")]
    Load {
        target: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("Read-back of {target} failed: {source}")]
    ReadBack {
        target: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl OrchestratorError {
    pub fn connection(store: StoreKind, source: StorageError) -> Self {
        Self::Connection { store, source }
    }

    pub fn extract(query: &'static str, source: StorageError) -> Self {
        Self::Extract { query, source }
    }

    pub fn load(target: &'static str, source: StorageError) -> Self {
        Self::Load { target, source }
    }

    pub fn read_back(target: &'static str, source: StorageError) -> Self {
        Self::ReadBack { target, source }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Connection { .. } => FailureKind::ConnectionFailure,
            Self::EditionNotFound(_) => FailureKind::EditionNotFound,
            Self::Extract { .. } => FailureKind::ExtractFailure,
            Self::Load { .. } => FailureKind::LoadFailure,
            Self::ReadBack { .. } => FailureKind::ReadBackFailure,
            Self::Config(_) => FailureKind::ConfigFailure,
        }
    }
}

/// Failure taxonomy reported for aborted use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// A backing store could not be opened or bootstrapped
    ConnectionFailure,
    /// The edition label has no numeric id in the knockout view
    EditionNotFound,
    ExtractFailure,
    /// Target write rejected; earlier writes are kept
    LoadFailure,
    ReadBackFailure,
    ConfigFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ConnectionFailure => "connection_failure",
            FailureKind::EditionNotFound => "edition_not_found",
            FailureKind::ExtractFailure => "extract_failure",
            FailureKind::LoadFailure => "load_failure",
            FailureKind::ReadBackFailure => "read_back_failure",
            FailureKind::ConfigFailure => "config_failure",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "connection_failure" => Some(FailureKind::ConnectionFailure),
            "edition_not_found" => Some(FailureKind::EditionNotFound),
            "extract_failure" => Some(FailureKind::ExtractFailure),
            "load_failure" => Some(FailureKind::LoadFailure),
            "read_back_failure" => Some(FailureKind::ReadBackFailure),
            "config_failure" => Some(FailureKind::ConfigFailure),
            _ => None,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_roundtrip() {
        for kind in &[
            FailureKind::ConnectionFailure,
            FailureKind::EditionNotFound,
            FailureKind::ExtractFailure,
            FailureKind::LoadFailure,
            FailureKind::ReadBackFailure,
            FailureKind::ConfigFailure,
        ] {
            let s = kind.as_str();
            assert_eq!(FailureKind::from_str(s), Some(*kind));
        }
    }

    #[test]
    fn test_failure_kind_invalid() {
        assert!(FailureKind::from_str("empty_result").is_none());
    }

    #[test]
    fn test_error_kind_mapping_and_message() {
        let err = OrchestratorError::connection(
            StoreKind::Graph,
            StorageError::connection("bolt handshake refused"),
        );
        assert_eq!(err.kind(), FailureKind::ConnectionFailure);
        assert_eq!(
            err.to_string(),
            "Cannot connect to graph store: [connection] bolt handshake refused"
        );

        let err = OrchestratorError::EditionNotFound("Mundial 2099".to_string());
        assert_eq!(err.kind(), FailureKind::EditionNotFound);
        assert!(err.to_string().contains("Mundial 2099"));

        let err = OrchestratorError::load("group_standings", StorageError::write("rejected"));
        assert_eq!(err.kind(), FailureKind::LoadFailure);
    }
}
