//! Use-case outcomes and pipeline reports

use serde::Serialize;

use crate::error::{FailureKind, OrchestratorError};
use crate::use_case::UseCaseId;

/// Result of one extraction: rows, or the explicit "nothing to do" signal
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    Rows(Vec<T>),
    NoData,
}

impl<T> Extracted<T> {
    pub fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            Extracted::NoData
        } else {
            Extracted::Rows(rows)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Extracted::Rows(rows) => rows.len(),
            Extracted::NoData => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of every orchestrator use case.
///
/// `NoData` is not a failure: the source had nothing for the filter and no
/// target was touched.
#[derive(Debug)]
pub enum UseCaseOutcome<T> {
    Completed(T),
    NoData { use_case: UseCaseId, filter: String },
    Failed { use_case: UseCaseId, error: OrchestratorError },
}

impl<T> UseCaseOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, UseCaseOutcome::Completed(_))
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, UseCaseOutcome::NoData { .. })
    }

    pub fn completed(self) -> Option<T> {
        match self {
            UseCaseOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            UseCaseOutcome::Failed { error, .. } => Some(error.kind()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&OrchestratorError> {
        match self {
            UseCaseOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Counters plus the read-back view of one replication pipeline
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport<T> {
    pub use_case: UseCaseId,
    pub extracted: usize,
    /// Rows/documents removed by a partition delete (0 for upsert targets)
    pub deleted: u64,
    pub written: u64,
    pub rows: Vec<T>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tournament_storage::StorageError;

    #[test]
    fn test_extracted_from_rows() {
        assert_eq!(Extracted::<i32>::from_rows(vec![]), Extracted::NoData);
        let rows = Extracted::from_rows(vec![1, 2]);
        assert_eq!(rows.len(), 2);
        assert!(!rows.is_empty());
    }

    #[test]
    fn test_outcome_accessors() {
        let done: UseCaseOutcome<u32> = UseCaseOutcome::Completed(3);
        assert!(done.is_completed());
        assert_eq!(done.completed(), Some(3));

        let empty: UseCaseOutcome<u32> = UseCaseOutcome::NoData {
            use_case: UseCaseId::GroupStandings,
            filter: "Mundial 2099 / group Z".to_string(),
        };
        assert!(empty.is_no_data());
        assert!(empty.failure_kind().is_none());

        let failed: UseCaseOutcome<u32> = UseCaseOutcome::Failed {
            use_case: UseCaseId::RefereePanels,
            error: OrchestratorError::load("referee_panels", StorageError::write("boom")),
        };
        assert_eq!(failed.failure_kind(), Some(FailureKind::LoadFailure));
        assert!(failed.error().is_some());
    }
}
