//! Shortest elimination route between two teams of one edition

use serde::Serialize;
use tracing::info;

use tournament_storage::{BracketPath, Edition, GraphStore, RelationalSource};

use crate::error::{OrchestratorError, Result};
use crate::stages::extract;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PathLookup {
    Found(BracketPath),
    /// Disconnected teams, unknown names, or an edition not synced yet
    NoPath,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathReport {
    pub edition: Edition,
    pub from: String,
    pub to: String,
    pub lookup: PathLookup,
}

/// Read-only: a lookup never rebuilds the bracket
pub struct PathFinder<'a> {
    source: &'a dyn RelationalSource,
    graph: &'a dyn GraphStore,
}

impl<'a> PathFinder<'a> {
    pub fn new(source: &'a dyn RelationalSource, graph: &'a dyn GraphStore) -> Self {
        Self { source, graph }
    }

    pub async fn find(&self, label: &str, from: &str, to: &str) -> Result<PathReport> {
        let edition = extract::resolve_edition(self.source, label).await?;

        let path = self
            .graph
            .shortest_path(edition.id, from, to)
            .await
            .map_err(|e| OrchestratorError::read_back("bracket_graph", e))?;

        let lookup = match path {
            Some(path) => {
                info!("{} -> {} in {}: {} matches", from, to, edition, path.len());
                PathLookup::Found(path)
            }
            None => {
                info!("{} -> {} in {}: no path", from, to, edition);
                PathLookup::NoPath
            }
        };

        Ok(PathReport {
            edition,
            from: from.to_string(),
            to: to.to_string(),
            lookup,
        })
    }
}
