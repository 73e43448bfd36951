//! Rebuilds one edition's elimination bracket in the graph store

use serde::Serialize;
use tracing::{info, warn};

use tournament_storage::{Edition, GraphStore, RelationalSource};

use crate::error::Result;
use crate::outcome::Extracted;
use crate::stages::{extract, load, transform};

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub edition: Edition,
    pub edges_processed: usize,
    pub teams_merged: usize,
    /// Team nodes of the edition removed before the rebuild
    pub purged_nodes: u64,
}

/// Purge-then-merge synchronization scoped by numeric edition id.
///
/// Other editions' nodes and edges are never touched, even when team names
/// collide.
pub struct GraphSyncEngine<'a> {
    source: &'a dyn RelationalSource,
    graph: &'a dyn GraphStore,
}

impl<'a> GraphSyncEngine<'a> {
    pub fn new(source: &'a dyn RelationalSource, graph: &'a dyn GraphStore) -> Self {
        Self { source, graph }
    }

    /// `Ok(None)` when the edition resolves but has no knockout edges; the
    /// existing graph is left as is in that case.
    pub async fn rebuild(&self, label: &str) -> Result<Option<SyncReport>> {
        let edition = extract::resolve_edition(self.source, label).await?;

        let Extracted::Rows(rows) = extract::bracket_edges(self.source, edition.id).await? else {
            warn!("No knockout data for {}", edition);
            return Ok(None);
        };

        let purged_nodes = load::purge_bracket(self.graph, edition.id).await?;

        let merges = transform::bracket_merges(rows);
        let teams_merged = load::merge_bracket(self.graph, &merges).await?;

        info!(
            "Bracket of {} rebuilt: {} edges, {} teams ({} nodes purged)",
            edition,
            merges.len(),
            teams_merged,
            purged_nodes
        );

        Ok(Some(SyncReport {
            edition,
            edges_processed: merges.len(),
            teams_merged,
            purged_nodes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use tournament_storage::{BracketEdgeRow, InMemoryGraph, InMemoryRelational};

    fn edge(edition_id: i64, match_id: i64, a: (i64, &str), b: (i64, &str)) -> BracketEdgeRow {
        BracketEdgeRow {
            edition_id,
            match_id,
            phase: "quarterfinal".to_string(),
            team_a: a.0,
            name_a: a.1.to_string(),
            team_b: b.0,
            name_b: b.1.to_string(),
        }
    }

    #[tokio::test]
    async fn test_rebuild_twice_is_stable() {
        let source = InMemoryRelational::new();
        source.seed_bracket_edges(
            "Mundial 2030",
            vec![edge(30, 1, (1, "A"), (2, "B")), edge(30, 2, (1, "A"), (3, "C"))],
        );
        let graph = InMemoryGraph::new();
        let engine = GraphSyncEngine::new(&source, &graph);

        let first = engine.rebuild("Mundial 2030").await.unwrap().unwrap();
        assert_eq!(first.edges_processed, 2);
        assert_eq!(first.teams_merged, 3);
        assert_eq!(first.purged_nodes, 0);

        let second = engine.rebuild("Mundial 2030").await.unwrap().unwrap();
        assert_eq!(second.purged_nodes, 3);

        let summary = graph.summary(30).await.unwrap();
        assert_eq!((summary.teams, summary.matches), (3, 2));
    }

    #[tokio::test]
    async fn test_unknown_label_fails_before_touching_graph() {
        let source = InMemoryRelational::new();
        let graph = InMemoryGraph::new();

        let err = GraphSyncEngine::new(&source, &graph)
            .rebuild("Mundial 2099")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::EditionNotFound);
        assert_eq!(graph.faults().mutations(), 0);
    }
}
