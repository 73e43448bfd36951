//! Bracket graph double on top of `petgraph::StableUnGraph`
//!
//! Node and edge indices stay valid across removals, so the two lookup maps
//! only need pruning for the purged edition.

use async_trait::async_trait;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

use super::{Faults, MemoryHandle};
use crate::domain::*;
use crate::error::{Result, StorageError};

#[derive(Default)]
struct Bracket {
    graph: StableUnGraph<TeamNode, MatchEdge>,
    teams: HashMap<(i64, EditionId), NodeIndex>,
    matches: HashMap<(i64, EditionId), EdgeIndex>,
}

impl Bracket {
    /// Lowest team id wins when a display name is ambiguous
    fn node_by_name(&self, edition_id: EditionId, name: &str) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&ix| {
                let team = &self.graph[ix];
                team.edition_id == edition_id && team.display_name == name
            })
            .min_by_key(|&ix| self.graph[ix].team_id)
    }

    /// Neighbors over edges of one edition, ordered by match id
    fn neighbors(&self, node: NodeIndex, edition_id: EditionId) -> Vec<(NodeIndex, EdgeIndex)> {
        let mut out: Vec<(NodeIndex, EdgeIndex)> = self
            .graph
            .edges(node)
            .filter(|e| e.weight().edition_id == edition_id)
            .map(|e| {
                let next = if e.source() == node { e.target() } else { e.source() };
                (next, e.id())
            })
            .collect();
        out.sort_by_key(|&(_, edge)| self.graph[edge].match_id);
        out
    }

    /// BFS from `from` to `to`; parent links rebuild the route
    fn bfs(&self, edition_id: EditionId, from: NodeIndex, to: NodeIndex) -> Option<BracketPath> {
        let mut visited = HashSet::new();
        let mut parent: HashMap<NodeIndex, (NodeIndex, EdgeIndex)> = HashMap::new();
        let mut queue = VecDeque::new();

        visited.insert(from);
        queue.push_back(from);

        while let Some(node) = queue.pop_front() {
            if node == to {
                break;
            }
            for (next, edge) in self.neighbors(node, edition_id) {
                if visited.insert(next) {
                    parent.insert(next, (node, edge));
                    queue.push_back(next);
                }
            }
        }

        if from != to && !parent.contains_key(&to) {
            return None;
        }

        let mut teams = vec![self.graph[to].display_name.clone()];
        let mut matches = Vec::new();
        let mut cursor = to;
        while let Some(&(prev, edge)) = parent.get(&cursor) {
            let game = &self.graph[edge];
            matches.push(PathLeg {
                phase: game.phase.clone(),
                match_id: game.match_id,
            });
            teams.push(self.graph[prev].display_name.clone());
            cursor = prev;
            if cursor == from {
                break;
            }
        }
        teams.reverse();
        matches.reverse();

        Some(BracketPath { teams, matches })
    }
}

pub struct InMemoryGraph {
    handle: MemoryHandle<Bracket>,
}

impl Default for InMemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self {
            handle: MemoryHandle::new(StoreKind::Graph, Bracket::default()),
        }
    }

    pub fn reopen(&self) -> Self {
        Self {
            handle: self.handle.reopen(),
        }
    }

    pub fn faults(&self) -> &Faults {
        self.handle.faults()
    }

    pub fn team(&self, team_id: i64, edition_id: EditionId) -> Option<TeamNode> {
        self.handle.admin(|b| {
            b.teams
                .get(&(team_id, edition_id))
                .map(|&ix| b.graph[ix].clone())
        })
    }

    pub fn edge(&self, match_id: i64, edition_id: EditionId) -> Option<MatchEdge> {
        self.handle.admin(|b| {
            b.matches
                .get(&(match_id, edition_id))
                .map(|&ix| b.graph[ix].clone())
        })
    }
}

#[async_trait]
impl BackingStore for InMemoryGraph {
    fn kind(&self) -> StoreKind {
        StoreKind::Graph
    }

    async fn ping(&self) -> Result<()> {
        self.handle.ping()
    }

    async fn close(&self) -> Result<()> {
        self.handle.close()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraph {
    async fn purge_edition(&self, edition_id: EditionId) -> Result<u64> {
        self.handle.write(|b| {
            let doomed: Vec<NodeIndex> = b
                .graph
                .node_indices()
                .filter(|&ix| b.graph[ix].edition_id == edition_id)
                .collect();
            for ix in &doomed {
                b.graph.remove_node(*ix);
            }
            b.teams.retain(|&(_, edition), _| edition != edition_id);
            b.matches.retain(|&(_, edition), _| edition != edition_id);
            Ok(doomed.len() as u64)
        })
    }

    async fn merge_team(&self, team: &TeamNode) -> Result<()> {
        self.handle.write(|b| {
            let key = (team.team_id, team.edition_id);
            if !b.teams.contains_key(&key) {
                let ix = b.graph.add_node(team.clone());
                b.teams.insert(key, ix);
            }
            Ok(())
        })
    }

    async fn merge_match(&self, edge: &MatchEdge) -> Result<()> {
        self.handle.write(|b| {
            let key = (edge.match_id, edge.edition_id);
            if b.matches.contains_key(&key) {
                return Ok(());
            }
            let endpoint = |team_id: i64| {
                b.teams.get(&(team_id, edge.edition_id)).copied().ok_or_else(|| {
                    StorageError::write(format!(
                        "team {} of edition {} missing for match {}",
                        team_id, edge.edition_id, edge.match_id
                    ))
                })
            };
            let a = endpoint(edge.team_a)?;
            let z = endpoint(edge.team_b)?;
            let ix = b.graph.add_edge(a, z, edge.clone());
            b.matches.insert(key, ix);
            Ok(())
        })
    }

    async fn find_team(&self, edition_id: EditionId, name: &str) -> Result<Option<TeamNode>> {
        self.handle.read(|b| {
            Ok(b.node_by_name(edition_id, name)
                .map(|ix| b.graph[ix].clone()))
        })
    }

    async fn shortest_path(
        &self,
        edition_id: EditionId,
        from: &str,
        to: &str,
    ) -> Result<Option<BracketPath>> {
        self.handle.read(|b| {
            let (Some(start), Some(goal)) = (
                b.node_by_name(edition_id, from),
                b.node_by_name(edition_id, to),
            ) else {
                return Ok(None);
            };
            Ok(b.bfs(edition_id, start, goal))
        })
    }

    async fn summary(&self, edition_id: EditionId) -> Result<GraphSummary> {
        self.handle.read(|b| {
            Ok(GraphSummary {
                teams: b.teams.keys().filter(|(_, e)| *e == edition_id).count(),
                matches: b.matches.keys().filter(|(_, e)| *e == edition_id).count(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn team(team_id: i64, edition_id: EditionId, name: &str) -> TeamNode {
        TeamNode {
            team_id,
            edition_id,
            display_name: name.to_string(),
        }
    }

    fn game(match_id: i64, edition_id: EditionId, a: i64, b: i64) -> MatchEdge {
        MatchEdge {
            match_id,
            edition_id,
            phase: format!("phase-{}", match_id),
            team_a: a,
            team_b: b,
        }
    }

    /// A-B (m1), C-D (m2), A-C (m3)
    async fn diamond(graph: &InMemoryGraph, edition_id: EditionId) {
        for (id, name) in [(1, "A"), (2, "B"), (3, "C"), (4, "D")] {
            graph.merge_team(&team(id, edition_id, name)).await.unwrap();
        }
        graph.merge_match(&game(1, edition_id, 1, 2)).await.unwrap();
        graph.merge_match(&game(2, edition_id, 3, 4)).await.unwrap();
        graph.merge_match(&game(3, edition_id, 1, 3)).await.unwrap();
    }

    #[tokio::test]
    async fn test_shortest_path_walks_edges_undirected() {
        let graph = InMemoryGraph::new();
        diamond(&graph, 30).await;

        let path = graph.shortest_path(30, "B", "D").await.unwrap().unwrap();
        assert_eq!(path.teams, vec!["B", "A", "C", "D"]);
        assert_eq!(path.match_ids(), vec![1, 3, 2]);
        assert_eq!(path.matches[0].phase, "phase-1");
    }

    #[tokio::test]
    async fn test_same_team_is_zero_length_path() {
        let graph = InMemoryGraph::new();
        diamond(&graph, 30).await;

        let path = graph.shortest_path(30, "C", "C").await.unwrap().unwrap();
        assert_eq!(path.teams, vec!["C"]);
        assert!(path.is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_and_unknown_names() {
        let graph = InMemoryGraph::new();
        for (id, name) in [(1, "A"), (2, "B"), (3, "C"), (4, "D")] {
            graph.merge_team(&team(id, 30, name)).await.unwrap();
        }
        graph.merge_match(&game(1, 30, 1, 2)).await.unwrap();
        graph.merge_match(&game(2, 30, 3, 4)).await.unwrap();

        assert_eq!(graph.shortest_path(30, "A", "D").await.unwrap(), None);
        assert_eq!(graph.shortest_path(30, "A", "Nowhere").await.unwrap(), None);
        assert_eq!(graph.shortest_path(26, "A", "B").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_merge_keeps_first_name_and_phase() {
        let graph = InMemoryGraph::new();
        graph.merge_team(&team(1, 30, "Korea Republic")).await.unwrap();
        graph.merge_team(&team(1, 30, "South Korea")).await.unwrap();
        graph.merge_team(&team(2, 30, "Italy")).await.unwrap();

        let mut edge = game(7, 30, 1, 2);
        graph.merge_match(&edge).await.unwrap();
        edge.phase = "renamed".to_string();
        graph.merge_match(&edge).await.unwrap();

        assert_eq!(graph.team(1, 30).unwrap().display_name, "Korea Republic");
        assert_eq!(graph.edge(7, 30).unwrap().phase, "phase-7");
        assert_eq!(
            graph.summary(30).await.unwrap(),
            GraphSummary { teams: 2, matches: 1 }
        );
    }

    #[tokio::test]
    async fn test_purge_leaves_other_editions() {
        let graph = InMemoryGraph::new();
        diamond(&graph, 26).await;
        diamond(&graph, 30).await;

        assert_eq!(graph.purge_edition(26).await.unwrap(), 4);
        assert_eq!(graph.summary(26).await.unwrap(), GraphSummary::default());
        assert_eq!(
            graph.summary(30).await.unwrap(),
            GraphSummary { teams: 4, matches: 3 }
        );
        assert!(graph.shortest_path(30, "B", "D").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_merge_match_requires_endpoints() {
        let graph = InMemoryGraph::new();
        graph.merge_team(&team(1, 30, "A")).await.unwrap();
        let err = graph.merge_match(&game(1, 30, 1, 99)).await.unwrap_err();
        assert!(err.message.contains("team 99"));
    }
}
