//! Neo4j bracket graph adapter
//!
//! Nodes are `(:Team {teamId, editionId, displayName})`, relationships are
//! `[:PLAYS_AGAINST {matchId, editionId, phase}]`. Every statement carries the
//! numeric edition id so two editions never share nodes or edges.

use async_trait::async_trait;
use neo4rs::{query, Graph, Query, Row};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::domain::*;
use crate::error::{ErrorKind, Result, StorageError};

const PURGE_CYPHER: &str = "MATCH (t:Team {editionId: $edition_id}) \
     DETACH DELETE t RETURN count(t) AS removed";

const MERGE_TEAM_CYPHER: &str = "MERGE (t:Team {teamId: $team_id, editionId: $edition_id}) \
     ON CREATE SET t.displayName = $display_name";

const MERGE_MATCH_CYPHER: &str = "MATCH (a:Team {teamId: $team_a, editionId: $edition_id}), \
           (b:Team {teamId: $team_b, editionId: $edition_id}) \
     MERGE (a)-[r:PLAYS_AGAINST {matchId: $match_id, editionId: $edition_id}]-(b) \
     ON CREATE SET r.phase = $phase \
     RETURN count(r) AS merged";

const FIND_TEAM_CYPHER: &str = "MATCH (t:Team {editionId: $edition_id, displayName: $name}) \
     RETURN t.teamId AS team_id ORDER BY t.teamId LIMIT 1";

/// Each endpoint resolves to its lowest team id, like `FIND_TEAM_CYPHER`
const SHORTEST_PATH_CYPHER: &str = "MATCH (a:Team {editionId: $edition_id, displayName: $from}) \
     WITH a ORDER BY a.teamId LIMIT 1 \
     MATCH (b:Team {editionId: $edition_id, displayName: $to}) \
     WITH a, b ORDER BY b.teamId LIMIT 1 \
     MATCH p = shortestPath((a)-[:PLAYS_AGAINST*]-(b)) \
     WHERE ALL(r IN relationships(p) WHERE r.editionId = $edition_id) \
     RETURN [n IN nodes(p) | n.displayName] AS teams, \
            [r IN relationships(p) | r.phase] AS phases, \
            [r IN relationships(p) | r.matchId] AS match_ids \
     LIMIT 1";

const SUMMARY_CYPHER: &str = "MATCH (t:Team {editionId: $edition_id}) \
     OPTIONAL MATCH (t)-[r:PLAYS_AGAINST {editionId: $edition_id}]-() \
     RETURN count(DISTINCT t) AS teams, count(DISTINCT r) AS matches";

fn column<T: DeserializeOwned>(row: &Row, key: &str) -> Result<T> {
    row.get::<T>(key)
        .map_err(|e| StorageError::from_driver(ErrorKind::Decode, key, e))
}

pub struct Neo4jGraph {
    graph: Graph,
    closed: AtomicBool,
}

impl Neo4jGraph {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Connection, "Neo4j connect", e))?;
        debug!(uri, "Neo4j driver ready");
        Ok(Self {
            graph,
            closed: AtomicBool::new(false),
        })
    }

    fn guard(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::closed(StoreKind::Graph.as_str()));
        }
        Ok(())
    }

    async fn first_row(&self, q: Query) -> Result<Option<Row>> {
        self.guard()?;
        let mut stream = self.graph.execute(q).await?;
        let first = stream.next().await?;
        while stream.next().await?.is_some() {}
        Ok(first)
    }

    async fn write(&self, q: Query, what: &str) -> Result<()> {
        self.guard()?;
        self.graph
            .run(q)
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Write, what, e))
    }
}

#[async_trait]
impl BackingStore for Neo4jGraph {
    fn kind(&self) -> StoreKind {
        StoreKind::Graph
    }

    async fn ping(&self) -> Result<()> {
        self.first_row(query("RETURN 1 AS ok"))
            .await
            .map(|_| ())
            .map_err(|e| StorageError::connection(e.message))
    }

    async fn close(&self) -> Result<()> {
        // neo4rs releases pooled connections on drop
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl GraphStore for Neo4jGraph {
    async fn purge_edition(&self, edition_id: EditionId) -> Result<u64> {
        let row = self
            .first_row(query(PURGE_CYPHER).param("edition_id", edition_id))
            .await
            .map_err(|e| StorageError::write(format!("purge edition {}: {}", edition_id, e)))?;
        let removed = match row {
            Some(row) => column::<i64>(&row, "removed")?,
            None => 0,
        };
        Ok(removed.max(0) as u64)
    }

    async fn merge_team(&self, team: &TeamNode) -> Result<()> {
        let q = query(MERGE_TEAM_CYPHER)
            .param("team_id", team.team_id)
            .param("edition_id", team.edition_id)
            .param("display_name", team.display_name.as_str());
        self.write(q, "merge team").await
    }

    async fn merge_match(&self, edge: &MatchEdge) -> Result<()> {
        let q = query(MERGE_MATCH_CYPHER)
            .param("team_a", edge.team_a)
            .param("team_b", edge.team_b)
            .param("edition_id", edge.edition_id)
            .param("match_id", edge.match_id)
            .param("phase", edge.phase.as_str());
        let row = self
            .first_row(q)
            .await
            .map_err(|e| StorageError::write(format!("merge match {}: {}", edge.match_id, e)))?;
        let merged = match row {
            Some(row) => column::<i64>(&row, "merged")?,
            None => 0,
        };
        if merged == 0 {
            return Err(StorageError::write(format!(
                "team {} or {} of edition {} missing for match {}",
                edge.team_a, edge.team_b, edge.edition_id, edge.match_id
            )));
        }
        Ok(())
    }

    async fn find_team(&self, edition_id: EditionId, name: &str) -> Result<Option<TeamNode>> {
        let q = query(FIND_TEAM_CYPHER)
            .param("edition_id", edition_id)
            .param("name", name);
        let Some(row) = self.first_row(q).await? else {
            return Ok(None);
        };
        Ok(Some(TeamNode {
            team_id: column(&row, "team_id")?,
            edition_id,
            display_name: name.to_string(),
        }))
    }

    async fn shortest_path(
        &self,
        edition_id: EditionId,
        from: &str,
        to: &str,
    ) -> Result<Option<BracketPath>> {
        // shortestPath rejects identical endpoints
        if from == to {
            return Ok(self
                .find_team(edition_id, from)
                .await?
                .map(|team| BracketPath {
                    teams: vec![team.display_name],
                    matches: Vec::new(),
                }));
        }

        let q = query(SHORTEST_PATH_CYPHER)
            .param("edition_id", edition_id)
            .param("from", from)
            .param("to", to);
        let Some(row) = self.first_row(q).await? else {
            return Ok(None);
        };

        let teams: Vec<String> = column(&row, "teams")?;
        let phases: Vec<String> = column(&row, "phases")?;
        let match_ids: Vec<i64> = column(&row, "match_ids")?;
        if phases.len() != match_ids.len() || teams.len() != phases.len() + 1 {
            return Err(StorageError::decode(format!(
                "malformed path: {} teams, {} phases, {} matches",
                teams.len(),
                phases.len(),
                match_ids.len()
            )));
        }

        let matches = phases
            .into_iter()
            .zip(match_ids)
            .map(|(phase, match_id)| PathLeg { phase, match_id })
            .collect();
        Ok(Some(BracketPath { teams, matches }))
    }

    async fn summary(&self, edition_id: EditionId) -> Result<GraphSummary> {
        let row = self
            .first_row(query(SUMMARY_CYPHER).param("edition_id", edition_id))
            .await?;
        let Some(row) = row else {
            return Ok(GraphSummary::default());
        };
        Ok(GraphSummary {
            teams: column::<i64>(&row, "teams")?.max(0) as usize,
            matches: column::<i64>(&row, "matches")?.max(0) as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_statement_is_edition_scoped() {
        for cypher in [
            PURGE_CYPHER,
            MERGE_TEAM_CYPHER,
            MERGE_MATCH_CYPHER,
            FIND_TEAM_CYPHER,
            SHORTEST_PATH_CYPHER,
            SUMMARY_CYPHER,
        ] {
            assert!(cypher.contains("$edition_id"), "unscoped: {}", cypher);
        }
    }

    #[test]
    fn test_merges_only_set_properties_on_create() {
        assert!(MERGE_TEAM_CYPHER.contains("ON CREATE SET t.displayName"));
        assert!(MERGE_MATCH_CYPHER.contains("ON CREATE SET r.phase"));
        assert!(!MERGE_MATCH_CYPHER.contains("ON MATCH"));
    }

    #[test]
    fn test_path_endpoints_pick_lowest_team_id() {
        let from = SHORTEST_PATH_CYPHER
            .find("WITH a ORDER BY a.teamId LIMIT 1")
            .expect("source endpoint ordered by team id");
        let to = SHORTEST_PATH_CYPHER
            .find("WITH a, b ORDER BY b.teamId LIMIT 1")
            .expect("target endpoint ordered by team id");
        let path = SHORTEST_PATH_CYPHER
            .find("shortestPath")
            .expect("path match");
        assert!(from < to && to < path);
        assert!(FIND_TEAM_CYPHER.contains("ORDER BY t.teamId LIMIT 1"));
    }
}
