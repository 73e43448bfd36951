//! Port traits, one per backing store
//!
//! Every adapter (live driver or in-memory double) implements [`BackingStore`]
//! plus the port of its store. The orchestration layer only ever talks to
//! these traits.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use super::models::*;
use crate::Result;

/// The five backing stores the replica talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKind {
    Relational,
    WideColumn,
    Document,
    Graph,
    Session,
}

impl StoreKind {
    /// Fixed order used for shutdown and reporting
    pub const ALL: [StoreKind; 5] = [
        StoreKind::Relational,
        StoreKind::WideColumn,
        StoreKind::Document,
        StoreKind::Graph,
        StoreKind::Session,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Relational => "relational",
            StoreKind::WideColumn => "wide_column",
            StoreKind::Document => "document",
            StoreKind::Graph => "graph",
            StoreKind::Session => "session",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle shared by every store handle
#[async_trait]
pub trait BackingStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Cheap round-trip used to decide whether a cached handle is reusable
    async fn ping(&self) -> Result<()>;

    /// Releases driver resources. Calls after the first are no-ops.
    async fn close(&self) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Primary relational store (read-only)
// ═══════════════════════════════════════════════════════════════════════════

/// Named, parametrized reads against the authoritative store.
///
/// An empty `Vec` means "no data" and is never an error.
#[async_trait]
pub trait RelationalSource: BackingStore {
    async fn group_standings(&self, edition: &str, group: &str) -> Result<Vec<StandingRow>>;

    async fn match_popularity(&self, edition: &str, group: &str) -> Result<Vec<PopularityRow>>;

    async fn goals_by_team(&self, edition: &str) -> Result<Vec<TeamGoalsRow>>;

    async fn matches_by_year_venue(&self, year: i32, venue: &str) -> Result<Vec<VenueMatchRow>>;

    async fn knockout_scorers(&self, edition: &str) -> Result<Vec<KnockoutScorerRow>>;

    async fn final_phase_referees(&self, edition: &str) -> Result<Vec<RefereeRow>>;

    async fn players_min_goals(
        &self,
        edition: &str,
        country: &str,
        min_goals: i32,
    ) -> Result<Vec<PlayerGoalsRow>>;

    /// Distinct numeric id of the edition carrying `label`
    async fn resolve_edition_id(&self, label: &str) -> Result<Option<EditionId>>;

    async fn bracket_edges(&self, edition_id: EditionId) -> Result<Vec<BracketEdgeRow>>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Wide-column store
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait WideColumnStore: BackingStore {
    /// Creates the keyspace and all replica tables if absent
    async fn ensure_schema(&self) -> Result<()>;

    // Partition-replaced tables

    /// Removes every standing of the partition, returning how many existed
    async fn delete_standings(&self, partition: &GroupPartition) -> Result<u64>;

    async fn insert_standings(&self, rows: &[GroupStanding]) -> Result<u64>;

    /// Ordered by position ascending
    async fn read_standings(&self, partition: &GroupPartition) -> Result<Vec<GroupStanding>>;

    async fn delete_popularity(&self, partition: &GroupPartition) -> Result<u64>;

    async fn insert_popularity(&self, rows: &[MatchPopularity]) -> Result<u64>;

    /// Ordered by popularity descending, then match id ascending
    async fn read_popularity(&self, partition: &GroupPartition) -> Result<Vec<MatchPopularity>>;

    // Upserted tables

    async fn upsert_team_goals(&self, rows: &[TeamGoals]) -> Result<u64>;

    /// No ordering guarantee
    async fn read_team_goals(&self, edition: &str) -> Result<Vec<TeamGoals>>;

    async fn upsert_venue_matches(&self, rows: &[VenueMatch]) -> Result<u64>;

    /// Ordered by date ascending, then match id ascending
    async fn read_venue_matches(&self, venue: &str) -> Result<Vec<VenueMatch>>;

    async fn upsert_knockout_scorers(&self, rows: &[KnockoutScorer]) -> Result<u64>;

    /// Ordered by knockout goals descending, then player id ascending
    async fn read_knockout_scorers(&self, edition: &str) -> Result<Vec<KnockoutScorer>>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Document store
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait DocumentStore: BackingStore {
    async fn delete_referee_panels(&self, edition: &str) -> Result<u64>;

    async fn insert_referee_panels(&self, panels: &[RefereePanel]) -> Result<u64>;

    /// Sorted by (phase, match id)
    async fn read_referee_panels(&self, edition: &str) -> Result<Vec<RefereePanel>>;

    /// Replaces the (edition, country) document, inserting it when absent
    async fn replace_team_scorers(&self, doc: &TeamScorersDoc) -> Result<()>;

    async fn read_team_scorers(
        &self,
        edition: &str,
        country: &str,
    ) -> Result<Option<TeamScorersDoc>>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Graph store
// ═══════════════════════════════════════════════════════════════════════════

/// Elimination-bracket graph. Every operation is scoped by numeric edition id.
#[async_trait]
pub trait GraphStore: BackingStore {
    /// Deletes every team node of the edition with its incident edges
    async fn purge_edition(&self, edition_id: EditionId) -> Result<u64>;

    /// Creates the node if absent. The display name is only set on creation.
    async fn merge_team(&self, team: &TeamNode) -> Result<()>;

    /// Creates the undirected edge if absent. The phase is only set on creation.
    async fn merge_match(&self, edge: &MatchEdge) -> Result<()>;

    async fn find_team(&self, edition_id: EditionId, name: &str) -> Result<Option<TeamNode>>;

    /// Shortest route between two display names, walking only edges tagged
    /// with `edition_id`
    async fn shortest_path(
        &self,
        edition_id: EditionId,
        from: &str,
        to: &str,
    ) -> Result<Option<BracketPath>>;

    async fn summary(&self, edition_id: EditionId) -> Result<GraphSummary>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Session cache
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait SessionStore: BackingStore {
    async fn put(&self, key: &str, payload: &Value, ttl: Duration) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Resets the TTL; false when the key no longer exists
    async fn renew(&self, key: &str, ttl: Duration) -> Result<bool>;

    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kind_as_str() {
        assert_eq!(StoreKind::Relational.as_str(), "relational");
        assert_eq!(StoreKind::WideColumn.as_str(), "wide_column");
        assert_eq!(StoreKind::Document.as_str(), "document");
        assert_eq!(StoreKind::Graph.as_str(), "graph");
        assert_eq!(StoreKind::Session.as_str(), "session");
    }

    #[test]
    fn test_store_kind_all_order() {
        assert_eq!(StoreKind::ALL.len(), 5);
        assert_eq!(StoreKind::ALL[0], StoreKind::Relational);
        assert_eq!(StoreKind::ALL[4], StoreKind::Session);
        assert_eq!(format!("{}", StoreKind::Graph), "graph");
    }
}
