//! Domain records
//!
//! Two families of types live here:
//!
//! - **Source rows** (`*Row`): the typed extraction contract of the primary
//!   relational store. Adapters decode driver rows into these, so shape
//!   differences between deployments never reach the transform layer.
//! - **Target records**: what each secondary store persists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Stable numeric edition identity (the only cross-store join key)
pub type EditionId = i64;

/// Lease applied to journalist sessions on create and on renew
pub const SESSION_LEASE: Duration = Duration::from_secs(7200);

/// Tournament edition: human label plus resolved numeric id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edition {
    pub id: EditionId,
    pub label: String,
}

impl Edition {
    pub fn new(id: EditionId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.label, self.id)
    }
}

/// Partition scope shared by standings and popularity tables
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupPartition {
    pub edition: String,
    pub group: String,
}

impl GroupPartition {
    pub fn new(edition: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            edition: edition.into(),
            group: group.into(),
        }
    }
}

impl fmt::Display for GroupPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / group {}", self.edition, self.group)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Source rows (primary relational store)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingRow {
    pub position: i32,
    pub country: String,
    pub points: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_diff: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopularityRow {
    pub match_id: i32,
    pub kickoff: Option<DateTime<Utc>>,
    pub venue: String,
    pub local_team: String,
    pub visitor_team: String,
    pub popularity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamGoalsRow {
    pub team: String,
    pub goals: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueMatchRow {
    pub match_id: i32,
    pub played_at: DateTime<Utc>,
    pub venue: String,
    pub local_team: String,
    pub visitor_team: String,
    pub local_goals: i32,
    pub visitor_goals: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnockoutScorerRow {
    pub player_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub knockout_goals: i32,
}

/// One referee assignment of one final-phase match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefereeRow {
    pub phase: String,
    pub match_id: i32,
    pub local_team: String,
    pub visitor_team: String,
    pub referee: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerGoalsRow {
    pub player_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub goals_total: i32,
}

/// One knockout match as exposed by the relational edge view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketEdgeRow {
    pub edition_id: EditionId,
    pub match_id: i64,
    pub phase: String,
    pub team_a: i64,
    pub name_a: String,
    pub team_b: i64,
    pub name_b: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// Wide-column records
// ═══════════════════════════════════════════════════════════════════════════

/// Key: ((edition, group), position)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStanding {
    pub edition: String,
    pub group: String,
    pub position: i32,
    pub country: String,
    pub points: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_diff: i32,
}

impl GroupStanding {
    pub fn partition(&self) -> GroupPartition {
        GroupPartition::new(&self.edition, &self.group)
    }
}

/// Key: ((edition, group), popularity, match_id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPopularity {
    pub edition: String,
    pub group: String,
    pub popularity: i32,
    pub match_id: i32,
    pub kickoff: Option<DateTime<Utc>>,
    pub venue: String,
    pub local_team: String,
    pub visitor_team: String,
}

impl MatchPopularity {
    pub fn partition(&self) -> GroupPartition {
        GroupPartition::new(&self.edition, &self.group)
    }
}

/// Key: ((edition), team)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamGoals {
    pub edition: String,
    pub team: String,
    pub goals: i32,
}

/// Read-time ranking of [`TeamGoals`] (1-based)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedTeamGoals {
    pub rank: usize,
    pub team: String,
    pub goals: i32,
}

/// Key: ((venue), played_at, match_id). The edition is deliberately not part
/// of the partition: same-named venues across editions share it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueMatch {
    pub venue: String,
    pub played_at: DateTime<Utc>,
    pub match_id: i32,
    pub local_team: String,
    pub visitor_team: String,
    pub local_goals: i32,
    pub visitor_goals: i32,
}

/// Key: ((edition), knockout_goals, player_id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnockoutScorer {
    pub edition: String,
    pub knockout_goals: i32,
    pub player_id: i32,
    pub last_name: String,
    pub first_name: String,
    pub country: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// Document records
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefereeAssignment {
    pub name: String,
    pub role: String,
}

/// One document per (edition, match)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefereePanel {
    pub edition: String,
    pub phase: String,
    pub match_id: i32,
    pub local_team: String,
    pub visitor_team: String,
    pub referees: Vec<RefereeAssignment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorerEntry {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub goals_total: i32,
}

/// One document per (edition, country), replaced wholesale on each load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamScorersDoc {
    pub edition: String,
    pub country: String,
    pub players: Vec<ScorerEntry>,
    pub updated_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Bracket graph records
// ═══════════════════════════════════════════════════════════════════════════

/// `Team` node, keyed by (team_id, edition_id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamNode {
    pub team_id: i64,
    pub edition_id: EditionId,
    pub display_name: String,
}

/// `PLAYS_AGAINST` relationship, keyed by (match_id, edition_id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEdge {
    pub match_id: i64,
    pub edition_id: EditionId,
    pub phase: String,
    pub team_a: i64,
    pub team_b: i64,
}

/// One traversed edge of a bracket path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathLeg {
    pub phase: String,
    pub match_id: i64,
}

/// Shortest route between two teams; `matches[i]` joins `teams[i]` and
/// `teams[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketPath {
    pub teams: Vec<String>,
    pub matches: Vec<PathLeg>,
}

impl BracketPath {
    /// Number of matches traversed (zero when both ends are the same team)
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn match_ids(&self) -> Vec<i64> {
        self.matches.iter().map(|leg| leg.match_id).collect()
    }
}

/// Node and edge counts for one edition's slice of the graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphSummary {
    pub teams: usize,
    pub matches: usize,
}

// ═══════════════════════════════════════════════════════════════════════════
// Sessions
// ═══════════════════════════════════════════════════════════════════════════

/// Builds `session:journalist:<normalized-name>`.
///
/// The name is trimmed, lower-cased, and every whitespace run becomes `_`.
pub fn journalist_session_key(name: &str) -> String {
    let normalized = name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    format!("session:journalist:{}", normalized)
}
