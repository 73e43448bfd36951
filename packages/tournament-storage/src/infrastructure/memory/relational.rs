//! Seedable stand-in for the primary relational store

use async_trait::async_trait;
use std::collections::HashMap;

use super::{Faults, MemoryHandle};
use crate::domain::*;
use crate::error::Result;

#[derive(Default)]
struct Fixtures {
    standings: HashMap<(String, String), Vec<StandingRow>>,
    popularity: HashMap<(String, String), Vec<PopularityRow>>,
    team_goals: HashMap<String, Vec<TeamGoalsRow>>,
    venue_matches: HashMap<(i32, String), Vec<VenueMatchRow>>,
    knockout_scorers: HashMap<String, Vec<KnockoutScorerRow>>,
    referees: HashMap<String, Vec<RefereeRow>>,
    players: HashMap<(String, String), Vec<PlayerGoalsRow>>,
    bracket_edges: Vec<(String, BracketEdgeRow)>,
    bare_editions: Vec<(String, EditionId)>,
}

/// Read-only relational source backed by seeded fixture rows.
///
/// Rows are returned exactly as seeded, the way a stored function returns
/// them. Only `players_min_goals` applies its threshold, as the SQL function
/// does.
pub struct InMemoryRelational {
    handle: MemoryHandle<Fixtures>,
}

impl Default for InMemoryRelational {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRelational {
    pub fn new() -> Self {
        Self {
            handle: MemoryHandle::new(StoreKind::Relational, Fixtures::default()),
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

    pub fn seed_standings(&self, edition: &str, group: &str, rows: Vec<StandingRow>) {
        self.handle.admin(|f| {
            f.standings
                .insert((edition.to_string(), group.to_string()), rows)
        });
    }

    pub fn seed_popularity(&self, edition: &str, group: &str, rows: Vec<PopularityRow>) {
        self.handle.admin(|f| {
            f.popularity
                .insert((edition.to_string(), group.to_string()), rows)
        });
    }

    pub fn seed_team_goals(&self, edition: &str, rows: Vec<TeamGoalsRow>) {
        self.handle
            .admin(|f| f.team_goals.insert(edition.to_string(), rows));
    }

    pub fn seed_venue_matches(&self, year: i32, venue: &str, rows: Vec<VenueMatchRow>) {
        self.handle
            .admin(|f| f.venue_matches.insert((year, venue.to_string()), rows));
    }

    pub fn seed_knockout_scorers(&self, edition: &str, rows: Vec<KnockoutScorerRow>) {
        self.handle
            .admin(|f| f.knockout_scorers.insert(edition.to_string(), rows));
    }

    pub fn seed_referees(&self, edition: &str, rows: Vec<RefereeRow>) {
        self.handle
            .admin(|f| f.referees.insert(edition.to_string(), rows));
    }

    pub fn seed_players(&self, edition: &str, country: &str, rows: Vec<PlayerGoalsRow>) {
        self.handle.admin(|f| {
            f.players
                .insert((edition.to_string(), country.to_string()), rows)
        });
    }

    /// Adds rows to the knockout edge view under `label`
    pub fn seed_bracket_edges(&self, label: &str, rows: Vec<BracketEdgeRow>) {
        self.handle.admin(|f| {
            f.bracket_edges
                .extend(rows.into_iter().map(|row| (label.to_string(), row)))
        });
    }

    /// Makes `label` resolvable without contributing any edge
    pub fn seed_edition(&self, label: &str, edition_id: EditionId) {
        self.handle
            .admin(|f| f.bare_editions.push((label.to_string(), edition_id)));
    }
}

fn lookup<K, V>(map: &HashMap<K, Vec<V>>, key: &K) -> Vec<V>
where
    K: std::hash::Hash + Eq,
    V: Clone,
{
    map.get(key).cloned().unwrap_or_default()
}

#[async_trait]
impl BackingStore for InMemoryRelational {
    fn kind(&self) -> StoreKind {
        StoreKind::Relational
    }

    async fn ping(&self) -> Result<()> {
        self.handle.ping()
    }

    async fn close(&self) -> Result<()> {
        self.handle.close()
    }
}

#[async_trait]
impl RelationalSource for InMemoryRelational {
    async fn group_standings(&self, edition: &str, group: &str) -> Result<Vec<StandingRow>> {
        let key = (edition.to_string(), group.to_string());
        self.handle.read(|f| Ok(lookup(&f.standings, &key)))
    }

    async fn match_popularity(&self, edition: &str, group: &str) -> Result<Vec<PopularityRow>> {
        let key = (edition.to_string(), group.to_string());
        self.handle.read(|f| Ok(lookup(&f.popularity, &key)))
    }

    async fn goals_by_team(&self, edition: &str) -> Result<Vec<TeamGoalsRow>> {
        self.handle
            .read(|f| Ok(lookup(&f.team_goals, &edition.to_string())))
    }

    async fn matches_by_year_venue(&self, year: i32, venue: &str) -> Result<Vec<VenueMatchRow>> {
        let key = (year, venue.to_string());
        self.handle.read(|f| Ok(lookup(&f.venue_matches, &key)))
    }

    async fn knockout_scorers(&self, edition: &str) -> Result<Vec<KnockoutScorerRow>> {
        self.handle
            .read(|f| Ok(lookup(&f.knockout_scorers, &edition.to_string())))
    }

    async fn final_phase_referees(&self, edition: &str) -> Result<Vec<RefereeRow>> {
        self.handle
            .read(|f| Ok(lookup(&f.referees, &edition.to_string())))
    }

    async fn players_min_goals(
        &self,
        edition: &str,
        country: &str,
        min_goals: i32,
    ) -> Result<Vec<PlayerGoalsRow>> {
        let key = (edition.to_string(), country.to_string());
        self.handle.read(|f| {
            Ok(lookup(&f.players, &key)
                .into_iter()
                .filter(|p| p.goals_total >= min_goals)
                .collect())
        })
    }

    async fn resolve_edition_id(&self, label: &str) -> Result<Option<EditionId>> {
        self.handle.read(|f| {
            let from_edges = f
                .bracket_edges
                .iter()
                .find(|(name, _)| name == label)
                .map(|(_, row)| row.edition_id);
            Ok(from_edges.or_else(|| {
                f.bare_editions
                    .iter()
                    .find(|(name, _)| name == label)
                    .map(|(_, id)| *id)
            }))
        })
    }

    async fn bracket_edges(&self, edition_id: EditionId) -> Result<Vec<BracketEdgeRow>> {
        self.handle.read(|f| {
            Ok(f.bracket_edges
                .iter()
                .filter(|(_, row)| row.edition_id == edition_id)
                .map(|(_, row)| row.clone())
                .collect())
        })
    }
}
