//! Wide-column double
//!
//! Each table is a `BTreeMap` keyed by its full primary key, with
//! `Reverse` on descending clustering columns, so iteration order equals
//! clustering order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::BTreeMap;

use super::{Faults, MemoryHandle};
use crate::domain::*;
use crate::error::{Result, StorageError};
use crate::schema;

type StandingKey = (GroupPartition, i32);
type PopularityKey = (GroupPartition, Reverse<i32>, i32);
type VenueKey = (String, DateTime<Utc>, i32);
type ScorerKey = (String, Reverse<i32>, i32);

#[derive(Default)]
struct Tables {
    schema_ready: bool,
    bootstraps: usize,
    standings: BTreeMap<StandingKey, GroupStanding>,
    popularity: BTreeMap<PopularityKey, MatchPopularity>,
    team_goals: BTreeMap<(String, String), TeamGoals>,
    venue_matches: BTreeMap<VenueKey, VenueMatch>,
    knockout_scorers: BTreeMap<ScorerKey, KnockoutScorer>,
}

impl Tables {
    fn ready(&self, table: &str) -> Result<()> {
        if self.schema_ready {
            Ok(())
        } else {
            Err(StorageError::query(format!("unconfigured table {}", table)))
        }
    }
}

pub struct InMemoryWideColumn {
    handle: MemoryHandle<Tables>,
}

impl Default for InMemoryWideColumn {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWideColumn {
    pub fn new() -> Self {
        Self {
            handle: MemoryHandle::new(StoreKind::WideColumn, Tables::default()),
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

    /// How many times `ensure_schema` ran against this store
    pub fn schema_bootstraps(&self) -> usize {
        self.handle.admin(|t| t.bootstraps)
    }
}

#[async_trait]
impl BackingStore for InMemoryWideColumn {
    fn kind(&self) -> StoreKind {
        StoreKind::WideColumn
    }

    async fn ping(&self) -> Result<()> {
        self.handle.ping()
    }

    async fn close(&self) -> Result<()> {
        self.handle.close()
    }
}

#[async_trait]
impl WideColumnStore for InMemoryWideColumn {
    async fn ensure_schema(&self) -> Result<()> {
        self.handle.ping()?;
        self.handle.admin(|t| {
            t.schema_ready = true;
            t.bootstraps += 1;
        });
        Ok(())
    }

    async fn delete_standings(&self, partition: &GroupPartition) -> Result<u64> {
        self.handle.write(|t| {
            t.ready(schema::TABLES[0])?;
            let before = t.standings.len();
            t.standings.retain(|(p, _), _| p != partition);
            Ok((before - t.standings.len()) as u64)
        })
    }

    async fn insert_standings(&self, rows: &[GroupStanding]) -> Result<u64> {
        self.handle.write(|t| {
            t.ready(schema::TABLES[0])?;
            for row in rows {
                t.standings
                    .insert((row.partition(), row.position), row.clone());
            }
            Ok(rows.len() as u64)
        })
    }

    async fn read_standings(&self, partition: &GroupPartition) -> Result<Vec<GroupStanding>> {
        self.handle.read(|t| {
            t.ready(schema::TABLES[0])?;
            Ok(t.standings
                .iter()
                .filter(|((p, _), _)| p == partition)
                .map(|(_, row)| row.clone())
                .collect())
        })
    }

    async fn delete_popularity(&self, partition: &GroupPartition) -> Result<u64> {
        self.handle.write(|t| {
            t.ready(schema::TABLES[1])?;
            let before = t.popularity.len();
            t.popularity.retain(|(p, _, _), _| p != partition);
            Ok((before - t.popularity.len()) as u64)
        })
    }

    async fn insert_popularity(&self, rows: &[MatchPopularity]) -> Result<u64> {
        self.handle.write(|t| {
            t.ready(schema::TABLES[1])?;
            for row in rows {
                let key = (row.partition(), Reverse(row.popularity), row.match_id);
                t.popularity.insert(key, row.clone());
            }
            Ok(rows.len() as u64)
        })
    }

    async fn read_popularity(&self, partition: &GroupPartition) -> Result<Vec<MatchPopularity>> {
        self.handle.read(|t| {
            t.ready(schema::TABLES[1])?;
            Ok(t.popularity
                .iter()
                .filter(|((p, _, _), _)| p == partition)
                .map(|(_, row)| row.clone())
                .collect())
        })
    }

    async fn upsert_team_goals(&self, rows: &[TeamGoals]) -> Result<u64> {
        self.handle.write(|t| {
            t.ready(schema::TABLES[2])?;
            for row in rows {
                let key = (row.edition.clone(), row.team.clone());
                t.team_goals.insert(key, row.clone());
            }
            Ok(rows.len() as u64)
        })
    }

    async fn read_team_goals(&self, edition: &str) -> Result<Vec<TeamGoals>> {
        self.handle.read(|t| {
            t.ready(schema::TABLES[2])?;
            Ok(t.team_goals
                .values()
                .filter(|row| row.edition == edition)
                .cloned()
                .collect())
        })
    }

    async fn upsert_venue_matches(&self, rows: &[VenueMatch]) -> Result<u64> {
        self.handle.write(|t| {
            t.ready(schema::TABLES[3])?;
            for row in rows {
                let key = (row.venue.clone(), row.played_at, row.match_id);
                t.venue_matches.insert(key, row.clone());
            }
            Ok(rows.len() as u64)
        })
    }

    async fn read_venue_matches(&self, venue: &str) -> Result<Vec<VenueMatch>> {
        self.handle.read(|t| {
            t.ready(schema::TABLES[3])?;
            Ok(t.venue_matches
                .iter()
                .filter(|((v, _, _), _)| v == venue)
                .map(|(_, row)| row.clone())
                .collect())
        })
    }

    async fn upsert_knockout_scorers(&self, rows: &[KnockoutScorer]) -> Result<u64> {
        self.handle.write(|t| {
            t.ready(schema::TABLES[4])?;
            for row in rows {
                let key = (
                    row.edition.clone(),
                    Reverse(row.knockout_goals),
                    row.player_id,
                );
                t.knockout_scorers.insert(key, row.clone());
            }
            Ok(rows.len() as u64)
        })
    }

    async fn read_knockout_scorers(&self, edition: &str) -> Result<Vec<KnockoutScorer>> {
        self.handle.read(|t| {
            t.ready(schema::TABLES[4])?;
            Ok(t.knockout_scorers
                .iter()
                .filter(|((e, _, _), _)| e == edition)
                .map(|(_, row)| row.clone())
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn standing(edition: &str, group: &str, position: i32, country: &str) -> GroupStanding {
        GroupStanding {
            edition: edition.to_string(),
            group: group.to_string(),
            position,
            country: country.to_string(),
            points: 9 - 3 * position,
            goals_for: 4,
            goals_against: 2,
            goal_diff: 2,
        }
    }

    fn scorer(player_id: i32, goals: i32) -> KnockoutScorer {
        KnockoutScorer {
            edition: "Mundial 2030".to_string(),
            knockout_goals: goals,
            player_id,
            last_name: format!("L{}", player_id),
            first_name: format!("F{}", player_id),
            country: "Chile".to_string(),
        }
    }

    async fn ready_store() -> InMemoryWideColumn {
        let store = InMemoryWideColumn::new();
        store.ensure_schema().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_tables_require_schema() {
        let store = InMemoryWideColumn::new();
        let err = store.read_team_goals("Mundial 2030").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Query);
        assert!(err.message.contains("team_goals"));
    }

    #[tokio::test]
    async fn test_standings_read_in_position_order() {
        let store = ready_store().await;
        let rows = vec![
            standing("Mundial 2030", "A", 3, "Qatar"),
            standing("Mundial 2030", "A", 1, "Ecuador"),
            standing("Mundial 2030", "A", 2, "Senegal"),
        ];
        store.insert_standings(&rows).await.unwrap();

        let partition = GroupPartition::new("Mundial 2030", "A");
        let view = store.read_standings(&partition).await.unwrap();
        let positions: Vec<i32> = view.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_delete_standings_only_touches_partition() {
        let store = ready_store().await;
        store
            .insert_standings(&[
                standing("Mundial 2030", "A", 1, "Ecuador"),
                standing("Mundial 2030", "B", 1, "England"),
            ])
            .await
            .unwrap();

        let deleted = store
            .delete_standings(&GroupPartition::new("Mundial 2030", "A"))
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let other = store
            .read_standings(&GroupPartition::new("Mundial 2030", "B"))
            .await
            .unwrap();
        assert_eq!(other.len(), 1);
    }

    #[tokio::test]
    async fn test_knockout_scorers_clustering_order() {
        let store = ready_store().await;
        store
            .upsert_knockout_scorers(&[scorer(9, 2), scorer(3, 2), scorer(5, 4)])
            .await
            .unwrap();

        let view = store.read_knockout_scorers("Mundial 2030").await.unwrap();
        let order: Vec<(i32, i32)> = view
            .iter()
            .map(|s| (s.knockout_goals, s.player_id))
            .collect();
        assert_eq!(order, vec![(4, 5), (2, 3), (2, 9)]);
    }

    #[tokio::test]
    async fn test_team_goals_upsert_overwrites() {
        let store = ready_store().await;
        let row = |goals| TeamGoals {
            edition: "Mundial 2030".to_string(),
            team: "Japan".to_string(),
            goals,
        };
        store.upsert_team_goals(&[row(3)]).await.unwrap();
        store.upsert_team_goals(&[row(5)]).await.unwrap();

        let view = store.read_team_goals("Mundial 2030").await.unwrap();
        assert_eq!(view, vec![row(5)]);
        assert_eq!(store.faults().mutations(), 2);
    }

    #[tokio::test]
    async fn test_reopen_shares_tables_and_bootstraps() {
        let store = ready_store().await;
        store
            .insert_standings(&[standing("Mundial 2030", "C", 1, "Peru")])
            .await
            .unwrap();
        store.close().await.unwrap();

        let reopened = store.reopen();
        reopened.ensure_schema().await.unwrap();
        assert_eq!(reopened.schema_bootstraps(), 2);

        let view = reopened
            .read_standings(&GroupPartition::new("Mundial 2030", "C"))
            .await
            .unwrap();
        assert_eq!(view.len(), 1);
    }
}
