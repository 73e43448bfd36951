//! Cassandra / Scylla wide-column adapter (`scylla` driver)

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use scylla::frame::value::CqlTimestamp;
use scylla::serialize::row::SerializeRow;
use scylla::transport::query_result::QueryResult;
use scylla::{Session, SessionBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::domain::*;
use crate::error::{ErrorKind, Result, StorageError};
use crate::schema;

fn to_cql(ts: DateTime<Utc>) -> CqlTimestamp {
    CqlTimestamp(ts.timestamp_millis())
}

fn from_cql(ts: CqlTimestamp) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ts.0)
        .single()
        .ok_or_else(|| StorageError::decode(format!("timestamp out of range: {}", ts.0)))
}

fn typed_rows<R: scylla::FromRow>(result: QueryResult, table: &str) -> Result<Vec<R>> {
    result
        .rows_typed::<R>()
        .map_err(|e| StorageError::from_driver(ErrorKind::Decode, table, e))?
        .map(|row| row.map_err(|e| StorageError::from_driver(ErrorKind::Decode, table, e)))
        .collect()
}

pub struct CassandraStore {
    session: Session,
    keyspace: String,
    closed: AtomicBool,
}

impl CassandraStore {
    pub async fn connect(
        host: &str,
        port: u16,
        keyspace: &str,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let session = SessionBuilder::new()
            .known_node(format!("{}:{}", host, port))
            .connection_timeout(connect_timeout)
            .build()
            .await?;

        debug!(host, port, keyspace, "Cassandra session ready");
        Ok(Self {
            session,
            keyspace: keyspace.to_string(),
            closed: AtomicBool::new(false),
        })
    }

    fn guard(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::closed(StoreKind::WideColumn.as_str()));
        }
        Ok(())
    }

    async fn select(&self, cql: &str, values: impl SerializeRow) -> Result<QueryResult> {
        self.guard()?;
        Ok(self.session.query(cql, values).await?)
    }

    async fn count(&self, cql: &str, values: impl SerializeRow) -> Result<u64> {
        let result = self.select(cql, values).await?;
        let (n,): (i64,) = result
            .single_row_typed()
            .map_err(|e| StorageError::from_driver(ErrorKind::Decode, "count", e))?;
        Ok(n.max(0) as u64)
    }

    async fn mutate(&self, cql: &str, values: impl SerializeRow) -> Result<()> {
        self.guard()?;
        self.session
            .query(cql, values)
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Write, cql, e))?;
        Ok(())
    }

    /// Prepares `cql` once and executes it for each row
    async fn write_each<T, V>(&self, cql: &str, rows: &[T], bind: impl Fn(&T) -> V) -> Result<u64>
    where
        V: SerializeRow,
    {
        self.guard()?;
        let prepared = self
            .session
            .prepare(cql)
            .await
            .map_err(|e| StorageError::from_driver(ErrorKind::Write, cql, e))?;
        for row in rows {
            self.session
                .execute(&prepared, bind(row))
                .await
                .map_err(|e| StorageError::from_driver(ErrorKind::Write, cql, e))?;
        }
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl BackingStore for CassandraStore {
    fn kind(&self) -> StoreKind {
        StoreKind::WideColumn
    }

    async fn ping(&self) -> Result<()> {
        self.select("SELECT release_version FROM system.local", ())
            .await
            .map(|_| ())
            .map_err(|e| StorageError::connection(e.message))
    }

    async fn close(&self) -> Result<()> {
        // The driver tears its pools down on drop
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl WideColumnStore for CassandraStore {
    async fn ensure_schema(&self) -> Result<()> {
        self.mutate(&schema::create_keyspace(&self.keyspace), ())
            .await?;
        self.session.use_keyspace(&self.keyspace, false).await?;
        for ddl in schema::table_statements() {
            self.mutate(ddl, ()).await?;
        }
        debug!(keyspace = %self.keyspace, "Wide-column schema ensured");
        Ok(())
    }

    async fn delete_standings(&self, partition: &GroupPartition) -> Result<u64> {
        let key = (partition.edition.as_str(), partition.group.as_str());
        let existing = self
            .count(
                "SELECT COUNT(*) FROM group_standings WHERE edition = ? AND group_name = ?",
                key,
            )
            .await?;
        self.mutate(
            "DELETE FROM group_standings WHERE edition = ? AND group_name = ?",
            key,
        )
        .await?;
        Ok(existing)
    }

    async fn insert_standings(&self, rows: &[GroupStanding]) -> Result<u64> {
        self.write_each(
            "INSERT INTO group_standings \
             (edition, group_name, position, country, points, goals_for, goals_against, goal_diff) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            rows,
            |r| {
                (
                    r.edition.clone(),
                    r.group.clone(),
                    r.position,
                    r.country.clone(),
                    r.points,
                    r.goals_for,
                    r.goals_against,
                    r.goal_diff,
                )
            },
        )
        .await
    }

    async fn read_standings(&self, partition: &GroupPartition) -> Result<Vec<GroupStanding>> {
        let result = self
            .select(
                "SELECT position, country, points, goals_for, goals_against, goal_diff \
                 FROM group_standings WHERE edition = ? AND group_name = ?",
                (partition.edition.as_str(), partition.group.as_str()),
            )
            .await?;
        let rows: Vec<(i32, String, i32, i32, i32, i32)> = typed_rows(result, "group_standings")?;
        Ok(rows
            .into_iter()
            .map(|(position, country, points, gf, ga, gd)| GroupStanding {
                edition: partition.edition.clone(),
                group: partition.group.clone(),
                position,
                country,
                points,
                goals_for: gf,
                goals_against: ga,
                goal_diff: gd,
            })
            .collect())
    }

    async fn delete_popularity(&self, partition: &GroupPartition) -> Result<u64> {
        let key = (partition.edition.as_str(), partition.group.as_str());
        let existing = self
            .count(
                "SELECT COUNT(*) FROM match_popularity WHERE edition = ? AND group_name = ?",
                key,
            )
            .await?;
        self.mutate(
            "DELETE FROM match_popularity WHERE edition = ? AND group_name = ?",
            key,
        )
        .await?;
        Ok(existing)
    }

    async fn insert_popularity(&self, rows: &[MatchPopularity]) -> Result<u64> {
        self.write_each(
            "INSERT INTO match_popularity \
             (edition, group_name, popularity, match_id, kickoff, venue, local_team, visitor_team) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            rows,
            |r| {
                (
                    r.edition.clone(),
                    r.group.clone(),
                    r.popularity,
                    r.match_id,
                    r.kickoff.map(to_cql),
                    r.venue.clone(),
                    r.local_team.clone(),
                    r.visitor_team.clone(),
                )
            },
        )
        .await
    }

    async fn read_popularity(&self, partition: &GroupPartition) -> Result<Vec<MatchPopularity>> {
        let result = self
            .select(
                "SELECT popularity, match_id, kickoff, venue, local_team, visitor_team \
                 FROM match_popularity WHERE edition = ? AND group_name = ?",
                (partition.edition.as_str(), partition.group.as_str()),
            )
            .await?;
        let rows: Vec<(i32, i32, Option<CqlTimestamp>, String, String, String)> =
            typed_rows(result, "match_popularity")?;
        rows.into_iter()
            .map(|(popularity, match_id, kickoff, venue, local, visitor)| {
                Ok(MatchPopularity {
                    edition: partition.edition.clone(),
                    group: partition.group.clone(),
                    popularity,
                    match_id,
                    kickoff: kickoff.map(from_cql).transpose()?,
                    venue,
                    local_team: local,
                    visitor_team: visitor,
                })
            })
            .collect()
    }

    async fn upsert_team_goals(&self, rows: &[TeamGoals]) -> Result<u64> {
        self.write_each(
            "INSERT INTO team_goals (edition, team, goals) VALUES (?, ?, ?)",
            rows,
            |r| (r.edition.clone(), r.team.clone(), r.goals),
        )
        .await
    }

    async fn read_team_goals(&self, edition: &str) -> Result<Vec<TeamGoals>> {
        let result = self
            .select("SELECT team, goals FROM team_goals WHERE edition = ?", (edition,))
            .await?;
        let rows: Vec<(String, i32)> = typed_rows(result, "team_goals")?;
        Ok(rows
            .into_iter()
            .map(|(team, goals)| TeamGoals {
                edition: edition.to_string(),
                team,
                goals,
            })
            .collect())
    }

    async fn upsert_venue_matches(&self, rows: &[VenueMatch]) -> Result<u64> {
        self.write_each(
            "INSERT INTO matches_by_venue \
             (venue, played_at, match_id, local_team, visitor_team, local_goals, visitor_goals) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            rows,
            |r| {
                (
                    r.venue.clone(),
                    to_cql(r.played_at),
                    r.match_id,
                    r.local_team.clone(),
                    r.visitor_team.clone(),
                    r.local_goals,
                    r.visitor_goals,
                )
            },
        )
        .await
    }

    async fn read_venue_matches(&self, venue: &str) -> Result<Vec<VenueMatch>> {
        let result = self
            .select(
                "SELECT played_at, match_id, local_team, visitor_team, local_goals, visitor_goals \
                 FROM matches_by_venue WHERE venue = ?",
                (venue,),
            )
            .await?;
        let rows: Vec<(CqlTimestamp, i32, String, String, i32, i32)> =
            typed_rows(result, "matches_by_venue")?;
        rows.into_iter()
            .map(|(played_at, match_id, local, visitor, lg, vg)| {
                Ok(VenueMatch {
                    venue: venue.to_string(),
                    played_at: from_cql(played_at)?,
                    match_id,
                    local_team: local,
                    visitor_team: visitor,
                    local_goals: lg,
                    visitor_goals: vg,
                })
            })
            .collect()
    }

    async fn upsert_knockout_scorers(&self, rows: &[KnockoutScorer]) -> Result<u64> {
        self.write_each(
            "INSERT INTO knockout_scorers \
             (edition, knockout_goals, player_id, last_name, first_name, country) \
             VALUES (?, ?, ?, ?, ?, ?)",
            rows,
            |r| {
                (
                    r.edition.clone(),
                    r.knockout_goals,
                    r.player_id,
                    r.last_name.clone(),
                    r.first_name.clone(),
                    r.country.clone(),
                )
            },
        )
        .await
    }

    async fn read_knockout_scorers(&self, edition: &str) -> Result<Vec<KnockoutScorer>> {
        let result = self
            .select(
                "SELECT knockout_goals, player_id, last_name, first_name, country \
                 FROM knockout_scorers WHERE edition = ?",
                (edition,),
            )
            .await?;
        let rows: Vec<(i32, i32, String, String, String)> =
            typed_rows(result, "knockout_scorers")?;
        Ok(rows
            .into_iter()
            .map(|(goals, player_id, last_name, first_name, country)| KnockoutScorer {
                edition: edition.to_string(),
                knockout_goals: goals,
                player_id,
                last_name,
                first_name,
                country,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_conversion_keeps_millis() {
        let ts = Utc.with_ymd_and_hms(2030, 6, 14, 18, 30, 0).unwrap();
        assert_eq!(from_cql(to_cql(ts)).unwrap(), ts);
    }
}
