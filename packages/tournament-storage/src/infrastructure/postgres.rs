//! PostgreSQL source adapter
//!
//! Reads the tournament stored functions and the knockout edge view through a
//! small `sqlx` pool. Rows are decoded by position, because the functions
//! return `SETOF record` shapes whose column names differ between deployments.
//!
//! Integer columns are accepted as `int2`, `int4` or `int8`, and date columns
//! as `timestamptz`, `timestamp` or `date` (midnight UTC).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};
use std::time::Duration;
use tracing::debug;

use crate::domain::*;
use crate::error::{ErrorKind, Result, StorageError};

const STANDINGS_SQL: &str = "SELECT * FROM get_tabla_posiciones_grupo($1, $2)";
const POPULARITY_SQL: &str = "SELECT * FROM get_partidos_grupo_por_popularidad($1, $2)";
const TEAM_GOALS_SQL: &str = "SELECT * FROM get_goles_por_seleccion_edicion($1)";
const VENUE_SQL: &str = "SELECT * FROM get_partidos_por_anio_estadio($1, $2)";
const KNOCKOUT_SCORERS_SQL: &str = "SELECT * FROM get_goleadores_fases_ko($1)";
const REFEREES_SQL: &str = "SELECT * FROM get_arbitros_fases_finales($1)";
const PLAYERS_SQL: &str = "SELECT * FROM get_jugadores_pais_min_goles($1, $2, $3)";
const EDITION_ID_SQL: &str =
    "SELECT DISTINCT id_edicion::bigint FROM vw_partidos_ko_edges WHERE edicion_nombre = $1";
const BRACKET_EDGES_SQL: &str = "SELECT id_edicion::bigint, id_partido::bigint, fase, \
     sel_a::bigint, pais_a, sel_b::bigint, pais_b \
     FROM vw_partidos_ko_edges WHERE id_edicion = $1 ORDER BY id_partido";

/// Standings come back either as the six data columns or with
/// `(edition, group)` prepended. Returns the index of the position column.
pub fn standing_column_offset(column_count: usize) -> Result<usize> {
    match column_count {
        6 => Ok(0),
        8 => Ok(2),
        n => Err(StorageError::decode(format!(
            "standings row has {} columns, expected 6 or 8",
            n
        ))),
    }
}

fn int_at(row: &PgRow, idx: usize) -> Result<i64> {
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Ok(v);
    }
    if let Ok(v) = row.try_get::<i32, _>(idx) {
        return Ok(v as i64);
    }
    row.try_get::<i16, _>(idx)
        .map(|v| v as i64)
        .map_err(|e| StorageError::from_driver(ErrorKind::Decode, &format!("column {}", idx), e))
}

fn i32_at(row: &PgRow, idx: usize) -> Result<i32> {
    let wide = int_at(row, idx)?;
    i32::try_from(wide)
        .map_err(|_| StorageError::decode(format!("column {} out of range: {}", idx, wide)))
}

fn text_at(row: &PgRow, idx: usize) -> Result<String> {
    row.try_get::<String, _>(idx)
        .map_err(|e| StorageError::from_driver(ErrorKind::Decode, &format!("column {}", idx), e))
}

fn timestamp_at(row: &PgRow, idx: usize) -> Result<Option<DateTime<Utc>>> {
    if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
        return Ok(v);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return Ok(v.map(|naive| naive.and_utc()));
    }
    row.try_get::<Option<NaiveDate>, _>(idx)
        .map(|v| v.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|naive| naive.and_utc()))
        .map_err(|e| StorageError::from_driver(ErrorKind::Decode, &format!("column {}", idx), e))
}

fn required_timestamp_at(row: &PgRow, idx: usize) -> Result<DateTime<Utc>> {
    timestamp_at(row, idx)?
        .ok_or_else(|| StorageError::decode(format!("column {} is null", idx)))
}

fn decode_all<T>(rows: &[PgRow], f: impl Fn(&PgRow) -> Result<T>) -> Result<Vec<T>> {
    rows.iter().map(f).collect()
}

/// Read-only handle on the authoritative database
pub struct PostgresSource {
    pool: PgPool,
}

impl PostgresSource {
    /// Opens a small pool; `connect_timeout` bounds the first acquire.
    pub async fn connect(database_url: &str, connect_timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .min_connections(1)
            .acquire_timeout(connect_timeout)
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| {
                StorageError::from_driver(ErrorKind::Connection, "Failed to connect to PostgreSQL", e)
            })?;

        debug!("PostgreSQL pool ready");
        Ok(Self { pool })
    }

    async fn fetch(&self, query: Query<'_, Postgres, PgArguments>) -> Result<Vec<PgRow>> {
        Ok(query.fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl BackingStore for PostgresSource {
    fn kind(&self) -> StoreKind {
        StoreKind::Relational
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[async_trait]
impl RelationalSource for PostgresSource {
    async fn group_standings(&self, edition: &str, group: &str) -> Result<Vec<StandingRow>> {
        let rows = self
            .fetch(sqlx::query(STANDINGS_SQL).bind(edition).bind(group))
            .await?;
        decode_all(&rows, |row| {
            let at = standing_column_offset(row.len())?;
            Ok(StandingRow {
                position: i32_at(row, at)?,
                country: text_at(row, at + 1)?,
                points: i32_at(row, at + 2)?,
                goals_for: i32_at(row, at + 3)?,
                goals_against: i32_at(row, at + 4)?,
                goal_diff: i32_at(row, at + 5)?,
            })
        })
    }

    async fn match_popularity(&self, edition: &str, group: &str) -> Result<Vec<PopularityRow>> {
        let rows = self
            .fetch(sqlx::query(POPULARITY_SQL).bind(edition).bind(group))
            .await?;
        decode_all(&rows, |row| {
            Ok(PopularityRow {
                match_id: i32_at(row, 0)?,
                kickoff: timestamp_at(row, 1)?,
                venue: text_at(row, 2)?,
                local_team: text_at(row, 3)?,
                visitor_team: text_at(row, 4)?,
                popularity: i32_at(row, 5)?,
            })
        })
    }

    async fn goals_by_team(&self, edition: &str) -> Result<Vec<TeamGoalsRow>> {
        let rows = self.fetch(sqlx::query(TEAM_GOALS_SQL).bind(edition)).await?;
        // (edition, team, goals)
        decode_all(&rows, |row| {
            Ok(TeamGoalsRow {
                team: text_at(row, 1)?,
                goals: i32_at(row, 2)?,
            })
        })
    }

    async fn matches_by_year_venue(&self, year: i32, venue: &str) -> Result<Vec<VenueMatchRow>> {
        let rows = self.fetch(sqlx::query(VENUE_SQL).bind(year).bind(venue)).await?;
        decode_all(&rows, |row| {
            Ok(VenueMatchRow {
                match_id: i32_at(row, 0)?,
                played_at: required_timestamp_at(row, 1)?,
                venue: text_at(row, 2)?,
                local_team: text_at(row, 3)?,
                visitor_team: text_at(row, 4)?,
                local_goals: i32_at(row, 5)?,
                visitor_goals: i32_at(row, 6)?,
            })
        })
    }

    async fn knockout_scorers(&self, edition: &str) -> Result<Vec<KnockoutScorerRow>> {
        let rows = self
            .fetch(sqlx::query(KNOCKOUT_SCORERS_SQL).bind(edition))
            .await?;
        decode_all(&rows, |row| {
            Ok(KnockoutScorerRow {
                player_id: i32_at(row, 0)?,
                first_name: text_at(row, 1)?,
                last_name: text_at(row, 2)?,
                country: text_at(row, 3)?,
                knockout_goals: i32_at(row, 4)?,
            })
        })
    }

    async fn final_phase_referees(&self, edition: &str) -> Result<Vec<RefereeRow>> {
        let rows = self.fetch(sqlx::query(REFEREES_SQL).bind(edition)).await?;
        // (edition, phase, match_id, local, visitor, referee, role)
        decode_all(&rows, |row| {
            Ok(RefereeRow {
                phase: text_at(row, 1)?,
                match_id: i32_at(row, 2)?,
                local_team: text_at(row, 3)?,
                visitor_team: text_at(row, 4)?,
                referee: text_at(row, 5)?,
                role: text_at(row, 6)?,
            })
        })
    }

    async fn players_min_goals(
        &self,
        edition: &str,
        country: &str,
        min_goals: i32,
    ) -> Result<Vec<PlayerGoalsRow>> {
        let rows = self
            .fetch(
                sqlx::query(PLAYERS_SQL)
                    .bind(edition)
                    .bind(country)
                    .bind(min_goals),
            )
            .await?;
        decode_all(&rows, |row| {
            Ok(PlayerGoalsRow {
                player_id: i32_at(row, 0)?,
                first_name: text_at(row, 1)?,
                last_name: text_at(row, 2)?,
                country: text_at(row, 3)?,
                goals_total: i32_at(row, 4)?,
            })
        })
    }

    async fn resolve_edition_id(&self, label: &str) -> Result<Option<EditionId>> {
        let rows = self.fetch(sqlx::query(EDITION_ID_SQL).bind(label)).await?;
        if rows.len() > 1 {
            return Err(StorageError::decode(format!(
                "edition label {:?} maps to {} ids",
                label,
                rows.len()
            )));
        }
        rows.first().map(|row| int_at(row, 0)).transpose()
    }

    async fn bracket_edges(&self, edition_id: EditionId) -> Result<Vec<BracketEdgeRow>> {
        let rows = self
            .fetch(sqlx::query(BRACKET_EDGES_SQL).bind(edition_id))
            .await?;
        decode_all(&rows, |row| {
            Ok(BracketEdgeRow {
                edition_id: int_at(row, 0)?,
                match_id: int_at(row, 1)?,
                phase: text_at(row, 2)?,
                team_a: int_at(row, 3)?,
                name_a: text_at(row, 4)?,
                team_b: int_at(row, 5)?,
                name_b: text_at(row, 6)?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standing_column_offset() {
        assert_eq!(standing_column_offset(6).unwrap(), 0);
        assert_eq!(standing_column_offset(8).unwrap(), 2);

        let err = standing_column_offset(7).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
        assert!(err.message.contains("7 columns"));
    }

    #[test]
    fn test_edge_query_casts_ids() {
        assert!(BRACKET_EDGES_SQL.contains("id_edicion::bigint"));
        assert!(BRACKET_EDGES_SQL.contains("WHERE id_edicion = $1"));
        assert!(EDITION_ID_SQL.starts_with("SELECT DISTINCT"));
    }
}
