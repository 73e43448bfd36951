//! Load stage: idempotent writes into the replica stores
//!
//! Partition-replaced targets delete exactly one partition before inserting.
//! Upserted targets overwrite by primary key. A failed write aborts the use
//! case and leaves earlier writes in place.

use std::collections::HashSet;

use tournament_storage::{
    DocumentStore, GraphStore, GroupPartition, GroupStanding, KnockoutScorer, MatchPopularity,
    RefereePanel, StorageError, TeamGoals, TeamScorersDoc, VenueMatch, WideColumnStore,
};
use tracing::{debug, info};

use crate::error::{OrchestratorError, Result};
use crate::stages::transform::BracketMerge;

/// Rows removed and written by one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadCount {
    pub deleted: u64,
    pub written: u64,
}

fn outside_partition(
    target: &'static str,
    partition: &GroupPartition,
    found: &GroupPartition,
) -> OrchestratorError {
    OrchestratorError::load(
        target,
        StorageError::write(format!(
            "record for {} does not belong to partition {}",
            found, partition
        )),
    )
}

pub async fn replace_standings(
    store: &dyn WideColumnStore,
    partition: &GroupPartition,
    rows: &[GroupStanding],
) -> Result<LoadCount> {
    const TARGET: &str = "group_standings";
    if let Some(stray) = rows.iter().find(|r| &r.partition() != partition) {
        return Err(outside_partition(TARGET, partition, &stray.partition()));
    }

    let deleted = store
        .delete_standings(partition)
        .await
        .map_err(|e| OrchestratorError::load(TARGET, e))?;
    let written = store
        .insert_standings(rows)
        .await
        .map_err(|e| OrchestratorError::load(TARGET, e))?;

    info!("Replaced {} ({} deleted, {} written)", partition, deleted, written);
    Ok(LoadCount { deleted, written })
}

pub async fn replace_popularity(
    store: &dyn WideColumnStore,
    partition: &GroupPartition,
    rows: &[MatchPopularity],
) -> Result<LoadCount> {
    const TARGET: &str = "match_popularity";
    if let Some(stray) = rows.iter().find(|r| &r.partition() != partition) {
        return Err(outside_partition(TARGET, partition, &stray.partition()));
    }

    let deleted = store
        .delete_popularity(partition)
        .await
        .map_err(|e| OrchestratorError::load(TARGET, e))?;
    let written = store
        .insert_popularity(rows)
        .await
        .map_err(|e| OrchestratorError::load(TARGET, e))?;

    info!("Replaced popularity of {} ({} deleted, {} written)", partition, deleted, written);
    Ok(LoadCount { deleted, written })
}

pub async fn upsert_team_goals(store: &dyn WideColumnStore, rows: &[TeamGoals]) -> Result<LoadCount> {
    let written = store
        .upsert_team_goals(rows)
        .await
        .map_err(|e| OrchestratorError::load("team_goals", e))?;
    Ok(LoadCount { deleted: 0, written })
}

pub async fn upsert_venue_matches(
    store: &dyn WideColumnStore,
    rows: &[VenueMatch],
) -> Result<LoadCount> {
    let written = store
        .upsert_venue_matches(rows)
        .await
        .map_err(|e| OrchestratorError::load("matches_by_venue", e))?;
    Ok(LoadCount { deleted: 0, written })
}

pub async fn upsert_knockout_scorers(
    store: &dyn WideColumnStore,
    rows: &[KnockoutScorer],
) -> Result<LoadCount> {
    let written = store
        .upsert_knockout_scorers(rows)
        .await
        .map_err(|e| OrchestratorError::load("knockout_scorers", e))?;
    Ok(LoadCount { deleted: 0, written })
}

/// Drops every panel of the edition, then inserts the new ones
pub async fn replace_referee_panels(
    store: &dyn DocumentStore,
    edition: &str,
    panels: &[RefereePanel],
) -> Result<LoadCount> {
    const TARGET: &str = "referee_panels";
    if let Some(stray) = panels.iter().find(|p| p.edition != edition) {
        return Err(OrchestratorError::load(
            TARGET,
            StorageError::write(format!(
                "panel of match {} belongs to edition {}",
                stray.match_id, stray.edition
            )),
        ));
    }

    let deleted = store
        .delete_referee_panels(edition)
        .await
        .map_err(|e| OrchestratorError::load(TARGET, e))?;
    let written = store
        .insert_referee_panels(panels)
        .await
        .map_err(|e| OrchestratorError::load(TARGET, e))?;
    Ok(LoadCount { deleted, written })
}

pub async fn replace_team_scorers(store: &dyn DocumentStore, doc: &TeamScorersDoc) -> Result<LoadCount> {
    store
        .replace_team_scorers(doc)
        .await
        .map_err(|e| OrchestratorError::load("team_scorers", e))?;
    Ok(LoadCount {
        deleted: 0,
        written: 1,
    })
}

pub async fn purge_bracket(store: &dyn GraphStore, edition_id: i64) -> Result<u64> {
    let purged = store
        .purge_edition(edition_id)
        .await
        .map_err(|e| OrchestratorError::load("bracket_graph", e))?;
    debug!(edition_id, purged, "Purged bracket nodes");
    Ok(purged)
}

/// Merges node A, node B and the edge of every tuple. Returns how many
/// distinct teams were merged.
pub async fn merge_bracket(store: &dyn GraphStore, merges: &[BracketMerge]) -> Result<usize> {
    let mut teams = HashSet::new();
    for merge in merges {
        for team in [&merge.team_a, &merge.team_b] {
            store
                .merge_team(team)
                .await
                .map_err(|e| OrchestratorError::load("bracket_graph", e))?;
            teams.insert(team.team_id);
        }
        store
            .merge_match(&merge.edge)
            .await
            .map_err(|e| OrchestratorError::load("bracket_graph", e))?;
    }
    Ok(teams.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use tournament_storage::InMemoryWideColumn;

    fn standing(edition: &str, group: &str, position: i32) -> GroupStanding {
        GroupStanding {
            edition: edition.to_string(),
            group: group.to_string(),
            position,
            country: format!("Team {}", position),
            points: 10 - position,
            goals_for: 3,
            goals_against: 1,
            goal_diff: 2,
        }
    }

    #[tokio::test]
    async fn test_replace_is_idempotent() {
        let store = InMemoryWideColumn::new();
        store.ensure_schema().await.unwrap();
        let partition = GroupPartition::new("Mundial 2030", "A");
        let rows = vec![standing("Mundial 2030", "A", 1), standing("Mundial 2030", "A", 2)];

        let first = replace_standings(&store, &partition, &rows).await.unwrap();
        assert_eq!(first, LoadCount { deleted: 0, written: 2 });

        let second = replace_standings(&store, &partition, &rows).await.unwrap();
        assert_eq!(second, LoadCount { deleted: 2, written: 2 });
        assert_eq!(store.read_standings(&partition).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stray_record_rejected_before_any_write() {
        let store = InMemoryWideColumn::new();
        store.ensure_schema().await.unwrap();
        let partition = GroupPartition::new("Mundial 2030", "A");
        let rows = vec![standing("Mundial 2030", "A", 1), standing("Mundial 2030", "B", 1)];

        let err = replace_standings(&store, &partition, &rows).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::LoadFailure);
        assert_eq!(store.faults().mutations(), 0);
    }
}
