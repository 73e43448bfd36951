//! Extract stage: one named read per use case against the relational source

use tournament_storage::{
    BracketEdgeRow, Edition, EditionId, KnockoutScorerRow, PlayerGoalsRow, PopularityRow,
    RefereeRow, RelationalSource, StandingRow, TeamGoalsRow, VenueMatchRow,
};
use tracing::debug;

use crate::error::{OrchestratorError, Result};
use crate::outcome::Extracted;

pub async fn group_standings(
    source: &dyn RelationalSource,
    edition: &str,
    group: &str,
) -> Result<Extracted<StandingRow>> {
    let rows = source
        .group_standings(edition, group)
        .await
        .map_err(|e| OrchestratorError::extract("get_tabla_posiciones_grupo", e))?;
    debug!(rows = rows.len(), "Extracted group standings");
    Ok(Extracted::from_rows(rows))
}

pub async fn match_popularity(
    source: &dyn RelationalSource,
    edition: &str,
    group: &str,
) -> Result<Extracted<PopularityRow>> {
    let rows = source
        .match_popularity(edition, group)
        .await
        .map_err(|e| OrchestratorError::extract("get_partidos_grupo_por_popularidad", e))?;
    debug!(rows = rows.len(), "Extracted match popularity");
    Ok(Extracted::from_rows(rows))
}

pub async fn goals_by_team(
    source: &dyn RelationalSource,
    edition: &str,
) -> Result<Extracted<TeamGoalsRow>> {
    let rows = source
        .goals_by_team(edition)
        .await
        .map_err(|e| OrchestratorError::extract("get_goles_por_seleccion_edicion", e))?;
    Ok(Extracted::from_rows(rows))
}

pub async fn matches_by_year_venue(
    source: &dyn RelationalSource,
    year: i32,
    venue: &str,
) -> Result<Extracted<VenueMatchRow>> {
    let rows = source
        .matches_by_year_venue(year, venue)
        .await
        .map_err(|e| OrchestratorError::extract("get_partidos_por_anio_estadio", e))?;
    Ok(Extracted::from_rows(rows))
}

pub async fn knockout_scorers(
    source: &dyn RelationalSource,
    edition: &str,
) -> Result<Extracted<KnockoutScorerRow>> {
    let rows = source
        .knockout_scorers(edition)
        .await
        .map_err(|e| OrchestratorError::extract("get_goleadores_fases_ko", e))?;
    Ok(Extracted::from_rows(rows))
}

pub async fn final_phase_referees(
    source: &dyn RelationalSource,
    edition: &str,
) -> Result<Extracted<RefereeRow>> {
    let rows = source
        .final_phase_referees(edition)
        .await
        .map_err(|e| OrchestratorError::extract("get_arbitros_fases_finales", e))?;
    debug!(rows = rows.len(), "Extracted referee rows");
    Ok(Extracted::from_rows(rows))
}

pub async fn players_min_goals(
    source: &dyn RelationalSource,
    edition: &str,
    country: &str,
    min_goals: i32,
) -> Result<Extracted<PlayerGoalsRow>> {
    let rows = source
        .players_min_goals(edition, country, min_goals)
        .await
        .map_err(|e| OrchestratorError::extract("get_jugadores_pais_min_goles", e))?;
    Ok(Extracted::from_rows(rows))
}

/// Label to numeric id through the knockout edge view
pub async fn resolve_edition(source: &dyn RelationalSource, label: &str) -> Result<Edition> {
    let id = source
        .resolve_edition_id(label)
        .await
        .map_err(|e| OrchestratorError::extract("vw_partidos_ko_edges.edicion_nombre", e))?;
    match id {
        Some(id) => Ok(Edition::new(id, label)),
        None => Err(OrchestratorError::EditionNotFound(label.to_string())),
    }
}

pub async fn bracket_edges(
    source: &dyn RelationalSource,
    edition_id: EditionId,
) -> Result<Extracted<BracketEdgeRow>> {
    let rows = source
        .bracket_edges(edition_id)
        .await
        .map_err(|e| OrchestratorError::extract("vw_partidos_ko_edges", e))?;
    debug!(edition_id, rows = rows.len(), "Extracted bracket edges");
    Ok(Extracted::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use tournament_storage::InMemoryRelational;

    #[tokio::test]
    async fn test_empty_read_is_no_data() {
        let source = InMemoryRelational::new();
        let out = group_standings(&source, "Mundial 2099", "Z").await.unwrap();
        assert_eq!(out, Extracted::NoData);
    }

    #[tokio::test]
    async fn test_read_failure_is_extract_failure() {
        let source = InMemoryRelational::new();
        source.faults().set_read_failure(true);

        let err = knockout_scorers(&source, "Mundial 2030").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ExtractFailure);
        assert!(err.to_string().contains("get_goleadores_fases_ko"));
    }

    #[tokio::test]
    async fn test_unknown_edition_label() {
        let source = InMemoryRelational::new();
        let err = resolve_edition(&source, "Mundial 2099").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::EditionNotFound);
    }
}
