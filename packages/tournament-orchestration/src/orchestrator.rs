use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use tournament_storage::{
    GroupPartition, GroupStanding, KnockoutScorer, MatchPopularity, RankedTeamGoals, RefereePanel,
    ScorerEntry, VenueMatch,
};

use crate::connection::{ConnectionManager, ShutdownReport, StoreConnector};
use crate::error::{OrchestratorError, Result};
use crate::graph_sync::{GraphSyncEngine, SyncReport};
use crate::outcome::{Extracted, PipelineReport, UseCaseOutcome};
use crate::path_finder::{PathFinder, PathReport};
use crate::stages::{extract, load, transform, LoadCount};
use crate::use_case::{normalize_group, UseCaseId};

/// Runs replication pipelines and bracket queries, one at a time.
///
/// Every use case takes `&mut self`, so two runs can never overlap. Store
/// handles are opened on first use and stay open until [`shutdown`].
///
/// [`shutdown`]: ReplicaOrchestrator::shutdown
pub struct ReplicaOrchestrator {
    connections: ConnectionManager,
}

impl ReplicaOrchestrator {
    pub fn new(connections: ConnectionManager) -> Self {
        Self { connections }
    }

    pub fn with_connector(connector: Arc<dyn StoreConnector>, connect_timeout: Duration) -> Self {
        Self::new(ConnectionManager::new(connector, connect_timeout))
    }

    pub fn connections(&mut self) -> &mut ConnectionManager {
        &mut self.connections
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Wide-column pipelines
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn group_standings(
        &mut self,
        edition: &str,
        group: &str,
    ) -> UseCaseOutcome<PipelineReport<GroupStanding>> {
        let partition = GroupPartition::new(edition, normalize_group(group));
        let filter = partition.to_string();
        run(
            UseCaseId::GroupStandings,
            filter,
            self.standings_pipeline(&partition),
        )
        .await
    }

    async fn standings_pipeline(
        &mut self,
        partition: &GroupPartition,
    ) -> Result<Option<PipelineReport<GroupStanding>>> {
        let started = Instant::now();
        let source = self.connections.relational().await?;
        let store = self.connections.wide_column().await?;

        let Extracted::Rows(rows) =
            extract::group_standings(source.as_ref(), &partition.edition, &partition.group).await?
        else {
            return Ok(None);
        };
        let extracted = rows.len();

        let records = transform::group_standings(partition, rows);
        let count = load::replace_standings(store.as_ref(), partition, &records).await?;

        let view = store
            .read_standings(partition)
            .await
            .map_err(|e| OrchestratorError::read_back("group_standings", e))?;
        Ok(Some(report(UseCaseId::GroupStandings, extracted, count, view, started)))
    }

    pub async fn match_popularity(
        &mut self,
        edition: &str,
        group: &str,
    ) -> UseCaseOutcome<PipelineReport<MatchPopularity>> {
        let partition = GroupPartition::new(edition, normalize_group(group));
        let filter = partition.to_string();
        run(
            UseCaseId::MatchPopularity,
            filter,
            self.popularity_pipeline(&partition),
        )
        .await
    }

    async fn popularity_pipeline(
        &mut self,
        partition: &GroupPartition,
    ) -> Result<Option<PipelineReport<MatchPopularity>>> {
        let started = Instant::now();
        let source = self.connections.relational().await?;
        let store = self.connections.wide_column().await?;

        let Extracted::Rows(rows) =
            extract::match_popularity(source.as_ref(), &partition.edition, &partition.group)
                .await?
        else {
            return Ok(None);
        };
        let extracted = rows.len();

        let records = transform::match_popularity(partition, rows);
        let count = load::replace_popularity(store.as_ref(), partition, &records).await?;

        let view = store
            .read_popularity(partition)
            .await
            .map_err(|e| OrchestratorError::read_back("match_popularity", e))?;
        Ok(Some(report(UseCaseId::MatchPopularity, extracted, count, view, started)))
    }

    /// Upserts per-team goals and returns the edition ranked by goals
    pub async fn goals_by_team(
        &mut self,
        edition: &str,
    ) -> UseCaseOutcome<PipelineReport<RankedTeamGoals>> {
        run(
            UseCaseId::GoalsByTeam,
            edition.to_string(),
            self.goals_pipeline(edition),
        )
        .await
    }

    async fn goals_pipeline(
        &mut self,
        edition: &str,
    ) -> Result<Option<PipelineReport<RankedTeamGoals>>> {
        let started = Instant::now();
        let source = self.connections.relational().await?;
        let store = self.connections.wide_column().await?;

        let Extracted::Rows(rows) = extract::goals_by_team(source.as_ref(), edition).await? else {
            return Ok(None);
        };
        let extracted = rows.len();

        let records = transform::team_goals(edition, rows);
        let count = load::upsert_team_goals(store.as_ref(), &records).await?;

        let stored = store
            .read_team_goals(edition)
            .await
            .map_err(|e| OrchestratorError::read_back("team_goals", e))?;
        let view = transform::rank_team_goals(stored);
        Ok(Some(report(UseCaseId::GoalsByTeam, extracted, count, view, started)))
    }

    /// Matches of `year` at `venue`; the view lists the whole venue partition
    pub async fn matches_by_venue(
        &mut self,
        year: i32,
        venue: &str,
    ) -> UseCaseOutcome<PipelineReport<VenueMatch>> {
        run(
            UseCaseId::MatchesByVenue,
            format!("{} / {}", year, venue),
            self.venue_pipeline(year, venue),
        )
        .await
    }

    async fn venue_pipeline(
        &mut self,
        year: i32,
        venue: &str,
    ) -> Result<Option<PipelineReport<VenueMatch>>> {
        let started = Instant::now();
        let source = self.connections.relational().await?;
        let store = self.connections.wide_column().await?;

        let Extracted::Rows(rows) =
            extract::matches_by_year_venue(source.as_ref(), year, venue).await?
        else {
            return Ok(None);
        };
        let extracted = rows.len();

        let records = transform::venue_matches(rows);
        let count = load::upsert_venue_matches(store.as_ref(), &records).await?;

        let view = store
            .read_venue_matches(venue)
            .await
            .map_err(|e| OrchestratorError::read_back("matches_by_venue", e))?;
        Ok(Some(report(UseCaseId::MatchesByVenue, extracted, count, view, started)))
    }

    pub async fn knockout_scorers(
        &mut self,
        edition: &str,
    ) -> UseCaseOutcome<PipelineReport<KnockoutScorer>> {
        run(
            UseCaseId::KnockoutScorers,
            edition.to_string(),
            self.knockout_pipeline(edition),
        )
        .await
    }

    async fn knockout_pipeline(
        &mut self,
        edition: &str,
    ) -> Result<Option<PipelineReport<KnockoutScorer>>> {
        let started = Instant::now();
        let source = self.connections.relational().await?;
        let store = self.connections.wide_column().await?;

        let Extracted::Rows(rows) = extract::knockout_scorers(source.as_ref(), edition).await?
        else {
            return Ok(None);
        };
        let extracted = rows.len();

        let records = transform::knockout_scorers(edition, rows);
        let count = load::upsert_knockout_scorers(store.as_ref(), &records).await?;

        let view = store
            .read_knockout_scorers(edition)
            .await
            .map_err(|e| OrchestratorError::read_back("knockout_scorers", e))?;
        Ok(Some(report(UseCaseId::KnockoutScorers, extracted, count, view, started)))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Document pipelines
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn referee_panels(
        &mut self,
        edition: &str,
    ) -> UseCaseOutcome<PipelineReport<RefereePanel>> {
        run(
            UseCaseId::RefereePanels,
            edition.to_string(),
            self.referee_pipeline(edition),
        )
        .await
    }

    async fn referee_pipeline(
        &mut self,
        edition: &str,
    ) -> Result<Option<PipelineReport<RefereePanel>>> {
        let started = Instant::now();
        let source = self.connections.relational().await?;
        let store = self.connections.documents().await?;

        let Extracted::Rows(rows) = extract::final_phase_referees(source.as_ref(), edition).await?
        else {
            return Ok(None);
        };
        let extracted = rows.len();

        let panels = transform::referee_panels(edition, rows);
        let count = load::replace_referee_panels(store.as_ref(), edition, &panels).await?;

        let view = store
            .read_referee_panels(edition)
            .await
            .map_err(|e| OrchestratorError::read_back("referee_panels", e))?;
        Ok(Some(report(UseCaseId::RefereePanels, extracted, count, view, started)))
    }

    /// Replaces the (edition, country) scorer document and returns the players
    /// reaching `min_goals`
    pub async fn team_scorers(
        &mut self,
        edition: &str,
        country: &str,
        min_goals: i32,
    ) -> UseCaseOutcome<PipelineReport<ScorerEntry>> {
        run(
            UseCaseId::TeamScorers,
            format!("{} / {} / >= {}", edition, country, min_goals),
            self.scorers_pipeline(edition, country, min_goals),
        )
        .await
    }

    async fn scorers_pipeline(
        &mut self,
        edition: &str,
        country: &str,
        min_goals: i32,
    ) -> Result<Option<PipelineReport<ScorerEntry>>> {
        let started = Instant::now();
        let source = self.connections.relational().await?;
        let store = self.connections.documents().await?;

        let Extracted::Rows(rows) =
            extract::players_min_goals(source.as_ref(), edition, country, min_goals).await?
        else {
            return Ok(None);
        };
        let extracted = rows.len();

        let doc = transform::team_scorers(edition, country, rows, Utc::now());
        let count = load::replace_team_scorers(store.as_ref(), &doc).await?;

        let stored = store
            .read_team_scorers(edition, country)
            .await
            .map_err(|e| OrchestratorError::read_back("team_scorers", e))?
            .ok_or_else(|| {
                OrchestratorError::read_back(
                    "team_scorers",
                    tournament_storage::StorageError::query(format!(
                        "document for {} / {} missing after replace",
                        edition, country
                    )),
                )
            })?;
        let view = transform::filter_scorers(&stored, min_goals);
        Ok(Some(report(UseCaseId::TeamScorers, extracted, count, view, started)))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Bracket graph
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn sync_bracket(&mut self, label: &str) -> UseCaseOutcome<SyncReport> {
        run(UseCaseId::BracketSync, label.to_string(), self.sync_pipeline(label)).await
    }

    async fn sync_pipeline(&mut self, label: &str) -> Result<Option<SyncReport>> {
        let source = self.connections.relational().await?;
        let graph = self.connections.graph().await?;
        GraphSyncEngine::new(source.as_ref(), graph.as_ref())
            .rebuild(label)
            .await
    }

    /// Shortest route between two teams. Never syncs the bracket first.
    pub async fn elimination_path(
        &mut self,
        label: &str,
        from: &str,
        to: &str,
    ) -> UseCaseOutcome<PathReport> {
        run(
            UseCaseId::EliminationPath,
            format!("{}: {} -> {}", label, from, to),
            self.path_lookup(label, from, to),
        )
        .await
    }

    async fn path_lookup(&mut self, label: &str, from: &str, to: &str) -> Result<Option<PathReport>> {
        let source = self.connections.relational().await?;
        let graph = self.connections.graph().await?;
        let report = PathFinder::new(source.as_ref(), graph.as_ref())
            .find(label, from, to)
            .await?;
        Ok(Some(report))
    }

    pub async fn shutdown(&mut self) -> ShutdownReport {
        self.connections.shutdown().await
    }
}

/// Runs one use case inside its span and folds the result into an outcome
async fn run<T, F>(use_case: UseCaseId, filter: String, pipeline: F) -> UseCaseOutcome<T>
where
    F: Future<Output = Result<Option<T>>>,
{
    let span = info_span!("use_case", use_case = %use_case, run_id = %Uuid::new_v4());
    async move {
        info!("Starting {} for {}", use_case, filter);
        match pipeline.await {
            Ok(Some(value)) => UseCaseOutcome::Completed(value),
            Ok(None) => {
                warn!("No data for {} ({}), targets left untouched", use_case, filter);
                UseCaseOutcome::NoData { use_case, filter }
            }
            Err(error) => {
                error!("{} failed [{}]: {}", use_case, error.kind(), error);
                UseCaseOutcome::Failed { use_case, error }
            }
        }
    }
    .instrument(span)
    .await
}

fn report<T>(
    use_case: UseCaseId,
    extracted: usize,
    count: LoadCount,
    rows: Vec<T>,
    started: Instant,
) -> PipelineReport<T> {
    let duration_ms = started.elapsed().as_millis() as u64;
    info!(
        "{} done: {} extracted, {} deleted, {} written, {} in view ({} ms)",
        use_case,
        extracted,
        count.deleted,
        count.written,
        rows.len(),
        duration_ms
    );
    PipelineReport {
        use_case,
        extracted,
        deleted: count.deleted,
        written: count.written,
        rows,
        duration_ms,
    }
}
