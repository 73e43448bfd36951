//! Tournament replica CLI
//!
//! Runs one replication pipeline or bracket query per invocation.
//!
//! # Usage
//!
//! ```bash
//! # Group standings of one edition into the wide-column store
//! tournament-replica standings --edition "Mundial 2030" --group "grupo a"
//!
//! # Rebuild the bracket, then ask for a route
//! tournament-replica path --edition "Mundial 2030" --from Chile --to Peru --sync
//!
//! # Settings from a YAML file instead of the environment
//! tournament-replica --config replica.yaml goals --edition "Mundial 2030"
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tournament_orchestration::{
    LiveConnector, PathLookup, PipelineReport, ReplicaConfig, ReplicaOrchestrator,
    UseCaseOutcome,
};

#[derive(Parser)]
#[command(name = "tournament-replica")]
#[command(about = "Replicate Mundial tournament data into query-shaped stores", long_about = None)]
struct Cli {
    /// YAML settings file (environment variables otherwise)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Group standings into the wide-column store
    Standings {
        #[arg(short, long)]
        edition: String,

        #[arg(short, long)]
        group: String,
    },

    /// Group matches by popularity into the wide-column store
    Popularity {
        #[arg(short, long)]
        edition: String,

        #[arg(short, long)]
        group: String,
    },

    /// Goals per team, ranked
    Goals {
        #[arg(short, long)]
        edition: String,
    },

    /// Matches played at a venue in a given year
    Venue {
        #[arg(short, long)]
        year: i32,

        #[arg(short, long)]
        venue: String,
    },

    /// Knockout-phase top scorers
    KoScorers {
        #[arg(short, long)]
        edition: String,
    },

    /// Final-phase referee panels into the document store
    Referees {
        #[arg(short, long)]
        edition: String,
    },

    /// Scorers of one country with at least N goals
    Scorers {
        #[arg(short, long)]
        edition: String,

        #[arg(short, long)]
        country: String,

        #[arg(short, long, default_value = "1")]
        min_goals: i32,
    },

    /// Rebuild the elimination bracket graph of an edition
    BracketSync {
        #[arg(short, long)]
        edition: String,
    },

    /// Shortest elimination route between two teams
    Path {
        #[arg(short, long)]
        edition: String,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Rebuild the bracket before searching
        #[arg(long)]
        sync: bool,
    },
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("scylla=error".parse()?)
        .add_directive("mongodb=error".parse()?)
        .add_directive("neo4rs=error".parse()?)
        .add_directive("sqlx=warn".parse()?);

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ReplicaConfig> {
    let config = match path {
        Some(path) => ReplicaConfig::from_yaml(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ReplicaConfig::from_env().context("reading settings from the environment")?,
    };
    Ok(config)
}

/// Prints a pipeline outcome. Returns nothing: every outcome exits 0.
fn print_report<T>(outcome: UseCaseOutcome<PipelineReport<T>>, line: impl Fn(&T) -> String) {
    match outcome {
        UseCaseOutcome::Completed(report) => {
            println!(
                "{}: {} extracted, {} deleted, {} written ({} ms)",
                report.use_case, report.extracted, report.deleted, report.written, report.duration_ms
            );
            for row in &report.rows {
                println!("  {}", line(row));
            }
        }
        UseCaseOutcome::NoData { use_case, filter } => {
            println!("{}: no data for {}", use_case, filter);
        }
        UseCaseOutcome::Failed { use_case, error } => {
            println!("{} failed [{}]: {}", use_case, error.kind(), error);
        }
    }
}

async fn dispatch(orchestrator: &mut ReplicaOrchestrator, command: Commands) {
    match command {
        Commands::Standings { edition, group } => {
            let outcome = orchestrator.group_standings(&edition, &group).await;
            print_report(outcome, |s| {
                format!(
                    "{:>2}. {:<20} {:>3} pts  {:>3}:{:<3} ({:+})",
                    s.position, s.country, s.points, s.goals_for, s.goals_against, s.goal_diff
                )
            });
        }
        Commands::Popularity { edition, group } => {
            let outcome = orchestrator.match_popularity(&edition, &group).await;
            print_report(outcome, |m| {
                let kickoff = m
                    .kickoff
                    .map(|k| k.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "{:>6}  #{} {} vs {} at {} ({})",
                    m.popularity, m.match_id, m.local_team, m.visitor_team, m.venue, kickoff
                )
            });
        }
        Commands::Goals { edition } => {
            let outcome = orchestrator.goals_by_team(&edition).await;
            print_report(outcome, |g| format!("{:>2}. {:<20} {}", g.rank, g.team, g.goals));
        }
        Commands::Venue { year, venue } => {
            let outcome = orchestrator.matches_by_venue(year, &venue).await;
            print_report(outcome, |m| {
                format!(
                    "{}  #{} {} {}-{} {}",
                    m.played_at.format("%Y-%m-%d"),
                    m.match_id,
                    m.local_team,
                    m.local_goals,
                    m.visitor_goals,
                    m.visitor_team
                )
            });
        }
        Commands::KoScorers { edition } => {
            let outcome = orchestrator.knockout_scorers(&edition).await;
            print_report(outcome, |s| {
                format!(
                    "{:>2}  {} {} ({}) #{}",
                    s.knockout_goals, s.first_name, s.last_name, s.country, s.player_id
                )
            });
        }
        Commands::Referees { edition } => {
            let outcome = orchestrator.referee_panels(&edition).await;
            print_report(outcome, |p| {
                let referees: Vec<String> = p
                    .referees
                    .iter()
                    .map(|r| format!("{} ({})", r.name, r.role))
                    .collect();
                format!(
                    "{} #{} {} vs {}: {}",
                    p.phase,
                    p.match_id,
                    p.local_team,
                    p.visitor_team,
                    referees.join(", ")
                )
            });
        }
        Commands::Scorers {
            edition,
            country,
            min_goals,
        } => {
            let outcome = orchestrator.team_scorers(&edition, &country, min_goals).await;
            print_report(outcome, |p| {
                format!("{:>2}  {} {} #{}", p.goals_total, p.first_name, p.last_name, p.id)
            });
        }
        Commands::BracketSync { edition } => {
            sync(orchestrator, &edition).await;
        }
        Commands::Path {
            edition,
            from,
            to,
            sync: rebuild,
        } => {
            if rebuild {
                sync(orchestrator, &edition).await;
            }
            match orchestrator.elimination_path(&edition, &from, &to).await {
                UseCaseOutcome::Completed(report) => match report.lookup {
                    PathLookup::Found(path) => {
                        println!("{}: {}", report.edition, path.teams.join(" -> "));
                        for leg in &path.matches {
                            println!("  {} #{}", leg.phase, leg.match_id);
                        }
                    }
                    PathLookup::NoPath => {
                        println!("{}: no path from {} to {}", report.edition, from, to);
                    }
                },
                UseCaseOutcome::NoData { use_case, filter } => {
                    println!("{}: no data for {}", use_case, filter);
                }
                UseCaseOutcome::Failed { use_case, error } => {
                    println!("{} failed [{}]: {}", use_case, error.kind(), error);
                }
            }
        }
    }
}

async fn sync(orchestrator: &mut ReplicaOrchestrator, edition: &str) {
    match orchestrator.sync_bracket(edition).await {
        UseCaseOutcome::Completed(report) => println!(
            "{}: {} edges, {} teams",
            report.edition, report.edges_processed, report.teams_merged
        ),
        UseCaseOutcome::NoData { .. } => println!("{}: no knockout data", edition),
        UseCaseOutcome::Failed { use_case, error } => {
            println!("{} failed [{}]: {}", use_case, error.kind(), error);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let connect_timeout = config.connect_timeout();

    let mut orchestrator =
        ReplicaOrchestrator::with_connector(Arc::new(LiveConnector::new(config)), connect_timeout);

    dispatch(&mut orchestrator, cli.command).await;

    let shutdown = orchestrator.shutdown().await;
    for (store, error) in &shutdown.failures {
        eprintln!("warning: closing {} store failed: {}", store, error);
    }

    Ok(())
}
