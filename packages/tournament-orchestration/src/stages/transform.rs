//! Transform stage: pure reshaping of source rows into target records
//!
//! Nothing here touches a store. Ordering guarantees of the targets are
//! provided by the stores' clustering keys, except for the client-side
//! rankings (`rank_team_goals`, `filter_scorers`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use tournament_storage::{
    BracketEdgeRow, GroupPartition, GroupStanding, KnockoutScorer, KnockoutScorerRow, MatchEdge,
    MatchPopularity, PlayerGoalsRow, PopularityRow, RankedTeamGoals, RefereeAssignment,
    RefereePanel, RefereeRow, ScorerEntry, StandingRow, TeamGoals, TeamGoalsRow, TeamNode,
    TeamScorersDoc, VenueMatch, VenueMatchRow,
};

// ═══════════════════════════════════════════════════════════════════════════
// Wide-column records
// ═══════════════════════════════════════════════════════════════════════════

pub fn group_standings(partition: &GroupPartition, rows: Vec<StandingRow>) -> Vec<GroupStanding> {
    rows.into_iter()
        .map(|row| GroupStanding {
            edition: partition.edition.clone(),
            group: partition.group.clone(),
            position: row.position,
            country: row.country,
            points: row.points,
            goals_for: row.goals_for,
            goals_against: row.goals_against,
            goal_diff: row.goal_diff,
        })
        .collect()
}

pub fn match_popularity(
    partition: &GroupPartition,
    rows: Vec<PopularityRow>,
) -> Vec<MatchPopularity> {
    rows.into_iter()
        .map(|row| MatchPopularity {
            edition: partition.edition.clone(),
            group: partition.group.clone(),
            popularity: row.popularity,
            match_id: row.match_id,
            kickoff: row.kickoff,
            venue: row.venue,
            local_team: row.local_team,
            visitor_team: row.visitor_team,
        })
        .collect()
}

pub fn team_goals(edition: &str, rows: Vec<TeamGoalsRow>) -> Vec<TeamGoals> {
    rows.into_iter()
        .map(|row| TeamGoals {
            edition: edition.to_string(),
            team: row.team,
            goals: row.goals,
        })
        .collect()
}

pub fn venue_matches(rows: Vec<VenueMatchRow>) -> Vec<VenueMatch> {
    rows.into_iter()
        .map(|row| VenueMatch {
            venue: row.venue,
            played_at: row.played_at,
            match_id: row.match_id,
            local_team: row.local_team,
            visitor_team: row.visitor_team,
            local_goals: row.local_goals,
            visitor_goals: row.visitor_goals,
        })
        .collect()
}

pub fn knockout_scorers(edition: &str, rows: Vec<KnockoutScorerRow>) -> Vec<KnockoutScorer> {
    rows.into_iter()
        .map(|row| KnockoutScorer {
            edition: edition.to_string(),
            knockout_goals: row.knockout_goals,
            player_id: row.player_id,
            last_name: row.last_name,
            first_name: row.first_name,
            country: row.country,
        })
        .collect()
}

/// Ranks by goals descending. Ranks are 1-based row positions; ties are
/// broken by team name.
pub fn rank_team_goals(mut rows: Vec<TeamGoals>) -> Vec<RankedTeamGoals> {
    rows.sort_by(|a, b| b.goals.cmp(&a.goals).then_with(|| a.team.cmp(&b.team)));
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| RankedTeamGoals {
            rank: i + 1,
            team: row.team,
            goals: row.goals,
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Documents
// ═══════════════════════════════════════════════════════════════════════════

/// One panel per match, in order of first appearance.
///
/// Match-level fields come from the first row of each match; every row adds
/// one referee in row order.
pub fn referee_panels(edition: &str, rows: Vec<RefereeRow>) -> Vec<RefereePanel> {
    let mut panels: Vec<RefereePanel> = Vec::new();
    let mut index: HashMap<i32, usize> = HashMap::new();

    for row in rows {
        let assignment = RefereeAssignment {
            name: row.referee,
            role: row.role,
        };
        match index.get(&row.match_id) {
            Some(&i) => panels[i].referees.push(assignment),
            None => {
                index.insert(row.match_id, panels.len());
                panels.push(RefereePanel {
                    edition: edition.to_string(),
                    phase: row.phase,
                    match_id: row.match_id,
                    local_team: row.local_team,
                    visitor_team: row.visitor_team,
                    referees: vec![assignment],
                });
            }
        }
    }

    panels
}

pub fn team_scorers(
    edition: &str,
    country: &str,
    rows: Vec<PlayerGoalsRow>,
    now: DateTime<Utc>,
) -> TeamScorersDoc {
    TeamScorersDoc {
        edition: edition.to_string(),
        country: country.to_string(),
        players: rows
            .into_iter()
            .map(|row| ScorerEntry {
                id: row.player_id,
                first_name: row.first_name,
                last_name: row.last_name,
                goals_total: row.goals_total,
            })
            .collect(),
        updated_at: now,
    }
}

/// Players with at least `min_goals`, goals descending then id ascending
pub fn filter_scorers(doc: &TeamScorersDoc, min_goals: i32) -> Vec<ScorerEntry> {
    let mut players: Vec<ScorerEntry> = doc
        .players
        .iter()
        .filter(|p| p.goals_total >= min_goals)
        .cloned()
        .collect();
    players.sort_by(|a, b| b.goals_total.cmp(&a.goals_total).then(a.id.cmp(&b.id)));
    players
}

// ═══════════════════════════════════════════════════════════════════════════
// Bracket graph
// ═══════════════════════════════════════════════════════════════════════════

/// One edge tuple ready to merge: both endpoints, then the match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketMerge {
    pub team_a: TeamNode,
    pub team_b: TeamNode,
    pub edge: MatchEdge,
}

pub fn bracket_merges(rows: Vec<BracketEdgeRow>) -> Vec<BracketMerge> {
    rows.into_iter()
        .map(|row| BracketMerge {
            team_a: TeamNode {
                team_id: row.team_a,
                edition_id: row.edition_id,
                display_name: row.name_a,
            },
            team_b: TeamNode {
                team_id: row.team_b,
                edition_id: row.edition_id,
                display_name: row.name_b,
            },
            edge: MatchEdge {
                match_id: row.match_id,
                edition_id: row.edition_id,
                phase: row.phase,
                team_a: row.team_a,
                team_b: row.team_b,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn referee_row(match_id: i32, phase: &str, referee: &str, role: &str) -> RefereeRow {
        RefereeRow {
            phase: phase.to_string(),
            match_id,
            local_team: format!("L{}", match_id),
            visitor_team: format!("V{}", match_id),
            referee: referee.to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn test_standings_carry_partition() {
        let partition = GroupPartition::new("Mundial 2030", "A");
        let out = group_standings(
            &partition,
            vec![StandingRow {
                position: 1,
                country: "Uruguay".to_string(),
                points: 9,
                goals_for: 7,
                goals_against: 1,
                goal_diff: 6,
            }],
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].partition(), partition);
        assert_eq!(out[0].goal_diff, 6);
    }

    #[test]
    fn test_referee_panels_group_by_first_appearance() {
        let rows = vec![
            referee_row(64, "final", "Collina", "main"),
            referee_row(61, "semifinal", "Webb", "main"),
            referee_row(64, "ignored", "Lanese", "assistant"),
            referee_row(61, "semifinal", "Rizzoli", "fourth"),
        ];

        let panels = referee_panels("Mundial 2030", rows);

        assert_eq!(panels.len(), 2);
        assert_eq!(panels[0].match_id, 64);
        assert_eq!(panels[0].phase, "final");
        assert_eq!(
            panels[0].referees,
            vec![
                RefereeAssignment {
                    name: "Collina".to_string(),
                    role: "main".to_string()
                },
                RefereeAssignment {
                    name: "Lanese".to_string(),
                    role: "assistant".to_string()
                },
            ]
        );
        assert_eq!(panels[1].match_id, 61);
        assert_eq!(panels[1].referees.len(), 2);
    }

    #[test]
    fn test_rank_team_goals() {
        let rows = ["Chile", "Brasil", "Argentina", "Peru"]
            .iter()
            .zip([5, 9, 5, 2])
            .map(|(team, goals)| TeamGoals {
                edition: "Mundial 2030".to_string(),
                team: team.to_string(),
                goals,
            })
            .collect();

        let ranked = rank_team_goals(rows);
        let view: Vec<(usize, &str, i32)> = ranked
            .iter()
            .map(|r| (r.rank, r.team.as_str(), r.goals))
            .collect();
        assert_eq!(
            view,
            vec![
                (1, "Brasil", 9),
                (2, "Argentina", 5),
                (3, "Chile", 5),
                (4, "Peru", 2)
            ]
        );
    }

    #[test]
    fn test_filter_scorers_threshold_and_order() {
        let now = Utc.with_ymd_and_hms(2030, 7, 1, 12, 0, 0).unwrap();
        let rows = [(7, 2), (3, 4), (5, 1), (2, 4)]
            .iter()
            .map(|&(id, goals)| PlayerGoalsRow {
                player_id: id,
                first_name: format!("F{}", id),
                last_name: format!("L{}", id),
                country: "Chile".to_string(),
                goals_total: goals,
            })
            .collect();

        let doc = team_scorers("Mundial 2030", "Chile", rows, now);
        assert_eq!(doc.updated_at, now);
        assert_eq!(doc.players.len(), 4);

        let ids: Vec<i32> = filter_scorers(&doc, 2).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3, 7]);
    }

    #[test]
    fn test_bracket_merges_tag_every_part_with_edition() {
        let merges = bracket_merges(vec![BracketEdgeRow {
            edition_id: 30,
            match_id: 3,
            phase: "semifinal".to_string(),
            team_a: 1,
            name_a: "A".to_string(),
            team_b: 3,
            name_b: "C".to_string(),
        }]);

        assert_eq!(merges.len(), 1);
        let m = &merges[0];
        assert_eq!(m.team_a.edition_id, 30);
        assert_eq!(m.team_b.display_name, "C");
        assert_eq!(m.edge.match_id, 3);
        assert_eq!((m.edge.team_a, m.edge.team_b), (1, 3));
    }
}
