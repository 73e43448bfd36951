use serde::{Deserialize, Serialize};

/// Use case identifier (one per replication pipeline or graph operation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UseCaseId {
    GroupStandings,
    MatchPopularity,
    GoalsByTeam,
    MatchesByVenue,
    KnockoutScorers,
    RefereePanels,
    TeamScorers,
    BracketSync,
    EliminationPath,
}

impl UseCaseId {
    pub const ALL: [UseCaseId; 9] = [
        UseCaseId::GroupStandings,
        UseCaseId::MatchPopularity,
        UseCaseId::GoalsByTeam,
        UseCaseId::MatchesByVenue,
        UseCaseId::KnockoutScorers,
        UseCaseId::RefereePanels,
        UseCaseId::TeamScorers,
        UseCaseId::BracketSync,
        UseCaseId::EliminationPath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UseCaseId::GroupStandings => "group_standings",
            UseCaseId::MatchPopularity => "match_popularity",
            UseCaseId::GoalsByTeam => "goals_by_team",
            UseCaseId::MatchesByVenue => "matches_by_venue",
            UseCaseId::KnockoutScorers => "knockout_scorers",
            UseCaseId::RefereePanels => "referee_panels",
            UseCaseId::TeamScorers => "team_scorers",
            UseCaseId::BracketSync => "bracket_sync",
            UseCaseId::EliminationPath => "elimination_path",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.as_str() == s)
    }
}

impl std::fmt::Display for UseCaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical group letter: trims, upper-cases, drops a leading
/// `GRUPO`/`GROUP` word.
///
/// ```
/// use tournament_orchestration::normalize_group;
///
/// assert_eq!(normalize_group("grupo a"), "A");
/// assert_eq!(normalize_group(" B "), "B");
/// ```
pub fn normalize_group(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    for prefix in ["GRUPO", "GROUP"] {
        if let Some(rest) = upper.strip_prefix(prefix) {
            if rest.starts_with(char::is_whitespace) {
                return rest.trim().to_string();
            }
        }
    }
    upper
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_use_case_roundtrip() {
        for id in UseCaseId::ALL {
            assert_eq!(UseCaseId::from_str(id.as_str()), Some(id));
        }
        assert_eq!(UseCaseId::from_str("unknown"), None);
    }

    #[test]
    fn test_normalize_group() {
        assert_eq!(normalize_group("grupo a"), "A");
        assert_eq!(normalize_group("GRUPO   h"), "H");
        assert_eq!(normalize_group("Group c"), "C");
        assert_eq!(normalize_group("  d "), "D");
        assert_eq!(normalize_group("z"), "Z");
    }

    #[test]
    fn test_normalize_group_keeps_words_that_only_start_with_prefix() {
        assert_eq!(normalize_group("grupoA"), "GRUPOA");
    }
}
