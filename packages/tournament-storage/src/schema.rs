//! Wide-column DDL
//!
//! All statements are idempotent (`IF NOT EXISTS`) and safe to run on every
//! fresh session.

/// Keyspace used when none is configured
pub const DEFAULT_KEYSPACE: &str = "fifa_db";

/// Replica tables in creation order
pub const TABLES: [&str; 5] = [
    "group_standings",
    "match_popularity",
    "team_goals",
    "matches_by_venue",
    "knockout_scorers",
];

pub fn create_keyspace(keyspace: &str) -> String {
    format!(
        "CREATE KEYSPACE IF NOT EXISTS {} \
         WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
        keyspace
    )
}

const GROUP_STANDINGS: &str = "CREATE TABLE IF NOT EXISTS group_standings (
    edition text,
    group_name text,
    position int,
    country text,
    points int,
    goals_for int,
    goals_against int,
    goal_diff int,
    PRIMARY KEY ((edition, group_name), position)
) WITH CLUSTERING ORDER BY (position ASC)";

const MATCH_POPULARITY: &str = "CREATE TABLE IF NOT EXISTS match_popularity (
    edition text,
    group_name text,
    popularity int,
    match_id int,
    kickoff timestamp,
    venue text,
    local_team text,
    visitor_team text,
    PRIMARY KEY ((edition, group_name), popularity, match_id)
) WITH CLUSTERING ORDER BY (popularity DESC, match_id ASC)";

const TEAM_GOALS: &str = "CREATE TABLE IF NOT EXISTS team_goals (
    edition text,
    team text,
    goals int,
    PRIMARY KEY ((edition), team)
)";

const MATCHES_BY_VENUE: &str = "CREATE TABLE IF NOT EXISTS matches_by_venue (
    venue text,
    played_at timestamp,
    match_id int,
    local_team text,
    visitor_team text,
    local_goals int,
    visitor_goals int,
    PRIMARY KEY ((venue), played_at, match_id)
) WITH CLUSTERING ORDER BY (played_at ASC, match_id ASC)";

const KNOCKOUT_SCORERS: &str = "CREATE TABLE IF NOT EXISTS knockout_scorers (
    edition text,
    knockout_goals int,
    player_id int,
    last_name text,
    first_name text,
    country text,
    PRIMARY KEY ((edition), knockout_goals, player_id)
) WITH CLUSTERING ORDER BY (knockout_goals DESC, player_id ASC)";

/// Table statements, parallel to [`TABLES`]
pub fn table_statements() -> [&'static str; 5] {
    [
        GROUP_STANDINGS,
        MATCH_POPULARITY,
        TEAM_GOALS,
        MATCHES_BY_VENUE,
        KNOCKOUT_SCORERS,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyspace_statement() {
        let ddl = create_keyspace("fifa_db");
        assert!(ddl.starts_with("CREATE KEYSPACE IF NOT EXISTS fifa_db"));
        assert!(ddl.contains("'replication_factor': 1"));
    }

    #[test]
    fn test_table_statements_match_table_names() {
        for (name, ddl) in TABLES.iter().zip(table_statements()) {
            assert!(
                ddl.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", name)),
                "statement for {} is out of order",
                name
            );
        }
    }

    #[test]
    fn test_clustering_orders() {
        let [standings, popularity, goals, venue, scorers] = table_statements();
        assert!(standings.contains("CLUSTERING ORDER BY (position ASC)"));
        assert!(popularity.contains("(popularity DESC, match_id ASC)"));
        assert!(!goals.contains("CLUSTERING ORDER"));
        assert!(venue.contains("PRIMARY KEY ((venue), played_at, match_id)"));
        assert!(scorers.contains("(knockout_goals DESC, player_id ASC)"));
    }
}
