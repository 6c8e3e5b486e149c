//! Relation catalogue
//!
//! The fixed set of relations the copilot may read, grouped by what a row
//! represents. The auditors compare these groups against the question's shape.

pub const PL_MATCHES: &str = "pl_matches";
pub const PL_TEAM_MATCH: &str = "pl_team_match";
pub const PL_SEASON_TABLE: &str = "pl_season_table";
pub const PL_PLAYER_STANDARD_STATS: &str = "pl_player_standard_stats";
pub const PL_PLAYER_STANDARD_STATS_LATEST: &str = "pl_player_standard_stats_latest";
pub const V_PLAYER_CAREER_TOTALS: &str = "v_player_career_totals";
pub const V_PLAYER_TOTALS_BY_SQUAD: &str = "v_player_totals_by_squad";
pub const V_TEAM_MATCHES: &str = "v_team_matches";
pub const V_TEAM_SEASON_SUMMARY: &str = "v_team_season_summary";
pub const V_TEAM_WIN_STREAKS: &str = "v_team_win_streaks";
pub const V_TEAM_UNBEATEN_STREAKS: &str = "v_team_unbeaten_streaks";
pub const V_TEAM_UNBEATEN_STREAKS_SEASON: &str = "v_team_unbeaten_streaks_season";
pub const V_TEAM_CLEAN_SHEET_STREAKS: &str = "v_team_clean_sheet_streaks";
pub const V_TEAM_CLEAN_SHEET_STREAKS_SEASON: &str = "v_team_clean_sheet_streaks_season";
pub const V_TEAM_SCORING_STREAKS: &str = "v_team_scoring_streaks";
pub const V_TEAM_SCORING_STREAKS_SEASON: &str = "v_team_scoring_streaks_season";

/// Every relation exposed to the generator, in prompt order.
pub const ALLOWED_RELATIONS: &[&str] = &[
    PL_MATCHES,
    PL_TEAM_MATCH,
    PL_SEASON_TABLE,
    PL_PLAYER_STANDARD_STATS,
    PL_PLAYER_STANDARD_STATS_LATEST,
    V_PLAYER_CAREER_TOTALS,
    V_PLAYER_TOTALS_BY_SQUAD,
    V_TEAM_MATCHES,
    V_TEAM_SEASON_SUMMARY,
    V_TEAM_WIN_STREAKS,
    V_TEAM_UNBEATEN_STREAKS,
    V_TEAM_UNBEATEN_STREAKS_SEASON,
    V_TEAM_CLEAN_SHEET_STREAKS,
    V_TEAM_CLEAN_SHEET_STREAKS_SEASON,
    V_TEAM_SCORING_STREAKS,
    V_TEAM_SCORING_STREAKS_SEASON,
];

/// Schema the relations live in; the only qualifier the validator accepts.
pub const DEFAULT_SCHEMA: &str = "public";

pub const PLAYER_RELATIONS: &[&str] = &[
    PL_PLAYER_STANDARD_STATS,
    PL_PLAYER_STANDARD_STATS_LATEST,
    V_PLAYER_CAREER_TOTALS,
    V_PLAYER_TOTALS_BY_SQUAD,
];

pub const TEAM_RELATIONS: &[&str] = &[
    PL_MATCHES,
    PL_TEAM_MATCH,
    PL_SEASON_TABLE,
    V_TEAM_MATCHES,
    V_TEAM_SEASON_SUMMARY,
];

pub const STREAK_RELATIONS: &[&str] = &[
    V_TEAM_WIN_STREAKS,
    V_TEAM_UNBEATEN_STREAKS,
    V_TEAM_UNBEATEN_STREAKS_SEASON,
    V_TEAM_CLEAN_SHEET_STREAKS,
    V_TEAM_CLEAN_SHEET_STREAKS_SEASON,
    V_TEAM_SCORING_STREAKS,
    V_TEAM_SCORING_STREAKS_SEASON,
];

/// Raw match-level relations that streaks must not be recomputed from.
pub const RAW_MATCH_RELATIONS: &[&str] = &[PL_MATCHES, PL_TEAM_MATCH];

/// Relations carrying per-90 rate columns that need a minutes floor.
pub const PER90_RELATIONS: &[&str] = &[PL_PLAYER_STANDARD_STATS, PL_PLAYER_STANDARD_STATS_LATEST];

pub const PER90_PREFIX: &str = "per90_";
pub const MINUTES_COLUMN: &str = "playing_time_min";
pub const MINUTES_FLOOR: u64 = 900;

/// Candidate sources offered when routing cannot decide.
pub const CLARIFICATION_CANDIDATES: &[&str] = &[
    V_TEAM_SEASON_SUMMARY,
    PL_SEASON_TABLE,
    V_TEAM_MATCHES,
    V_PLAYER_TOTALS_BY_SQUAD,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Player,
    Team,
    Streak,
    Unknown,
}

pub fn relation_kind(name: &str) -> RelationKind {
    if PLAYER_RELATIONS.contains(&name) {
        RelationKind::Player
    } else if STREAK_RELATIONS.contains(&name) {
        RelationKind::Streak
    } else if TEAM_RELATIONS.contains(&name) {
        RelationKind::Team
    } else {
        RelationKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_sets_partition_the_allow_list() {
        for relation in ALLOWED_RELATIONS {
            assert_ne!(relation_kind(relation), RelationKind::Unknown, "{}", relation);
        }
        assert_eq!(
            PLAYER_RELATIONS.len() + TEAM_RELATIONS.len() + STREAK_RELATIONS.len(),
            ALLOWED_RELATIONS.len()
        );
    }
}
