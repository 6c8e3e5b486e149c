//! Keyword tables for intent classification
//!
//! Static, never mutated. Phrases are matched on word boundaries against the
//! normalized (lowercased, whitespace-collapsed) question.

use super::SortDirection;

pub const TITLE_KEYWORDS: &[&str] = &[
    "title",
    "titles",
    "trophies",
    "trophy",
    "seasons won",
    "won the league",
    "champion",
    "champions",
    "league winners",
    "premier league titles",
    "won premier league",
    "won the premier league",
    "how many times",
    "championship",
    "championships",
    "league champion",
];

pub const SEASON_SCOPE_KEYWORDS: &[&str] = &[
    "in a season",
    "single season",
    "one season",
    "record season",
    "best season",
    "worst season",
    "per season",
    "season record",
    "in a premier league season",
    "in a pl season",
    "in a single season",
    "single premier league season",
    "single pl season",
];

pub const ALL_TIME_SCOPE_KEYWORDS: &[&str] = &[
    "all-time",
    "all time",
    "ever",
    "history",
    "in pl history",
    "in premier league history",
    "overall",
    "total",
    "combined",
    "across all seasons",
    "throughout history",
];

pub const MATCH_CONDITIONAL_KEYWORDS: &[&str] = &[
    "clean sheet",
    "clean sheets",
    "consecutive",
    "streak",
    "streaks",
    "unbeaten",
    "without conceding",
    "not conceding",
    "in a row",
    "winning streak",
    "losing streak",
    "scoring streak",
    "longest run",
    "unbeaten run",
    "without losing",
    "shutout",
    "shutouts",
];

pub const PLAYER_FOR_CLUB_KEYWORDS: &[&str] = &[
    "player scored",
    "player goals",
    "top scorer for",
    "leading scorer for",
    "most goals for",
    "scored for",
    "assists for",
    "player with most",
    "who scored the most for",
    "player at",
    "players for",
    "player for",
];

pub const CLUB_IDENTIFIERS: &[&str] = &[
    "team",
    "teams",
    "club",
    "clubs",
    "side",
    "sides",
];

/// Words that make a question about individual players rather than clubs.
pub const PLAYER_CONTEXT: &[&str] = &[
    "player",
    "players",
    "scorer",
    "scorers",
    "who scored",
    "assist",
    "assists",
    "striker",
    "goalkeeper",
];

/// Superlatives that flip the default direction to ascending.
pub const ASC_MODIFIERS: &[&str] = &["fewest", "lowest", "worst", "smallest", "least"];

/// Superlatives that confirm a descending direction.
pub const DESC_MODIFIERS: &[&str] = &["most", "highest", "best", "largest", "biggest", "record", "top"];

/// Maps metric phrases to (column, direction). `None` means the phrase names
/// the metric without a direction; the question's modifier words decide it.
/// Lookup is longest-phrase-first (see `metric::METRIC_PHRASES`).
pub const METRIC_PHRASES: &[(&str, &str, Option<SortDirection>)] = &[
    // Goals scored
    ("goals scored", "goals_for", None),
    ("most goals", "goals_for", Some(SortDirection::Desc)),
    ("scored the most", "goals_for", Some(SortDirection::Desc)),
    ("scored most goals", "goals_for", Some(SortDirection::Desc)),
    ("highest scoring", "goals_for", Some(SortDirection::Desc)),
    ("fewest goals", "goals_for", Some(SortDirection::Asc)),
    ("fewest goals scored", "goals_for", Some(SortDirection::Asc)),
    ("least goals scored", "goals_for", Some(SortDirection::Asc)),
    ("scored the fewest", "goals_for", Some(SortDirection::Asc)),
    ("scored the least", "goals_for", Some(SortDirection::Asc)),
    // Goals conceded
    ("conceded", "goals_against", None),
    ("goals conceded", "goals_against", None),
    ("goals against", "goals_against", None),
    ("most conceded", "goals_against", Some(SortDirection::Desc)),
    ("conceded the most", "goals_against", Some(SortDirection::Desc)),
    ("fewest conceded", "goals_against", Some(SortDirection::Asc)),
    ("fewest goals conceded", "goals_against", Some(SortDirection::Asc)),
    ("least conceded", "goals_against", Some(SortDirection::Asc)),
    ("conceded the fewest", "goals_against", Some(SortDirection::Asc)),
    ("conceded fewest", "goals_against", Some(SortDirection::Asc)),
    ("conceded most", "goals_against", Some(SortDirection::Desc)),
    ("conceded the least", "goals_against", Some(SortDirection::Asc)),
    ("best defense", "goals_against", Some(SortDirection::Asc)),
    ("best defence", "goals_against", Some(SortDirection::Asc)),
    // Goal difference
    ("goal difference", "goal_diff", None),
    ("best gd", "goal_diff", Some(SortDirection::Desc)),
    ("best goal difference", "goal_diff", Some(SortDirection::Desc)),
    ("worst goal difference", "goal_diff", Some(SortDirection::Asc)),
    ("highest goal difference", "goal_diff", Some(SortDirection::Desc)),
    ("lowest goal difference", "goal_diff", Some(SortDirection::Asc)),
    // Points
    ("points", "points", None),
    ("most points", "points", Some(SortDirection::Desc)),
    ("fewest points", "points", Some(SortDirection::Asc)),
    ("least points", "points", Some(SortDirection::Asc)),
    // Wins
    ("wins", "wins", None),
    ("most wins", "wins", Some(SortDirection::Desc)),
    ("won the most", "wins", Some(SortDirection::Desc)),
    ("most games won", "wins", Some(SortDirection::Desc)),
    ("fewest wins", "wins", Some(SortDirection::Asc)),
    ("least wins", "wins", Some(SortDirection::Asc)),
    // Draws
    ("draws", "draws", None),
    ("most draws", "draws", Some(SortDirection::Desc)),
    ("fewest draws", "draws", Some(SortDirection::Asc)),
    // Losses
    ("losses", "losses", None),
    ("most losses", "losses", Some(SortDirection::Desc)),
    ("lost the most", "losses", Some(SortDirection::Desc)),
    ("fewest losses", "losses", Some(SortDirection::Asc)),
    ("least losses", "losses", Some(SortDirection::Asc)),
    // Yellow cards
    ("yellow cards", "yellows", None),
    ("most yellows", "yellows", Some(SortDirection::Desc)),
    ("most yellow cards", "yellows", Some(SortDirection::Desc)),
    ("fewest yellow cards", "yellows", Some(SortDirection::Asc)),
    // Red cards
    ("red cards", "reds", None),
    ("most reds", "reds", Some(SortDirection::Desc)),
    ("most red cards", "reds", Some(SortDirection::Desc)),
    ("fewest red cards", "reds", Some(SortDirection::Asc)),
];

/// Exceptions to the generic modifier mapping, checked before anything else.
/// "Worst defense" concedes the most, so it is descending on goals_against
/// even though "worst" alone maps to ascending.
pub const DIRECTION_EXCEPTIONS: &[(&[&str], &str, SortDirection)] = &[
    (&["worst", "defense"], "goals_against", SortDirection::Desc),
    (&["worst", "defence"], "goals_against", SortDirection::Desc),
];

/// Match-record phrasing ("biggest home win"): about single fixtures, not clubs.
pub const MATCH_RECORD_CONTEXT: &[&str] = &[
    "home win",
    "away win",
    "match",
    "matches",
    "scoreline",
    "fixture",
    "fixtures",
    "scoring draw",
];

/// Words that mark a record/superlative question (ties may exist).
pub const SUPERLATIVE_WORDS: &[&str] = &[
    "most", "fewest", "highest", "lowest", "best", "worst", "biggest", "largest",
    "smallest", "least", "longest", "record", "top",
];
