//! Intent Router
//!
//! Maps a free-text question to a `RoutingDecision`: which relation should
//! answer it, which metric column, which sort direction, and whether the
//! question is too ambiguous to answer without clarification.
//! Pure and total: no I/O, never fails.

pub mod keywords;
pub mod metric;
pub mod rules;

use crate::sql::relations::{
    CLARIFICATION_CANDIDATES, PL_SEASON_TABLE, STREAK_RELATIONS, V_PLAYER_TOTALS_BY_SQUAD,
    V_TEAM_CLEAN_SHEET_STREAKS, V_TEAM_CLEAN_SHEET_STREAKS_SEASON, V_TEAM_MATCHES,
    V_TEAM_SCORING_STREAKS, V_TEAM_SCORING_STREAKS_SEASON, V_TEAM_SEASON_SUMMARY,
    V_TEAM_UNBEATEN_STREAKS, V_TEAM_UNBEATEN_STREAKS_SEASON, V_TEAM_WIN_STREAKS,
};
use crate::text::{contains_any, contains_phrase, normalize};
use rules::{classify, QuestionSignals};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel returned instead of an answer when automated resolution failed.
pub const RETRY_TOKEN: &str = "<<NEED_SCHEMA_OR_CLARIFICATION_RETRY>>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Titles,
    MatchConditional,
    PlayerForClub,
    MetricSeason,
    MetricAllTime,
    Ambiguous,
    NotApplicable,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Titles => "titles",
            Intent::MatchConditional => "match_conditional",
            Intent::PlayerForClub => "player_for_club",
            Intent::MetricSeason => "metric_season",
            Intent::MetricAllTime => "metric_all_time",
            Intent::Ambiguous => "ambiguous",
            Intent::NotApplicable => "not_applicable",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of routing one question. Built fresh per question, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub intent: Intent,
    /// Empty for `NotApplicable`.
    pub recommended_relation: String,
    pub column: Option<String>,
    pub sort_direction: SortDirection,
    pub needs_aggregation: bool,
    pub ambiguous: bool,
    pub retry_reason: Option<String>,
    pub hint: Option<String>,
    /// Relations offered for a clarification prompt when ambiguous.
    pub candidate_relations: Vec<String>,
    /// Record/superlative phrasing ("most", "fewest", ...): ties may exist.
    pub superlative: bool,
}

impl RoutingDecision {
    fn new(intent: Intent, relation: &str, signals: &QuestionSignals) -> Self {
        Self {
            intent,
            recommended_relation: relation.to_string(),
            column: None,
            sort_direction: SortDirection::Desc,
            needs_aggregation: false,
            ambiguous: false,
            retry_reason: None,
            hint: None,
            candidate_relations: Vec::new(),
            superlative: signals.superlative,
        }
    }

    fn ambiguous_because(mut self, reason: &str) -> Self {
        self.ambiguous = true;
        self.retry_reason = Some(reason.to_string());
        self.candidate_relations = CLARIFICATION_CANDIDATES.iter().map(|r| r.to_string()).collect();
        self
    }

    fn with_hint(mut self, hint: String) -> Self {
        self.hint = Some(hint);
        self
    }
}

/// Tunable routing heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterPolicy {
    /// A metric question with no scope wording is read as single-season.
    pub default_unscoped_to_season: bool,
}

impl Default for RouterPolicy {
    fn default() -> Self {
        Self {
            default_unscoped_to_season: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Router {
    policy: RouterPolicy,
}

impl Router {
    pub fn new(policy: RouterPolicy) -> Self {
        Self { policy }
    }

    pub fn route(&self, question: &str) -> RoutingDecision {
        let signals = QuestionSignals::from_question(question);
        let rule = classify(&signals, &self.policy);
        build_decision(rule.intent, &signals)
    }
}

/// Route with the default policy.
pub fn route(question: &str) -> RoutingDecision {
    Router::default().route(question)
}

fn build_decision(intent: Intent, signals: &QuestionSignals) -> RoutingDecision {
    match intent {
        Intent::NotApplicable => RoutingDecision::new(intent, "", signals)
            .with_hint("This does not appear to be a club-level question.".to_string()),

        Intent::Titles => {
            let mut decision = RoutingDecision::new(intent, PL_SEASON_TABLE, signals);
            decision.column = Some("rank".to_string());
            decision.with_hint(
                "Use pl_season_table with a top rank only filter (rank = 1). \
                 Pattern: SELECT team, COUNT(*) AS titles FROM public.pl_season_table \
                 WHERE rank = 1 GROUP BY team ORDER BY titles DESC LIMIT N"
                    .to_string(),
            )
        }

        Intent::MatchConditional => {
            let view = streak_view(signals);
            RoutingDecision::new(intent, view, signals).with_hint(format!(
                "Use public.{} for this streak/match-conditional question. \
                 Do NOT compute streaks manually from pl_matches.",
                view
            ))
        }

        Intent::PlayerForClub => RoutingDecision::new(intent, V_PLAYER_TOTALS_BY_SQUAD, signals)
            .with_hint(
                "Use v_player_totals_by_squad for player stats at a specific club. \
                 Pattern: SELECT player, goals, assists FROM public.v_player_totals_by_squad \
                 WHERE squad = 'ClubName' ORDER BY goals DESC LIMIT N"
                    .to_string(),
            ),

        Intent::MetricSeason | Intent::MetricAllTime => {
            let all_time = intent == Intent::MetricAllTime;
            let mut decision = RoutingDecision::new(intent, V_TEAM_SEASON_SUMMARY, signals);
            decision.needs_aggregation = all_time;
            match &signals.metric {
                None if all_time => decision
                    .ambiguous_because(
                        "Cannot determine which metric column to aggregate for all-time query.",
                    )
                    .with_hint(
                        "Use v_team_season_summary with SUM + GROUP BY but could not detect column."
                            .to_string(),
                    ),
                None => decision
                    .ambiguous_because("Cannot determine which metric column to use for season query.")
                    .with_hint(
                        "Use v_team_season_summary but could not detect specific column.".to_string(),
                    ),
                Some(m) => {
                    decision.column = Some(m.column.to_string());
                    decision.sort_direction = m.direction;
                    let hint = if all_time {
                        format!(
                            "Use v_team_season_summary with SUM for all-time aggregates. \
                             Column: {col}, Direction: {dir}. \
                             Pattern: SELECT team, SUM({col}) AS total_{col} \
                             FROM public.v_team_season_summary GROUP BY team \
                             ORDER BY total_{col} {dir} NULLS LAST LIMIT N",
                            col = m.column,
                            dir = m.direction
                        )
                    } else {
                        format!(
                            "Use v_team_season_summary for single-season club metrics. \
                             Column: {col}, Direction: {dir}. \
                             Pattern: SELECT team, season_start, {col} FROM public.v_team_season_summary \
                             ORDER BY {col} {dir} NULLS LAST LIMIT N",
                            col = m.column,
                            dir = m.direction
                        )
                    };
                    decision.with_hint(hint)
                }
            }
        }

        Intent::Ambiguous => RoutingDecision::new(intent, V_TEAM_SEASON_SUMMARY, signals)
            .ambiguous_because(
                "Cannot determine if user wants single season or all-time aggregate, \
                 or which metric column to use.",
            )
            .with_hint("Routing is ambiguous. Consider asking for clarification.".to_string()),
    }
}

/// Precomputed streak relation for a match-conditional question.
fn streak_view(signals: &QuestionSignals) -> &'static str {
    let q = signals.normalized.as_str();
    let season = signals.season_scope || signals.season_year;
    let pick = |base: &'static str, seasonal: &'static str| if season { seasonal } else { base };
    let run_words = contains_any(q, &["streak", "streaks", "consecutive", "in a row", "run"]);

    if contains_any(
        q,
        &["clean sheet", "clean sheets", "shutout", "shutouts", "not conceding", "without conceding"],
    ) {
        pick(V_TEAM_CLEAN_SHEET_STREAKS, V_TEAM_CLEAN_SHEET_STREAKS_SEASON)
    } else if contains_phrase(q, "winning") || (contains_any(q, &["win", "wins"]) && run_words) {
        V_TEAM_WIN_STREAKS
    } else if contains_any(q, &["unbeaten", "without losing"]) {
        pick(V_TEAM_UNBEATEN_STREAKS, V_TEAM_UNBEATEN_STREAKS_SEASON)
    } else if contains_phrase(q, "scoring") && run_words {
        pick(V_TEAM_SCORING_STREAKS, V_TEAM_SCORING_STREAKS_SEASON)
    } else {
        V_TEAM_MATCHES
    }
}

/// Routing hint injected into the first generation prompt, with a reference
/// SQL shape when one exists. `None` for questions outside club scope.
pub fn routing_hint(decision: &RoutingDecision, limit: u64) -> Option<String> {
    if decision.intent == Intent::NotApplicable {
        return None;
    }
    if decision.ambiguous {
        return Some(format!(
            "CLUB METRIC ROUTING (AMBIGUOUS): Recommended view: {}. Warning: {}",
            decision.recommended_relation,
            decision.retry_reason.as_deref().unwrap_or("routing is uncertain")
        ));
    }
    let mut hint = format!(
        "CLUB METRIC ROUTING: Intent={}, View={}. {}",
        decision.intent,
        decision.recommended_relation,
        decision.hint.as_deref().unwrap_or_default()
    );
    if let Some(template) = sql_template(decision, limit) {
        hint.push_str("\nReference SQL:\n");
        hint.push_str(&template);
    }
    Some(hint)
}

/// Reference query for an unambiguous decision.
pub fn sql_template(decision: &RoutingDecision, limit: u64) -> Option<String> {
    if decision.ambiguous {
        return None;
    }
    let direction = decision.sort_direction.as_sql();
    match (decision.intent, decision.column.as_deref()) {
        (Intent::Titles, _) => Some(format!(
            "SELECT team, COUNT(*) AS titles\n\
             FROM public.pl_season_table\n\
             WHERE rank = 1\n\
             GROUP BY team\n\
             ORDER BY titles DESC\n\
             LIMIT {}",
            limit
        )),
        (Intent::MetricSeason, Some(column)) => Some(format!(
            "SELECT team, season_start, {col}\n\
             FROM public.v_team_season_summary\n\
             WHERE {col} = (SELECT {agg}({col}) FROM public.v_team_season_summary)\n\
             ORDER BY {col} {dir} NULLS LAST\n\
             LIMIT {limit}",
            col = column,
            agg = if decision.sort_direction == SortDirection::Asc { "MIN" } else { "MAX" },
            dir = direction,
            limit = limit
        )),
        (Intent::MetricAllTime, Some(column)) => Some(format!(
            "SELECT team, SUM({col}) AS total_{col}\n\
             FROM public.v_team_season_summary\n\
             GROUP BY team\n\
             ORDER BY total_{col} {dir} NULLS LAST\n\
             LIMIT {limit}",
            col = column,
            dir = direction,
            limit = limit
        )),
        (Intent::PlayerForClub, _) => Some(format!(
            "SELECT squad, player, goals, assists, minutes\n\
             FROM public.v_player_totals_by_squad\n\
             WHERE squad = '{{club_name}}'\n\
             ORDER BY goals DESC NULLS LAST\n\
             LIMIT {}",
            limit
        )),
        _ => None,
    }
}

/// Hint listing the precomputed streak relations, for streak-style questions.
pub fn streak_view_hint(question: &str) -> Option<String> {
    let q = normalize(question);
    if !contains_any(&q, keywords::MATCH_CONDITIONAL_KEYWORDS) {
        return None;
    }
    let views = STREAK_RELATIONS
        .iter()
        .map(|r| format!("public.{}", r))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "STREAK VIEWS: Streaks are precomputed in {}. Views ending in _season restart \
         every season; the others run across seasons. Order by the streak length column \
         (win_streak or games) instead of rebuilding runs with window functions over pl_matches.",
        views
    ))
}

/// Structured sentinel text for a run that could not be resolved.
pub fn format_retry_token(question: &str, decision: &RoutingDecision) -> String {
    let candidates = if decision.candidate_relations.is_empty() {
        CLARIFICATION_CANDIDATES.join(", ")
    } else {
        decision.candidate_relations.join(", ")
    };
    format!(
        "{}\nRETRY_REASON: {}\nCANDIDATE_SOURCES: [{}]\nQUESTION: \"{}\"",
        RETRY_TOKEN,
        decision.retry_reason.as_deref().unwrap_or("unresolved"),
        candidates,
        question
    )
}
