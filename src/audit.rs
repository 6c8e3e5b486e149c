//! Source-Mismatch Auditor
//!
//! Cross-checks the relations a validated query reads against the routing
//! decision for its question. Produces advisories, never errors: the query
//! is safe, it just probably answers the wrong question.

use crate::error::Advisory;
use crate::routing::{Intent, RoutingDecision};
use crate::sql::relations::{
    relation_kind, RelationKind, PL_SEASON_TABLE, RAW_MATCH_RELATIONS, V_PLAYER_TOTALS_BY_SQUAD,
};
use crate::sql::{parse, SqlShape};

/// Audit validated SQL against the routing decision. Unparseable SQL is not
/// this function's concern and yields `None`.
pub fn audit_source(sql: &str, decision: &RoutingDecision) -> Option<Advisory> {
    let statements = parse(sql).ok()?;
    let statement = statements.first()?;
    audit_shape(&SqlShape::of(statement), decision)
}

pub fn audit_shape(shape: &SqlShape, decision: &RoutingDecision) -> Option<Advisory> {
    let relations = shape.base_relation_names();
    if relations.is_empty() {
        return None;
    }
    let kinds: Vec<RelationKind> = relations.iter().map(|r| relation_kind(r)).collect();
    let reads_player = kinds.contains(&RelationKind::Player);
    let only_team = kinds
        .iter()
        .all(|k| matches!(k, RelationKind::Team | RelationKind::Streak));

    let message = match decision.intent {
        Intent::MetricSeason | Intent::MetricAllTime if reads_player => {
            let offender = relations
                .iter()
                .find(|r| relation_kind(r) == RelationKind::Player)
                .map(String::as_str)
                .unwrap_or(V_PLAYER_TOTALS_BY_SQUAD);
            Some(format!(
                "WRONG SOURCE: Question is about club-level season metrics (intent={}) but query uses {}. \
                 Use {} instead. {} is for player stats, not club aggregates.",
                decision.intent, offender, decision.recommended_relation, offender
            ))
        }

        Intent::Titles if !shape.reads(PL_SEASON_TABLE) => Some(
            "WRONG SOURCE: Question is about titles/championships. \
             Use pl_season_table with rank=1 filter."
                .to_string(),
        ),
        Intent::Titles if !shape.has_equality("rank", "1") => Some(
            "MISSING FILTER: For title questions, must filter WHERE rank = 1 \
             to count only championship seasons."
                .to_string(),
        ),

        Intent::MatchConditional => {
            let view = decision.recommended_relation.as_str();
            let raw = relations
                .iter()
                .any(|r| RAW_MATCH_RELATIONS.contains(&r.as_str()));
            if view.starts_with("v_team_") && !shape.reads(view) && raw {
                Some(format!(
                    "WRONG SOURCE: Use precomputed {} for streak questions. \
                     Do NOT compute streaks manually from pl_matches.",
                    view
                ))
            } else {
                None
            }
        }

        Intent::PlayerForClub if only_team => Some(format!(
            "WRONG SOURCE: Question is about players at a club but query reads only team-level \
             relations ({}). Use {} instead.",
            relations.join(", "),
            decision.recommended_relation
        )),

        _ => None,
    };

    message.map(Advisory::SourceMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route;

    #[test]
    fn test_club_season_question_on_player_view() {
        let decision = route("Which club scored the most goals in a single Premier League season?");
        let advisory = audit_source(
            "SELECT squad, SUM(goals) AS goals FROM public.v_player_totals_by_squad \
             GROUP BY squad ORDER BY goals DESC LIMIT 1",
            &decision,
        )
        .unwrap();
        let text = advisory.to_string();
        assert!(text.contains("WRONG SOURCE"));
        assert!(text.contains("v_team_season_summary"));
        assert!(text.contains("v_player_totals_by_squad"));
    }

    #[test]
    fn test_correct_source_passes() {
        let decision = route("Which club scored the most goals in a single Premier League season?");
        assert!(audit_source(
            "SELECT team, season_start, goals_for FROM public.v_team_season_summary \
             ORDER BY goals_for DESC LIMIT 1",
            &decision
        )
        .is_none());
    }

    #[test]
    fn test_titles_need_rank_filter() {
        let decision = route("Who has the most Premier League titles?");
        let missing = audit_source(
            "SELECT team, COUNT(*) AS n FROM pl_season_table GROUP BY team LIMIT 5",
            &decision,
        )
        .unwrap();
        assert!(missing.message().starts_with("MISSING FILTER"));

        let wrong = audit_source("SELECT team FROM v_team_season_summary LIMIT 5", &decision).unwrap();
        assert!(wrong.message().starts_with("WRONG SOURCE"));

        assert!(audit_source(
            "SELECT team, COUNT(*) AS titles FROM pl_season_table WHERE rank = 1 GROUP BY team LIMIT 5",
            &decision
        )
        .is_none());
    }

    #[test]
    fn test_streaks_from_raw_matches() {
        let decision = route("Which team has the longest unbeaten run?");
        let advisory = audit_source("SELECT home_team FROM pl_matches LIMIT 10", &decision).unwrap();
        assert!(advisory.message().contains("v_team_unbeaten_streaks"));
        assert!(audit_source(
            "SELECT team, games FROM v_team_unbeaten_streaks ORDER BY games DESC LIMIT 1",
            &decision
        )
        .is_none());
    }

    #[test]
    fn test_player_for_club_on_team_view() {
        let decision = route("Who is the top scorer for Arsenal?");
        let advisory = audit_source(
            "SELECT team, goals_for FROM v_team_season_summary WHERE team = 'Arsenal' LIMIT 1",
            &decision,
        )
        .unwrap();
        assert!(advisory.message().contains("v_player_totals_by_squad"));
    }

    #[test]
    fn test_not_applicable_is_never_audited() {
        let decision = route("Which player scored the most goals?");
        assert!(audit_source("SELECT team FROM v_team_season_summary LIMIT 1", &decision).is_none());
    }
}
