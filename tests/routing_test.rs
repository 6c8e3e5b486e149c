use pl_copilot::routing::{routing_hint, SortDirection};
use pl_copilot::{
    audit_source, route, validate_and_patch, Advisory, Intent, Router, RouterPolicy, SchemaSnapshot,
    ValidationError,
};

fn validate(sql: &str) -> Result<pl_copilot::ValidatedQuery, ValidationError> {
    let snapshot = SchemaSnapshot::relations_only();
    validate_and_patch(sql, 200, &snapshot.allowed, None)
}

#[test]
fn test_title_keywords_take_precedence_over_season_scope() {
    let decision = route("Which club won the title in a single season with the most points?");
    assert_eq!(decision.intent, Intent::Titles);
    assert_eq!(decision.recommended_relation, "pl_season_table");
}

#[test]
fn test_fewest_goals_conceded_in_a_season() {
    let decision = route("Which team conceded the fewest goals in a Premier League season?");
    assert_eq!(decision.intent, Intent::MetricSeason);
    assert_eq!(decision.column.as_deref(), Some("goals_against"));
    assert_eq!(decision.sort_direction, SortDirection::Asc);
    assert!(!decision.ambiguous);
}

#[test]
fn test_most_titles_uses_standings_with_top_rank_filter() {
    let decision = route("Who has the most Premier League titles?");
    assert_eq!(decision.intent, Intent::Titles);
    assert_eq!(decision.recommended_relation, "pl_season_table");
    assert!(decision.hint.as_deref().unwrap().contains("top rank only"));
    assert!(routing_hint(&decision, 200).unwrap().contains("WHERE rank = 1"));
}

#[test]
fn test_unscoped_metric_follows_policy() {
    let question = "Which club has the most wins?";
    assert_eq!(route(question).intent, Intent::MetricSeason);

    let router = Router::new(RouterPolicy {
        default_unscoped_to_season: false,
    });
    let decision = router.route(question);
    assert_eq!(decision.intent, Intent::Ambiguous);
    assert!(decision.ambiguous);
}

#[test]
fn test_player_questions_are_out_of_club_scope() {
    let decision = route("Which player has the most assists?");
    assert_eq!(decision.intent, Intent::NotApplicable);
    assert!(decision.recommended_relation.is_empty());
    assert!(routing_hint(&decision, 200).is_none());
}

#[test]
fn test_club_season_question_on_player_totals_is_flagged() {
    let question = "Which club scored the most goals in a single Premier League season?";
    let snapshot = SchemaSnapshot::relations_only();
    let validated = validate_and_patch(
        "SELECT squad, SUM(goals) AS goals FROM v_player_totals_by_squad GROUP BY squad ORDER BY goals DESC",
        200,
        &snapshot.allowed,
        Some(question),
    )
    .unwrap();
    assert!(matches!(validated.warning, Some(Advisory::IntentMismatch(_))));

    let advisory = audit_source(&validated.sql, &route(question)).unwrap();
    assert!(matches!(advisory, Advisory::SourceMismatch(_)));
    assert!(advisory.message().contains("WRONG SOURCE"));
    assert!(advisory.message().contains("v_team_season_summary"));
}

#[test]
fn test_guardrails_reject_writes_and_stacked_statements() {
    assert!(matches!(
        validate("UPDATE pl_season_table SET points = 0"),
        Err(ValidationError::WriteNotAllowed(_))
    ));
    assert!(matches!(
        validate("SELECT team FROM pl_season_table; DROP TABLE pl_matches"),
        Err(ValidationError::MultipleStatements(_)) | Err(ValidationError::WriteNotAllowed(_))
    ));
    assert_eq!(
        validate("SELECT 1 FROM v_team_matches; SELECT 2 FROM v_team_matches").unwrap_err(),
        ValidationError::MultipleStatements(2)
    );
}

#[test]
fn test_limit_patch_is_idempotent() {
    let first = validate("SELECT team FROM v_team_season_summary").unwrap();
    assert!(first.limit_patched);
    assert!(first.sql.ends_with("LIMIT 200"));

    let second = validate(&first.sql).unwrap();
    assert!(!second.limit_patched);
    assert_eq!(second.sql, first.sql);

    let explicit = validate("SELECT team FROM v_team_season_summary LIMIT 7").unwrap();
    assert!(explicit.sql.ends_with("LIMIT 7"));
}

#[test]
fn test_relation_and_set_operation_policy() {
    assert_eq!(
        validate("SELECT * FROM pg_user UNION ALL SELECT * FROM v_team_matches").unwrap_err(),
        ValidationError::DisallowedRelation(vec!["pg_user".to_string()])
    );
    assert_eq!(
        validate("SELECT team FROM v_team_matches JOIN pl_matches ON true").unwrap_err(),
        ValidationError::JoinNotAllowed
    );
    assert!(validate("SELECT team FROM v_team_win_streaks UNION ALL SELECT team FROM v_team_unbeaten_streaks").is_ok());
    for op in ["UNION", "INTERSECT", "EXCEPT"] {
        let sql = format!("SELECT team FROM v_team_win_streaks {} SELECT team FROM v_team_unbeaten_streaks", op);
        assert!(
            matches!(validate(&sql), Err(ValidationError::SetOperationNotAllowed(_))),
            "{} should be rejected",
            op
        );
    }
}
