//! Metric detection
//!
//! Resolves which `v_team_season_summary` column a question is about and in
//! which order records should be sorted.

use super::keywords::{ASC_MODIFIERS, DESC_MODIFIERS, DIRECTION_EXCEPTIONS, METRIC_PHRASES};
use super::SortDirection;
use crate::text::{contains_any, contains_phrase};
use lazy_static::lazy_static;

lazy_static! {
    /// Phrase table ordered longest first, so "fewest goals conceded" is tried
    /// before "goals conceded" and "conceded".
    static ref PHRASES_LONGEST_FIRST: Vec<(&'static str, &'static str, Option<SortDirection>)> = {
        let mut phrases = METRIC_PHRASES.to_vec();
        phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
        phrases
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricMatch {
    pub column: &'static str,
    pub direction: SortDirection,
}

/// Detect the metric column and direction from a normalized question.
pub fn detect_metric(q: &str) -> Option<MetricMatch> {
    for (words, column, direction) in DIRECTION_EXCEPTIONS {
        if words.iter().all(|w| contains_phrase(q, w)) {
            return Some(MetricMatch {
                column: *column,
                direction: *direction,
            });
        }
    }

    if let Some(&(_, column, direction)) = PHRASES_LONGEST_FIRST
        .iter()
        .find(|(phrase, _, _)| contains_phrase(q, phrase))
    {
        let direction = direction.unwrap_or_else(|| modifier_direction(q));
        return Some(MetricMatch { column, direction });
    }

    infer_from_keywords(q).map(|column| MetricMatch {
        column,
        direction: modifier_direction(q),
    })
}

/// Single-keyword fallback. Substring (stem) matching on purpose:
/// "concede" covers "conceded"/"conceding", "win" covers "winning".
fn infer_from_keywords(q: &str) -> Option<&'static str> {
    let has = |stem: &str| q.contains(stem);

    if has("goal difference") || contains_phrase(q, "gd") {
        Some("goal_diff")
    } else if has("goal") && (has("scored") || has("score") || has("scoring")) {
        Some("goals_for")
    } else if has("concede") {
        Some("goals_against")
    } else if has("point") {
        Some("points")
    } else if has("win") {
        Some("wins")
    } else if has("draw") {
        Some("draws")
    } else if has("loss") || has("lose") || has("lost") {
        Some("losses")
    } else if has("yellow") {
        Some("yellows")
    } else if has("red") && has("card") {
        Some("reds")
    } else {
        None
    }
}

/// Default descending; ascending modifiers take precedence over descending ones.
fn modifier_direction(q: &str) -> SortDirection {
    if contains_any(q, ASC_MODIFIERS) {
        SortDirection::Asc
    } else if contains_any(q, DESC_MODIFIERS) {
        SortDirection::Desc
    } else {
        SortDirection::Desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::normalize;

    fn detect(question: &str) -> Option<(&'static str, SortDirection)> {
        detect_metric(&normalize(question)).map(|m| (m.column, m.direction))
    }

    #[test]
    fn test_metric_detection() {
        let cases = [
            ("Which club scored the most goals?", "goals_for", SortDirection::Desc),
            ("Which team conceded the fewest goals?", "goals_against", SortDirection::Asc),
            ("Most points in a season", "points", SortDirection::Desc),
            ("Fewest wins by a team", "wins", SortDirection::Asc),
            ("Most losses in a season", "losses", SortDirection::Desc),
            ("Most yellow cards by a team", "yellows", SortDirection::Desc),
            ("Most red cards in a season", "reds", SortDirection::Desc),
            ("Best goal difference", "goal_diff", SortDirection::Desc),
            ("Worst defense in PL history", "goals_against", SortDirection::Desc),
            ("Which team has conceded the most goals overall?", "goals_against", SortDirection::Desc),
        ];
        for (question, column, direction) in cases {
            assert_eq!(detect(question), Some((column, direction)), "{}", question);
        }
    }

    #[test]
    fn test_generic_phrase_takes_question_modifier() {
        assert_eq!(
            detect("Which side has the lowest points haul?"),
            Some(("points", SortDirection::Asc))
        );
    }

    #[test]
    fn test_keyword_fallback() {
        assert_eq!(detect("Which team won the most games?"), Some(("wins", SortDirection::Desc)));
        assert_eq!(detect("Who lost fewest in 2004"), Some(("losses", SortDirection::Asc)));
    }

    #[test]
    fn test_no_metric() {
        assert_eq!(detect("Which club is the best?"), None);
    }

    #[test]
    fn test_phrase_table_is_longest_first() {
        let lengths: Vec<usize> = PHRASES_LONGEST_FIRST.iter().map(|p| p.0.len()).collect();
        assert!(lengths.windows(2).all(|w| w[0] >= w[1]));
    }
}
