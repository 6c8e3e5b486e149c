//! Classification rules
//!
//! An explicit, ordered rule list. Rules are evaluated top to bottom and the
//! first match wins, so precedence is part of the contract (a question with
//! both title and season wording is a title question).

use super::keywords::*;
use super::metric::{detect_metric, MetricMatch};
use super::{Intent, RouterPolicy};
use crate::teams;
use crate::text::{contains_any, normalize};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Explicit season references: "2004", "2017/18", "2019-20".
    static ref SEASON_YEAR: Regex = Regex::new(r"\b(19|20)\d{2}([/-]\d{2,4})?\b").unwrap();
}

/// Everything the rules need to know about a question, computed once.
#[derive(Debug, Clone)]
pub struct QuestionSignals {
    pub normalized: String,
    pub club: bool,
    pub player_context: bool,
    pub match_record_context: bool,
    pub superlative: bool,
    pub title: bool,
    pub match_conditional: bool,
    pub player_for_club: bool,
    pub season_scope: bool,
    pub season_year: bool,
    pub all_time_scope: bool,
    pub metric: Option<MetricMatch>,
}

impl QuestionSignals {
    pub fn from_question(question: &str) -> Self {
        let q = normalize(question);
        let club = contains_any(&q, CLUB_IDENTIFIERS) || teams::find_team(question).is_some();
        Self {
            club,
            player_context: contains_any(&q, PLAYER_CONTEXT),
            match_record_context: contains_any(&q, MATCH_RECORD_CONTEXT),
            superlative: contains_any(&q, SUPERLATIVE_WORDS),
            title: contains_any(&q, TITLE_KEYWORDS),
            match_conditional: contains_any(&q, MATCH_CONDITIONAL_KEYWORDS),
            player_for_club: contains_any(&q, PLAYER_FOR_CLUB_KEYWORDS),
            season_scope: contains_any(&q, SEASON_SCOPE_KEYWORDS),
            season_year: SEASON_YEAR.is_match(&q),
            all_time_scope: contains_any(&q, ALL_TIME_SCOPE_KEYWORDS),
            metric: detect_metric(&q),
            normalized: q,
        }
    }

    /// Any wording that makes this an analytical question at all.
    fn analytical(&self) -> bool {
        self.superlative || self.metric.is_some() || self.title || self.match_conditional
    }

    /// Questions the club router has no business answering: no club or
    /// analytical wording, or player/match-record phrasing with no club named.
    fn out_of_scope(&self) -> bool {
        if self.club {
            return false;
        }
        !self.analytical() || self.player_context || self.match_record_context
    }
}

pub struct ClassificationRule {
    pub name: &'static str,
    pub intent: Intent,
    pub matches: fn(&QuestionSignals, &RouterPolicy) -> bool,
}

/// Evaluated in order; the catch-all `Ambiguous` rule always matches last.
pub const RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "not-club-scope",
        intent: Intent::NotApplicable,
        matches: |s, _| s.out_of_scope(),
    },
    ClassificationRule {
        name: "titles",
        intent: Intent::Titles,
        matches: |s, _| s.title,
    },
    ClassificationRule {
        name: "match-conditional",
        intent: Intent::MatchConditional,
        matches: |s, _| s.match_conditional,
    },
    ClassificationRule {
        name: "player-for-club",
        intent: Intent::PlayerForClub,
        matches: |s, _| s.player_for_club,
    },
    ClassificationRule {
        name: "season-scope",
        intent: Intent::MetricSeason,
        matches: |s, _| s.season_scope,
    },
    ClassificationRule {
        name: "all-time-scope",
        intent: Intent::MetricAllTime,
        matches: |s, _| s.all_time_scope,
    },
    ClassificationRule {
        name: "unscoped-metric-defaults-to-season",
        intent: Intent::MetricSeason,
        matches: |s, policy| policy.default_unscoped_to_season && s.metric.is_some(),
    },
    ClassificationRule {
        name: "ambiguous",
        intent: Intent::Ambiguous,
        matches: |_, _| true,
    },
];

/// First matching rule for the question.
pub fn classify(signals: &QuestionSignals, policy: &RouterPolicy) -> &'static ClassificationRule {
    RULES
        .iter()
        .find(|rule| (rule.matches)(signals, policy))
        .unwrap_or(&RULES[RULES.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent_of(question: &str) -> Intent {
        classify(&QuestionSignals::from_question(question), &RouterPolicy::default()).intent
    }

    #[test]
    fn test_catch_all_is_last() {
        let last = RULES.last().unwrap();
        assert_eq!(last.intent, Intent::Ambiguous);
        assert!((last.matches)(&QuestionSignals::from_question(""), &RouterPolicy::default()));
    }

    #[test]
    fn test_season_year_pattern() {
        let signals = QuestionSignals::from_question("Arsenal unbeaten run in 2003/04");
        assert!(signals.season_year);
        assert!(!signals.season_scope);
    }

    #[test]
    fn test_titles_precede_season_scope() {
        assert_eq!(intent_of("Which club won the title with the most points in a season?"), Intent::Titles);
    }

    #[test]
    fn test_policy_can_disable_unscoped_default() {
        let signals = QuestionSignals::from_question("Which team has the most red cards?");
        let strict = RouterPolicy { default_unscoped_to_season: false };
        assert_eq!(classify(&signals, &RouterPolicy::default()).intent, Intent::MetricSeason);
        assert_eq!(classify(&signals, &strict).intent, Intent::Ambiguous);
    }
}
