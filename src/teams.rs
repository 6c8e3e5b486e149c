//! Team name lookup
//!
//! Maps the names people use for clubs to the canonical spelling stored in
//! the `team` / `squad` columns, so generated SQL can filter on exact values.

use crate::text::{contains_phrase, normalize};
use lazy_static::lazy_static;

/// Canonical team names as they appear in the database.
pub const CANONICAL_TEAM_NAMES: &[&str] = &[
    "Arsenal", "Aston Villa", "Barnsley", "Birmingham", "Blackburn", "Blackpool",
    "Bolton", "Bournemouth", "Bradford", "Brentford", "Brighton", "Burnley",
    "Cardiff", "Charlton", "Chelsea", "Coventry", "Crystal Palace", "Derby",
    "Everton", "Fulham", "Huddersfield", "Hull", "Ipswich", "Leeds", "Leicester",
    "Liverpool", "Luton", "Man City", "Man United", "Middlesbrough", "Newcastle",
    "Norwich", "Nott'm Forest", "Oldham", "Portsmouth", "QPR", "Reading",
    "Sheffield United", "Sheffield Weds", "Southampton", "Stoke", "Sunderland",
    "Swansea", "Swindon", "Tottenham", "Watford", "West Brom", "West Ham", "Wigan",
    "Wimbledon", "Wolves",
];

/// Nicknames and long-form names. Single generic words ("city", "united",
/// "forest", "wednesday", "rangers") are left out: they collide with ordinary
/// question text far more often than they name a club.
const TEAM_ALIASES: &[(&str, &str)] = &[
    ("the gunners", "Arsenal"), ("gunners", "Arsenal"), ("afc", "Arsenal"),
    ("villa", "Aston Villa"), ("avfc", "Aston Villa"),
    ("birmingham city", "Birmingham"),
    ("blackburn rovers", "Blackburn"),
    ("the seasiders", "Blackpool"),
    ("bolton wanderers", "Bolton"),
    ("afc bournemouth", "Bournemouth"), ("the cherries", "Bournemouth"), ("cherries", "Bournemouth"),
    ("bradford city", "Bradford"),
    ("the bees", "Brentford"),
    ("brighton and hove albion", "Brighton"), ("brighton & hove albion", "Brighton"), ("seagulls", "Brighton"),
    ("the clarets", "Burnley"), ("clarets", "Burnley"),
    ("cardiff city", "Cardiff"), ("bluebirds", "Cardiff"),
    ("charlton athletic", "Charlton"), ("addicks", "Charlton"),
    ("the blues", "Chelsea"), ("cfc", "Chelsea"),
    ("coventry city", "Coventry"), ("sky blues", "Coventry"),
    ("palace", "Crystal Palace"), ("cpfc", "Crystal Palace"),
    ("derby county", "Derby"), ("the rams", "Derby"),
    ("the toffees", "Everton"), ("toffees", "Everton"), ("efc", "Everton"),
    ("the cottagers", "Fulham"), ("cottagers", "Fulham"),
    ("huddersfield town", "Huddersfield"), ("the terriers", "Huddersfield"),
    ("hull city", "Hull"), ("the tigers", "Hull"),
    ("ipswich town", "Ipswich"), ("tractor boys", "Ipswich"),
    ("leeds united", "Leeds"), ("lufc", "Leeds"),
    ("leicester city", "Leicester"), ("the foxes", "Leicester"), ("foxes", "Leicester"), ("lcfc", "Leicester"),
    ("the reds", "Liverpool"), ("lfc", "Liverpool"),
    ("luton town", "Luton"), ("the hatters", "Luton"),
    ("manchester city", "Man City"), ("mcfc", "Man City"), ("the citizens", "Man City"), ("citizens", "Man City"),
    ("manchester united", "Man United"), ("man utd", "Man United"), ("mufc", "Man United"),
    ("the red devils", "Man United"), ("red devils", "Man United"),
    ("boro", "Middlesbrough"),
    ("newcastle united", "Newcastle"), ("the magpies", "Newcastle"), ("magpies", "Newcastle"),
    ("nufc", "Newcastle"), ("toon", "Newcastle"),
    ("norwich city", "Norwich"), ("the canaries", "Norwich"), ("canaries", "Norwich"),
    ("nottingham forest", "Nott'm Forest"), ("nffc", "Nott'm Forest"),
    ("oldham athletic", "Oldham"),
    ("pompey", "Portsmouth"),
    ("queens park rangers", "QPR"), ("queen's park rangers", "QPR"),
    ("the royals", "Reading"),
    ("sheffield utd", "Sheffield United"), ("the blades", "Sheffield United"), ("sufc", "Sheffield United"),
    ("sheffield wednesday", "Sheffield Weds"), ("the owls", "Sheffield Weds"),
    ("the saints", "Southampton"),
    ("stoke city", "Stoke"), ("the potters", "Stoke"),
    ("the black cats", "Sunderland"), ("black cats", "Sunderland"), ("safc", "Sunderland"),
    ("swansea city", "Swansea"), ("the swans", "Swansea"),
    ("swindon town", "Swindon"),
    ("tottenham hotspur", "Tottenham"), ("spurs", "Tottenham"), ("thfc", "Tottenham"),
    ("the hornets", "Watford"), ("hornets", "Watford"),
    ("west bromwich albion", "West Brom"), ("west bromwich", "West Brom"), ("the baggies", "West Brom"),
    ("baggies", "West Brom"), ("wba", "West Brom"),
    ("west ham united", "West Ham"), ("the hammers", "West Ham"), ("hammers", "West Ham"), ("whufc", "West Ham"),
    ("wigan athletic", "Wigan"), ("the latics", "Wigan"),
    ("the dons", "Wimbledon"),
    ("wolverhampton wanderers", "Wolves"), ("wolverhampton", "Wolves"),
];

lazy_static! {
    /// Canonical names and aliases folded into one lowercase table,
    /// longest phrase first so "man united" wins over "united"-style prefixes.
    static ref LOOKUP: Vec<(String, &'static str)> = {
        let mut entries: Vec<(String, &'static str)> = CANONICAL_TEAM_NAMES
            .iter()
            .map(|name| (name.to_lowercase(), *name))
            .chain(TEAM_ALIASES.iter().map(|(alias, name)| (alias.to_string(), *name)))
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        entries
    };
}

/// First team mentioned in the question.
pub fn find_team(question: &str) -> Option<&'static str> {
    find_all_teams(question).into_iter().next()
}

/// All distinct teams mentioned, in order of first appearance in the question.
pub fn find_all_teams(question: &str) -> Vec<&'static str> {
    let q = normalize(question);
    let mut hits: Vec<(usize, &'static str)> = Vec::new();
    for (phrase, name) in LOOKUP.iter() {
        if hits.iter().any(|(_, seen)| seen == name) {
            continue;
        }
        if contains_phrase(&q, phrase) {
            let position = q.find(phrase.as_str()).unwrap_or(usize::MAX);
            hits.push((position, *name));
        }
    }
    hits.sort_by_key(|(position, _)| *position);
    hits.into_iter().map(|(_, name)| name).collect()
}

/// Hint telling the generator which exact team spelling(s) to filter on.
pub fn team_filter_hint(question: &str) -> Option<String> {
    let teams = find_all_teams(question);
    match teams.as_slice() {
        [] => None,
        [team] => Some(format!(
            "TEAM FILTER: The question mentions '{}'. Use WHERE team = '{}' (exact match, case-sensitive).",
            team,
            sql_literal(team)
        )),
        many => {
            let list = many
                .iter()
                .map(|t| format!("'{}'", sql_literal(t)))
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!(
                "TEAM FILTER: The question mentions multiple teams: {}. Use WHERE team IN ({}) (exact match, case-sensitive).",
                list, list
            ))
        }
    }
}

fn sql_literal(name: &str) -> String {
    name.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_and_alias_lookup() {
        assert_eq!(find_team("How many titles have Arsenal won?"), Some("Arsenal"));
        assert_eq!(find_team("Best season for the Red Devils"), Some("Man United"));
        assert_eq!(find_team("spurs vs the hammers"), Some("Tottenham"));
        assert_eq!(find_team("What's the weather like?"), None);
    }

    #[test]
    fn test_longest_alias_wins() {
        assert_eq!(find_team("Manchester City goals"), Some("Man City"));
        assert_eq!(find_team("Sheffield Wednesday record"), Some("Sheffield Weds"));
    }

    #[test]
    fn test_no_partial_word_hits() {
        // "rams" inside "programs", "toon" inside "cartoon".
        assert_eq!(find_team("cartoon programs"), None);
    }

    #[test]
    fn test_multi_team_hint_escapes_quotes() {
        let hint = team_filter_hint("Liverpool vs Nottingham Forest head to head").unwrap();
        assert!(hint.contains("'Liverpool'"));
        assert!(hint.contains("'Nott''m Forest'"));
        assert!(hint.contains("IN ("));
    }
}
