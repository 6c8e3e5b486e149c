//! Allowed schema and schema providers
//!
//! The validator checks generated SQL against an `AllowedSchema`; prompts
//! embed the snapshot's documentation text. A snapshot is shared as an
//! `Arc` so a refresh never changes what an in-flight request sees.

use crate::error::Result;
use crate::sql::relations::{ALLOWED_RELATIONS, DEFAULT_SCHEMA};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Relation name to allowed column names. An empty column set means the
/// relation is allowed but its columns are not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedSchema {
    relations: BTreeMap<String, BTreeSet<String>>,
}

impl AllowedSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relations(names: &[&str]) -> Self {
        let mut schema = Self::new();
        for name in names {
            schema.insert_relation(name, Vec::<String>::new());
        }
        schema
    }

    pub fn insert_relation<I, S>(&mut self, name: &str, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns
            .into_iter()
            .map(|c| c.into().to_lowercase())
            .collect::<BTreeSet<_>>();
        self.relations.insert(name.to_lowercase(), columns);
    }

    pub fn contains_relation(&self, name: &str) -> bool {
        self.relations.contains_key(&name.to_lowercase())
    }

    pub fn columns(&self, relation: &str) -> Option<&BTreeSet<String>> {
        self.relations.get(&relation.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

/// One column of an introspected relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// Schema as seen by one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Documentation injected into generation prompts.
    pub schema_text: String,
    pub allowed: AllowedSchema,
    pub fetched_at: DateTime<Utc>,
}

impl SchemaSnapshot {
    /// Build from introspected columns, in `ALLOWED_RELATIONS` order.
    /// Relations missing from `columns` are listed as not found and allowed
    /// without a column check.
    pub fn from_columns(columns: &BTreeMap<String, Vec<ColumnInfo>>) -> Self {
        let mut allowed = AllowedSchema::new();
        let mut lines = vec!["DATABASE SCHEMA (Postgres):".to_string()];
        for relation in ALLOWED_RELATIONS {
            match columns.get(*relation) {
                Some(cols) if !cols.is_empty() => {
                    let listed = cols
                        .iter()
                        .map(|c| format!("{} ({})", c.name, c.data_type))
                        .collect::<Vec<_>>()
                        .join(", ");
                    lines.push(format!("- {}.{}: {}", DEFAULT_SCHEMA, relation, listed));
                    allowed.insert_relation(relation, cols.iter().map(|c| c.name.clone()));
                }
                _ => {
                    lines.push(format!("- {}.{}: (not found)", DEFAULT_SCHEMA, relation));
                    allowed.insert_relation(relation, Vec::<String>::new());
                }
            }
        }
        lines.push(String::new());
        lines.push(SCHEMA_GLOSSARY.to_string());

        Self {
            schema_text: lines.join("\n"),
            allowed,
            fetched_at: Utc::now(),
        }
    }

    /// Snapshot with the allow-list only and no column information.
    pub fn relations_only() -> Self {
        Self::from_columns(&BTreeMap::new())
    }
}

#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Current snapshot. Callers hold the returned `Arc` for the whole request.
    async fn snapshot(&self) -> Result<Arc<SchemaSnapshot>>;
}

/// Serves one fixed snapshot.
pub struct StaticSchemaProvider {
    snapshot: Arc<SchemaSnapshot>,
}

impl StaticSchemaProvider {
    pub fn new(snapshot: SchemaSnapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }
}

#[async_trait]
impl SchemaProvider for StaticSchemaProvider {
    async fn snapshot(&self) -> Result<Arc<SchemaSnapshot>> {
        Ok(Arc::clone(&self.snapshot))
    }
}

/// Loads a snapshot once from an inner provider and serves it until
/// `refresh` swaps in a new one.
pub struct CachedSchemaProvider<P: SchemaProvider> {
    inner: P,
    cached: RwLock<Option<Arc<SchemaSnapshot>>>,
}

impl<P: SchemaProvider> CachedSchemaProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cached: RwLock::new(None),
        }
    }

    /// Fetch a fresh snapshot. Requests already holding the old `Arc`
    /// keep it.
    pub async fn refresh(&self) -> Result<Arc<SchemaSnapshot>> {
        let fresh = self.inner.snapshot().await?;
        info!(
            "Schema snapshot refreshed ({} relations)",
            fresh.allowed.len()
        );
        *self.cached.write().await = Some(Arc::clone(&fresh));
        Ok(fresh)
    }
}

#[async_trait]
impl<P: SchemaProvider> SchemaProvider for CachedSchemaProvider<P> {
    async fn snapshot(&self) -> Result<Arc<SchemaSnapshot>> {
        if let Some(snapshot) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }
        self.refresh().await
    }
}

pub const SCHEMA_GLOSSARY: &str = "\
GLOSSARY / RULES:
1) public.pl_matches (TABLE): one row per match (match_id, season_start, match_date).
   ft_home_goals, ft_away_goals, ft_result (H/D/A); shots, corners, fouls; home/away yellow and red.
2) public.pl_player_standard_stats (TABLE): one row per player-season-squad.
   performance_gls, performance_ast, expected_xg; per90_gls, per90_ast, per90_xg (need playing_time_min >= 900).
3) public.pl_player_standard_stats_latest (VIEW): same columns, latest season only.
4) public.pl_team_match (VIEW): two rows per match, one per team. result (W/D/L), points, goals_for, goals_against.
5) public.pl_season_table (VIEW): standings per season_start and team. played, wins, draws, losses, gf, ga, gd, points, rank.
   Champions are rank = 1.
6) public.v_team_matches (VIEW): pl_team_match plus yellows, reds and match stats.
7) public.v_team_season_summary (VIEW): season totals per team. played, wins, draws, losses,
   goals_for, goals_against, goal_diff, points, yellows, reds.
   For season records add a complete-season filter: WHERE played = (SELECT MAX(played) ...).
8) public.v_player_career_totals (VIEW): all-time player totals. player, goals, assists, minutes.
9) public.v_player_totals_by_squad (VIEW): player totals per club. squad, player, goals, assists, minutes, pos, nation.
STREAK VIEWS (precomputed, use these for streak questions):
10) public.v_team_win_streaks: team, streak_start, streak_end, win_streak.
11) public.v_team_unbeaten_streaks: team, streak_start, streak_end, games, wins, draws.
12) public.v_team_unbeaten_streaks_season: as above plus season_start.
13) public.v_team_clean_sheet_streaks: team, streak_start, streak_end, games.
14) public.v_team_clean_sheet_streaks_season: as above plus season_start.
15) public.v_team_scoring_streaks: team, streak_start, streak_end, games.
16) public.v_team_scoring_streaks_season: as above plus season_start.
RULES:
- Query exactly one view; no JOINs. UNION ALL is the only set operation allowed.
- Never use player views for team or club season records.
- For record questions (most, fewest, biggest) return all ties: WHERE metric = (SELECT MAX/MIN ...).
- There is no attendance column.";

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingProvider {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl SchemaProvider for CountingProvider {
        async fn snapshot(&self) -> Result<Arc<SchemaSnapshot>> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Arc::new(SchemaSnapshot::relations_only()))
        }
    }

    #[test]
    fn test_relations_only_snapshot_allows_every_relation() {
        let snapshot = SchemaSnapshot::relations_only();
        assert_eq!(snapshot.allowed.len(), ALLOWED_RELATIONS.len());
        assert!(snapshot.allowed.contains_relation("V_TEAM_SEASON_SUMMARY"));
        assert!(snapshot.schema_text.contains("public.pl_matches: (not found)"));
        assert!(snapshot.schema_text.contains("GLOSSARY / RULES:"));
    }

    #[test]
    fn test_from_columns_records_allowed_columns() {
        let mut columns = BTreeMap::new();
        columns.insert(
            "pl_season_table".to_string(),
            vec![
                ColumnInfo { name: "team".to_string(), data_type: "text".to_string() },
                ColumnInfo { name: "rank".to_string(), data_type: "integer".to_string() },
            ],
        );
        let snapshot = SchemaSnapshot::from_columns(&columns);
        let allowed = snapshot.allowed.columns("pl_season_table").unwrap();
        assert!(allowed.contains("rank"));
        assert!(snapshot.schema_text.contains("- public.pl_season_table: team (text), rank (integer)"));
        assert!(snapshot.allowed.columns("pl_matches").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_serves_same_arc_until_refresh() {
        let cache = CachedSchemaProvider::new(CountingProvider {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let first = cache.snapshot().await.unwrap();
        let second = cache.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let refreshed = cache.refresh().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &refreshed));
        // The in-flight holder still sees its original snapshot.
        assert_eq!(first.allowed.len(), ALLOWED_RELATIONS.len());
        assert_eq!(cache.inner.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
