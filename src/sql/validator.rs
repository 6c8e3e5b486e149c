//! SQL Validator & Patcher
//!
//! Enforces the read-only, single-relation-family query policy on generated
//! SQL and auto-patches the two omissions that are safe to fix (a missing
//! LIMIT and a missing minutes floor on per-90 rates). Checks run in a fixed
//! order and the first failure wins.

use super::relations::{
    DEFAULT_SCHEMA, MINUTES_COLUMN, MINUTES_FLOOR, PER90_PREFIX, PER90_RELATIONS,
};
use super::shape::{column_name, integer_literal, SqlShape};
use super::{parse, strip_code_fences};
use crate::error::{Advisory, ValidationError};
use crate::routing::rules::QuestionSignals;
use crate::schema::AllowedSchema;
use crate::sql::relations::{relation_kind, RelationKind};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlparser::ast::{
    BinaryOperator, Expr, Ident, Query, Select, SetExpr, Statement, TableFactor, Value, Visit,
    VisitMut, Visitor, VisitorMut,
};
use std::ops::ControlFlow;
use tracing::debug;

lazy_static! {
    static ref WRITE_KEYWORDS: Regex = Regex::new(
        r"(?i)\b(insert|update|delete|drop|alter|truncate|grant|revoke|create|copy|call|do|merge|comment)\b"
    )
    .unwrap();
    static ref JOIN_KEYWORD: Regex = Regex::new(r"(?i)\bjoin\b").unwrap();
}

/// Policy-compliant SQL, possibly patched, plus an optional intent advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedQuery {
    pub sql: String,
    pub warning: Option<Advisory>,
    /// Base relations the query reads, in order of first appearance.
    pub relations: Vec<String>,
    pub limit_patched: bool,
    pub minutes_floor_patched: bool,
}

/// Validate `sql` against the read-only policy and patch fixable omissions.
///
/// `question`, when given, is used only to attach an `IntentMismatch`
/// advisory; it never causes a failure.
pub fn validate_and_patch(
    sql: &str,
    limit_default: u64,
    allowed: &AllowedSchema,
    question: Option<&str>,
) -> Result<ValidatedQuery, ValidationError> {
    // 1. Empty input
    let cleaned = clean(sql);
    if cleaned.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }

    // 2. Exactly one statement
    let mut statements = match parse(&cleaned) {
        Ok(statements) => statements,
        Err(e) => {
            if let Some(keyword) = write_keyword(&cleaned) {
                return Err(ValidationError::WriteNotAllowed(keyword));
            }
            let fragments = count_statements(&cleaned);
            if fragments > 1 {
                return Err(ValidationError::MultipleStatements(fragments));
            }
            return Err(ValidationError::Unparseable(e.to_string()));
        }
    };
    if statements.len() > 1 {
        return Err(ValidationError::MultipleStatements(statements.len()));
    }
    let mut statement = match statements.pop() {
        Some(statement) => statement,
        None => return Err(ValidationError::EmptyQuery),
    };

    // 3. Read-only
    if let Some(keyword) = write_keyword(&cleaned) {
        return Err(ValidationError::WriteNotAllowed(keyword));
    }
    if !matches!(statement, Statement::Query(_)) {
        return Err(ValidationError::NotASelect);
    }

    let shape = SqlShape::of(&statement);

    // 4. Allow-listed relations only
    let mut offenders: Vec<String> = Vec::new();
    for table in shape.base_relations() {
        let qualified_ok = table.schema.as_deref().map_or(true, |s| s == DEFAULT_SCHEMA);
        if !qualified_ok || !allowed.contains_relation(&table.name) {
            let display = match &table.schema {
                Some(schema) => format!("{}.{}", schema, table.name),
                None => table.name.clone(),
            };
            if !offenders.contains(&display) {
                offenders.push(display);
            }
        }
    }
    if !offenders.is_empty() {
        return Err(ValidationError::DisallowedRelation(offenders));
    }

    // 5. No joins
    if shape.has_join || JOIN_KEYWORD.is_match(&cleaned) {
        return Err(ValidationError::JoinNotAllowed);
    }

    // 6. UNION ALL only
    if let Some(op) = shape
        .set_operations
        .iter()
        .find(|op| !(op.keyword == "UNION" && op.all))
    {
        let name = if op.all {
            format!("{} ALL", op.keyword)
        } else {
            op.keyword.clone()
        };
        return Err(ValidationError::SetOperationNotAllowed(name));
    }

    // 7. Top-level LIMIT
    let mut limit_patched = false;
    match &shape.top_level_limit {
        Some(limit) => match integer_literal(limit) {
            Some(n) if n > 0 => {}
            _ => return Err(ValidationError::InvalidLimit(limit.to_string())),
        },
        None => {
            if let Statement::Query(query) = &mut statement {
                query.limit = Some(Expr::Value(Value::Number(limit_default.to_string(), false)));
                limit_patched = true;
            }
        }
    }

    // 8. Minutes floor for per-90 rates
    let mut floor = MinutesFloorPatcher { patched: false };
    let _ = VisitMut::visit(&mut statement, &mut floor);

    // 9. Allowed columns, single-relation queries only
    check_columns(&shape, allowed)?;

    let relations = shape.base_relation_names();
    let warning = question.and_then(|q| intent_mismatch(q, &relations));
    let sql = statement.to_string();
    debug!(
        "validated sql (limit patched: {}, minutes floor patched: {}): {}",
        limit_patched, floor.patched, sql
    );

    Ok(ValidatedQuery {
        sql,
        warning,
        relations,
        limit_patched,
        minutes_floor_patched: floor.patched,
    })
}

/// Fences, surrounding whitespace and trailing semicolons removed.
fn clean(sql: &str) -> String {
    strip_code_fences(sql)
        .trim()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
        .to_string()
}

fn write_keyword(sql: &str) -> Option<String> {
    WRITE_KEYWORDS
        .find(sql)
        .map(|m| m.as_str().to_uppercase())
}

/// Number of non-empty `;`-separated fragments, ignoring semicolons inside
/// quoted strings and identifiers.
fn count_statements(sql: &str) -> usize {
    let mut count = 0;
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == ';' => {
                if !current.trim().is_empty() {
                    count += 1;
                }
                current.clear();
                continue;
            }
            None => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        count += 1;
    }
    count
}

fn check_columns(shape: &SqlShape, allowed: &AllowedSchema) -> Result<(), ValidationError> {
    let relations = shape.base_relations();
    if relations.len() != 1 || !shape.cte_names.is_empty() || shape.has_derived {
        return Ok(());
    }
    let table = relations[0];
    let columns = match allowed.columns(&table.name) {
        Some(columns) if !columns.is_empty() => columns,
        _ => return Ok(()),
    };

    let mut offenders: Vec<String> = Vec::new();
    for column in &shape.columns {
        if shape.aliases.contains(&column.name) || columns.contains(&column.name) {
            continue;
        }
        if !offenders.contains(&column.name) {
            offenders.push(column.name.clone());
        }
    }
    if offenders.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::DisallowedColumn {
            relation: table.name.clone(),
            columns: offenders,
        })
    }
}

fn intent_mismatch(question: &str, relations: &[String]) -> Option<Advisory> {
    if relations.is_empty() {
        return None;
    }
    let signals = QuestionSignals::from_question(question);
    let kinds: Vec<RelationKind> = relations.iter().map(|r| relation_kind(r)).collect();
    let listed = relations.join(", ");

    let team_question = signals.club && !signals.player_context && !signals.player_for_club;
    let player_question = signals.player_for_club || (signals.player_context && !signals.club);

    if team_question && kinds.iter().all(|k| *k == RelationKind::Player) {
        return Some(Advisory::IntentMismatch(format!(
            "this looks like a team/season question but the query reads a player-scoped relation ({})",
            listed
        )));
    }
    if player_question && kinds.iter().all(|k| matches!(k, RelationKind::Team | RelationKind::Streak)) {
        return Some(Advisory::IntentMismatch(format!(
            "this looks like a player question but the query reads only team-scoped relations ({})",
            listed
        )));
    }
    None
}

/// Adds `playing_time_min >= 900` to every SELECT that reads a per-90 rate
/// from the player stats relations without a minutes floor.
struct MinutesFloorPatcher {
    patched: bool,
}

impl VisitorMut for MinutesFloorPatcher {
    type Break = ();

    fn post_visit_query(&mut self, query: &mut Query) -> ControlFlow<Self::Break> {
        let ordered_by_rate = query.order_by.iter().any(|o| mentions_per90(&o.expr));
        self.patch_body(&mut query.body, ordered_by_rate);
        ControlFlow::Continue(())
    }
}

impl MinutesFloorPatcher {
    fn patch_body(&mut self, body: &mut SetExpr, ordered_by_rate: bool) {
        match body {
            SetExpr::Select(select) => self.patch_select(select, ordered_by_rate),
            SetExpr::SetOperation { left, right, .. } => {
                self.patch_body(left, false);
                self.patch_body(right, false);
            }
            _ => {}
        }
    }

    fn patch_select(&mut self, select: &mut Select, ordered_by_rate: bool) {
        let reads_stats = select.from.iter().any(|t| match &t.relation {
            TableFactor::Table { name, .. } => name
                .0
                .last()
                .map(|p| PER90_RELATIONS.contains(&p.value.to_lowercase().as_str()))
                .unwrap_or(false),
            _ => false,
        });
        if !reads_stats {
            return;
        }
        let uses_rate = ordered_by_rate || mentions_per90_in(&*select);
        let has_floor = select.selection.as_ref().map_or(false, has_minutes_floor);
        if !uses_rate || has_floor {
            return;
        }

        let floor = Expr::BinaryOp {
            left: Box::new(Expr::Identifier(Ident::new(MINUTES_COLUMN))),
            op: BinaryOperator::GtEq,
            right: Box::new(Expr::Value(Value::Number(MINUTES_FLOOR.to_string(), false))),
        };
        select.selection = Some(match select.selection.take() {
            Some(existing) => Expr::BinaryOp {
                left: Box::new(Expr::Nested(Box::new(existing))),
                op: BinaryOperator::And,
                right: Box::new(floor),
            },
            None => floor,
        });
        self.patched = true;
    }
}

struct Per90Finder {
    found: bool,
}

impl Visitor for Per90Finder {
    type Break = ();

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if let Some(name) = column_name(expr) {
            if name.starts_with(PER90_PREFIX) {
                self.found = true;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}

fn mentions_per90_in<V: Visit>(node: &V) -> bool {
    let mut finder = Per90Finder { found: false };
    let _ = node.visit(&mut finder);
    finder.found
}

fn mentions_per90(expr: &Expr) -> bool {
    mentions_per90_in(expr)
}

struct FloorFinder {
    found: bool,
}

impl Visitor for FloorFinder {
    type Break = ();

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if is_floor_predicate(expr) {
            self.found = true;
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }
}

fn has_minutes_floor(selection: &Expr) -> bool {
    let mut finder = FloorFinder { found: false };
    let _ = Visit::visit(selection, &mut finder);
    finder.found
}

/// `playing_time_min >= n`, `> n`, `n <= playing_time_min`, `n < playing_time_min`
/// or `playing_time_min BETWEEN n AND m`, with `n >= 900`.
fn is_floor_predicate(expr: &Expr) -> bool {
    let is_minutes = |e: &Expr| column_name(e).as_deref() == Some(MINUTES_COLUMN);
    let at_floor = |e: &Expr| integer_literal(e).map_or(false, |n| n >= MINUTES_FLOOR as i64);
    match expr {
        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::GtEq | BinaryOperator::Gt => is_minutes(left) && at_floor(right),
            BinaryOperator::LtEq | BinaryOperator::Lt => at_floor(left) && is_minutes(right),
            _ => false,
        },
        Expr::Between {
            expr,
            negated: false,
            low,
            ..
        } => is_minutes(expr) && at_floor(low),
        _ => false,
    }
}
