//! Query shape extraction
//!
//! Collapses a parsed statement into the handful of facts the guardrails
//! care about (tables, columns, joins, set operations, top-level LIMIT), so
//! the policy code never matches on parser node types directly.

use sqlparser::ast::{
    BinaryOperator, Expr, Query, SelectItem, SetExpr, SetQuantifier, Statement, TableFactor, Value,
    Visit, Visitor,
};
use itertools::Itertools;
use std::ops::ControlFlow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Schema qualifier, lowercased, when written.
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOperation {
    /// `UNION`, `INTERSECT`, `EXCEPT`.
    pub keyword: String,
    pub all: bool,
}

/// `column = literal` predicate found anywhere in the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualityPredicate {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlShape {
    /// Relations read, in order of appearance. CTE references included.
    pub tables: Vec<TableRef>,
    pub cte_names: Vec<String>,
    pub columns: Vec<ColumnRef>,
    /// Projection aliases (`... AS titles`).
    pub aliases: Vec<String>,
    pub has_join: bool,
    pub has_derived: bool,
    pub set_operations: Vec<SetOperation>,
    pub equality_predicates: Vec<EqualityPredicate>,
    /// `None` when the outermost query carries no LIMIT.
    pub top_level_limit: Option<Expr>,
}

impl SqlShape {
    pub fn of(statement: &Statement) -> Self {
        let mut shape = SqlShape::default();
        if let Statement::Query(query) = statement {
            shape.top_level_limit = query.limit.clone();
        }
        let mut collector = ShapeCollector { shape: &mut shape };
        let _ = Visit::visit(statement, &mut collector);
        shape
    }

    /// Relations read from storage: table references minus CTE names, deduplicated.
    pub fn base_relations(&self) -> Vec<&TableRef> {
        self.tables
            .iter()
            .filter(|t| !(t.schema.is_none() && self.cte_names.contains(&t.name)))
            .unique_by(|t| (t.schema.clone(), t.name.clone()))
            .collect()
    }

    pub fn base_relation_names(&self) -> Vec<String> {
        self.base_relations()
            .into_iter()
            .map(|t| t.name.clone())
            .unique()
            .collect()
    }

    pub fn reads(&self, relation: &str) -> bool {
        self.base_relations().iter().any(|t| t.name == relation)
    }

    pub fn has_equality(&self, column: &str, value: &str) -> bool {
        self.equality_predicates
            .iter()
            .any(|p| p.column == column && p.value == value)
    }
}

struct ShapeCollector<'a> {
    shape: &'a mut SqlShape,
}

impl ShapeCollector<'_> {
    /// Records joins, projection aliases and set operations of one query body.
    /// Nested `SetExpr::Query` bodies are reached through `pre_visit_query`.
    fn walk_body(&mut self, body: &SetExpr) {
        match body {
            SetExpr::Select(select) => {
                for item in &select.projection {
                    if let SelectItem::ExprWithAlias { alias, .. } = item {
                        self.shape.aliases.push(alias.value.to_lowercase());
                    }
                }
                if select.from.iter().any(|t| !t.joins.is_empty()) {
                    self.shape.has_join = true;
                }
            }
            SetExpr::SetOperation {
                op,
                set_quantifier,
                left,
                right,
            } => {
                self.shape.set_operations.push(SetOperation {
                    keyword: op.to_string().to_uppercase(),
                    all: matches!(set_quantifier, SetQuantifier::All),
                });
                self.walk_body(left);
                self.walk_body(right);
            }
            _ => {}
        }
    }
}

impl Visitor for ShapeCollector<'_> {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.shape.cte_names.push(cte.alias.name.value.to_lowercase());
            }
        }
        self.walk_body(&query.body);
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let parts = &name.0;
                if let Some(last) = parts.last() {
                    let schema = if parts.len() >= 2 {
                        Some(parts[parts.len() - 2].value.to_lowercase())
                    } else {
                        None
                    };
                    self.shape.tables.push(TableRef {
                        schema,
                        name: last.value.to_lowercase(),
                        alias: alias.as_ref().map(|a| a.name.value.to_lowercase()),
                    });
                }
            }
            TableFactor::Derived { .. } => self.shape.has_derived = true,
            TableFactor::NestedJoin { .. } => self.shape.has_join = true,
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        match expr {
            Expr::Identifier(ident) => self.shape.columns.push(ColumnRef {
                qualifier: None,
                name: ident.value.to_lowercase(),
            }),
            Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
                self.shape.columns.push(ColumnRef {
                    qualifier: Some(parts[parts.len() - 2].value.to_lowercase()),
                    name: parts[parts.len() - 1].value.to_lowercase(),
                })
            }
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Eq,
                right,
            } => {
                let pair = match (column_name(left), literal_text(right)) {
                    (Some(c), Some(v)) => Some((c, v)),
                    _ => column_name(right).zip(literal_text(left)),
                };
                if let Some((column, value)) = pair {
                    self.shape.equality_predicates.push(EqualityPredicate { column, value });
                }
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

/// Unqualified or qualified column name, lowercased.
pub fn column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|p| p.value.to_lowercase()),
        Expr::Nested(inner) => column_name(inner),
        _ => None,
    }
}

fn literal_text(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Value(Value::Number(n, _)) => Some(n.clone()),
        Expr::Value(Value::SingleQuotedString(s)) => Some(s.clone()),
        Expr::Nested(inner) => literal_text(inner),
        _ => None,
    }
}

/// Integer literal value, if `expr` is one.
pub fn integer_literal(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Value(Value::Number(n, _)) => n.parse::<i64>().ok(),
        Expr::Nested(inner) => integer_literal(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::PostgreSqlDialect;
    use sqlparser::parser::Parser;

    fn shape(sql: &str) -> SqlShape {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql).unwrap();
        SqlShape::of(&statements[0])
    }

    #[test]
    fn test_tables_and_ctes() {
        let s = shape(
            "WITH best AS (SELECT team, MAX(points) AS p FROM public.v_team_season_summary GROUP BY team) \
             SELECT team FROM best WHERE p > 90",
        );
        assert_eq!(s.cte_names, vec!["best".to_string()]);
        assert_eq!(s.base_relation_names(), vec!["v_team_season_summary".to_string()]);
        assert!(s.aliases.contains(&"p".to_string()));
        assert!(s.top_level_limit.is_none());
    }

    #[test]
    fn test_subquery_tables_are_collected() {
        let s = shape(
            "SELECT team FROM v_team_season_summary \
             WHERE points = (SELECT MAX(points) FROM v_team_season_summary) LIMIT 5",
        );
        assert_eq!(s.base_relation_names(), vec!["v_team_season_summary".to_string()]);
        assert_eq!(s.tables.len(), 2);
        assert!(s.top_level_limit.is_some());
    }

    #[test]
    fn test_joins_and_set_operations() {
        let s = shape("SELECT a.team FROM pl_matches a JOIN pl_team_match b ON a.id = b.id");
        assert!(s.has_join);
        let s = shape("SELECT team FROM pl_matches UNION ALL SELECT team FROM pl_team_match");
        assert_eq!(
            s.set_operations,
            vec![SetOperation { keyword: "UNION".to_string(), all: true }]
        );
    }

    #[test]
    fn test_equality_predicates() {
        let s = shape("SELECT team FROM pl_season_table WHERE 1 = rank AND team = 'Arsenal'");
        assert!(s.has_equality("rank", "1"));
        assert!(s.has_equality("team", "Arsenal"));
    }
}
