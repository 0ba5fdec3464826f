//! Predicate to SQL rendering.
//!
//! Documents are stored as JSONB in a `doc` column. Each clause of a
//! [`Predicate`] becomes one parameterized condition on a JSON path, and
//! clauses are joined with `AND`.
//!
//! | Condition | SQL |
//! |-----------|-----|
//! | `After(t)` | `(doc #>> '{path}')::timestamptz > $n` |
//! | `Before(t)` | `(doc #>> '{path}')::timestamptz < $n` |
//! | `Equals(v)` | `(doc #> '{path}') = $n::jsonb` |
//! | `AnyOf(xs)` | `(doc #> '{path}') ?\| $n::text[]` |
//! | `Contains(s)` | `(doc #>> '{path}') LIKE ('%' \|\| $n::text \|\| '%') ESCAPE '\'` |
//!
//! A missing field yields SQL `NULL`, which never satisfies a condition.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use personable_core::{Clause, Condition, FieldPath, Predicate};

use crate::escape_like;

/// Type-safe parameter binding for SQL queries.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Timestamp(DateTime<Utc>),
    String(String),
    /// Array of strings (for "any of" membership tests).
    StringArray(Vec<String>),
    /// JSON value compared as JSONB.
    Json(JsonValue),
}

/// Generates a SQL `WHERE` fragment for a predicate.
///
/// ```
/// use personable_core::{LeadFilter, RecordFilter};
/// use personable_db::PredicateQueryBuilder;
///
/// let filter = LeadFilter::new()
///     .with_record(RecordFilter::new().with_tags(["vip"]))
///     .converted(false);
/// let predicate = filter.to_predicate();
/// let (sql, params) = PredicateQueryBuilder::new(&predicate, 0).build();
/// assert_eq!(sql, "(doc #> '{tags}') ?| $1::text[] AND (doc #> '{converted}') = $2::jsonb");
/// assert_eq!(params.len(), 2);
/// ```
pub struct PredicateQueryBuilder<'a> {
    predicate: &'a Predicate,
    param_offset: usize,
}

impl<'a> PredicateQueryBuilder<'a> {
    /// `param_offset` is the number of parameters already in the query.
    pub fn new(predicate: &'a Predicate, param_offset: usize) -> Self {
        Self {
            predicate,
            param_offset,
        }
    }

    /// Build the fragment and its parameters, in placeholder order.
    ///
    /// An empty predicate renders as `TRUE` with no parameters.
    pub fn build(&self) -> (String, Vec<QueryParam>) {
        if self.predicate.is_always() {
            return ("TRUE".to_string(), vec![]);
        }

        let mut clauses = Vec::with_capacity(self.predicate.clauses().len());
        let mut params = Vec::new();

        for clause in self.predicate.clauses() {
            let idx = self.param_offset + params.len() + 1;
            match render_clause(clause, idx) {
                Some((sql, param)) => {
                    clauses.push(sql);
                    params.push(param);
                }
                None => clauses.push("FALSE".to_string()),
            }
        }

        (clauses.join(" AND "), params)
    }
}

fn render_clause(clause: &Clause, idx: usize) -> Option<(String, QueryParam)> {
    let path = json_path(clause.path)?;
    let rendered = match &clause.condition {
        Condition::After(t) => (
            format!("(doc #>> '{}')::timestamptz > ${}", path, idx),
            QueryParam::Timestamp(*t),
        ),
        Condition::Before(t) => (
            format!("(doc #>> '{}')::timestamptz < ${}", path, idx),
            QueryParam::Timestamp(*t),
        ),
        Condition::Equals(value) => (
            format!("(doc #> '{}') = ${}::jsonb", path, idx),
            QueryParam::Json(value.clone()),
        ),
        Condition::AnyOf(values) => (
            format!("(doc #> '{}') ?| ${}::text[]", path, idx),
            QueryParam::StringArray(values.clone()),
        ),
        Condition::Contains(text) => (
            format!(
                "(doc #>> '{}') LIKE ('%' || ${}::text || '%') ESCAPE '\\'",
                path, idx
            ),
            QueryParam::String(escape_like(text)),
        ),
    };
    Some(rendered)
}

/// Render a field path as a Postgres text-array literal, e.g. `{name,firstName}`.
///
/// Paths are inlined into SQL text, so only identifier characters are accepted.
fn json_path(path: FieldPath) -> Option<String> {
    let valid = !path.is_empty()
        && path.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    valid.then(|| format!("{{{}}}", path.join(",")))
}
