//! Composable predicates over stored documents.
//!
//! A [`Predicate`] is a conjunction of [`Clause`]s. Each clause addresses one
//! field of the document form of an entity (its JSON representation) by path,
//! so storage backends can evaluate or translate a predicate without knowing
//! which filter request produced it.
//!
//! An empty predicate matches every document.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Path to a field inside a document, outermost key first.
pub type FieldPath = &'static [&'static str];

/// Test applied to the value found at a clause's path.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Timestamp strictly later than the bound.
    After(DateTime<Utc>),
    /// Timestamp strictly earlier than the bound.
    Before(DateTime<Utc>),
    /// Exact equality with a JSON value.
    Equals(JsonValue),
    /// Array field sharing at least one element with the given set.
    AnyOf(Vec<String>),
    /// String field containing the text as a literal, case-sensitive substring.
    Contains(String),
}

/// A single predicate term.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub path: FieldPath,
    pub condition: Condition,
}

impl Clause {
    pub fn new(path: FieldPath, condition: Condition) -> Self {
        Self { path, condition }
    }

    /// Evaluate this clause against a document.
    ///
    /// A missing or mistyped field never matches.
    pub fn matches(&self, doc: &JsonValue) -> bool {
        let Some(value) = lookup(doc, self.path) else {
            return false;
        };

        match &self.condition {
            Condition::After(bound) => parse_time(value).is_some_and(|t| t > *bound),
            Condition::Before(bound) => parse_time(value).is_some_and(|t| t < *bound),
            Condition::Equals(expected) => value == expected,
            Condition::AnyOf(wanted) => value.as_array().is_some_and(|items| {
                items
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .any(|item| wanted.iter().any(|w| w == item))
            }),
            Condition::Contains(needle) => value.as_str().is_some_and(|s| s.contains(needle.as_str())),
        }
    }
}

/// Conjunction of clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    /// The predicate that matches everything.
    pub fn always() -> Self {
        Self::default()
    }

    /// Add a clause to the conjunction.
    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// True when no clause constrains the result.
    pub fn is_always(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate against a document in its JSON form.
    pub fn matches(&self, doc: &JsonValue) -> bool {
        self.clauses.iter().all(|clause| clause.matches(doc))
    }

    /// Evaluate against a typed entity.
    ///
    /// An entity that cannot be represented as JSON never matches.
    pub fn matches_entity<E: Serialize>(&self, entity: &E) -> bool {
        match serde_json::to_value(entity) {
            Ok(doc) => self.matches(&doc),
            Err(_) => false,
        }
    }
}

fn lookup<'a>(doc: &'a JsonValue, path: FieldPath) -> Option<&'a JsonValue> {
    path.iter()
        .try_fold(doc, |current, key| current.get(*key))
        .filter(|value| !value.is_null())
}

fn parse_time(value: &JsonValue) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    const CREATED: FieldPath = &["createdTime"];
    const TAGS: FieldPath = &["tags"];
    const FIRST_NAME: FieldPath = &["name", "firstName"];

    fn doc(created: DateTime<Utc>) -> JsonValue {
        json!({
            "createdTime": created,
            "tags": ["vip", "west"],
            "converted": false,
            "name": { "firstName": "Grace", "lastName": "Hopper" }
        })
    }

    #[test]
    fn test_always_matches_anything() {
        let p = Predicate::always();
        assert!(p.is_always());
        assert!(p.matches(&json!({})));
        assert!(p.matches(&json!(null)));
    }

    #[test]
    fn test_time_bounds_are_strict() {
        let t = Utc::now();
        let d = doc(t);
        assert!(!Clause::new(CREATED, Condition::After(t)).matches(&d));
        assert!(!Clause::new(CREATED, Condition::Before(t)).matches(&d));
        assert!(Clause::new(CREATED, Condition::After(t - Duration::seconds(1))).matches(&d));
        assert!(Clause::new(CREATED, Condition::Before(t + Duration::seconds(1))).matches(&d));
    }

    #[test]
    fn test_any_of_requires_intersection() {
        let d = doc(Utc::now());
        assert!(Clause::new(TAGS, Condition::AnyOf(vec!["west".into()])).matches(&d));
        assert!(Clause::new(TAGS, Condition::AnyOf(vec!["east".into(), "vip".into()])).matches(&d));
        assert!(!Clause::new(TAGS, Condition::AnyOf(vec!["east".into()])).matches(&d));
    }

    #[test]
    fn test_contains_is_case_sensitive_literal() {
        let d = doc(Utc::now());
        assert!(Clause::new(FIRST_NAME, Condition::Contains("rac".into())).matches(&d));
        assert!(!Clause::new(FIRST_NAME, Condition::Contains("grace".into())).matches(&d));
        assert!(!Clause::new(FIRST_NAME, Condition::Contains("G.*".into())).matches(&d));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let clause = Clause::new(&["reportingTo"], Condition::Equals(json!("x")));
        assert!(!clause.matches(&json!({ "reportingTo": null })));
        assert!(!clause.matches(&json!({})));
    }

    #[test]
    fn test_conjunction_agrees_with_individual_clauses() {
        let t = Utc::now();
        let d = doc(t);
        let clauses = vec![
            Clause::new(CREATED, Condition::After(t - Duration::minutes(5))),
            Clause::new(TAGS, Condition::AnyOf(vec!["east".into()])),
            Clause::new(&["converted"], Condition::Equals(json!(false))),
        ];

        // Every subset of the clauses: composed result == AND of individual results.
        for mask in 0u8..(1 << clauses.len()) {
            let mut predicate = Predicate::always();
            let mut expected = true;
            for (i, clause) in clauses.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    expected &= clause.matches(&d);
                    predicate.push(clause.clone());
                }
            }
            assert_eq!(predicate.matches(&d), expected, "mask {mask:03b}");
        }
    }
}
