//! Sparse filter requests for leads, contacts, and users.
//!
//! Every field of a filter request is optional. [`to_predicate`] emits one
//! clause per supplied field and joins them with AND; a request with nothing
//! supplied becomes [`Predicate::always`] and matches every record.
//!
//! | Field | Clause |
//! |-------|--------|
//! | `createdTimeAfter` / `createdTimeBefore` | strict bound on `createdTime` |
//! | `modifiedTimeAfter` / `modifiedTimeBefore` | strict bound on `lastModifiedTime` |
//! | `tags` | record has any of the tags |
//! | `converted` | exact match |
//! | `roles` | user has any of the roles |
//! | `reportsTo` | exact match on `reportingTo` |
//! | `firstNameLike` / `lastNameLike` | case-sensitive substring |
//!
//! Blank text and empty sets count as "not supplied".
//!
//! [`to_predicate`]: RecordFilter::to_predicate

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::UserRole;
use crate::predicate::{Clause, Condition, FieldPath, Predicate};

/// Document paths addressed by filter clauses.
pub mod paths {
    use crate::predicate::FieldPath;

    pub const CREATED_TIME: FieldPath = &["createdTime"];
    pub const LAST_MODIFIED_TIME: FieldPath = &["lastModifiedTime"];
    pub const TAGS: FieldPath = &["tags"];
    pub const CONVERTED: FieldPath = &["converted"];
    pub const PENDING_CONVERSION_SINCE: FieldPath = &["pendingConversion", "since"];
    pub const ROLES: FieldPath = &["roles"];
    pub const REPORTING_TO: FieldPath = &["reportingTo"];
    pub const FIRST_NAME: FieldPath = &["name", "firstName"];
    pub const LAST_NAME: FieldPath = &["name", "lastName"];
}

// =============================================================================
// RECORD FILTER (shared by leads and contacts)
// =============================================================================

/// Filter over the shared record attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time_after: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time_before: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time_after: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time_before: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_after(mut self, t: DateTime<Utc>) -> Self {
        self.created_time_after = Some(t);
        self
    }

    pub fn created_before(mut self, t: DateTime<Utc>) -> Self {
        self.created_time_before = Some(t);
        self
    }

    pub fn modified_after(mut self, t: DateTime<Utc>) -> Self {
        self.modified_time_after = Some(t);
        self
    }

    pub fn modified_before(mut self, t: DateTime<Utc>) -> Self {
        self.modified_time_before = Some(t);
        self
    }

    /// Match records carrying any of the given tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Check if the filter constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.to_predicate().is_always()
    }

    /// Number of clauses this filter produces.
    pub fn active_clause_count(&self) -> usize {
        self.to_predicate().clauses().len()
    }

    pub fn to_predicate(&self) -> Predicate {
        let mut predicate = Predicate::always();
        self.append_clauses(&mut predicate);
        predicate
    }

    fn append_clauses(&self, predicate: &mut Predicate) {
        if let Some(t) = self.created_time_after {
            predicate.push(Clause::new(paths::CREATED_TIME, Condition::After(t)));
        }
        if let Some(t) = self.created_time_before {
            predicate.push(Clause::new(paths::CREATED_TIME, Condition::Before(t)));
        }
        if let Some(t) = self.modified_time_after {
            predicate.push(Clause::new(paths::LAST_MODIFIED_TIME, Condition::After(t)));
        }
        if let Some(t) = self.modified_time_before {
            predicate.push(Clause::new(paths::LAST_MODIFIED_TIME, Condition::Before(t)));
        }

        if let Some(clause) = any_of(paths::TAGS, self.tags.iter().flatten().map(String::as_str)) {
            predicate.push(clause);
        }
    }
}

// =============================================================================
// ENTITY FILTERS
// =============================================================================

/// Filter request for leads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFilter {
    #[serde(flatten)]
    pub record: RecordFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted: Option<bool>,
}

impl LeadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, record: RecordFilter) -> Self {
        self.record = record;
        self
    }

    pub fn converted(mut self, converted: bool) -> Self {
        self.converted = Some(converted);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.to_predicate().is_always()
    }

    pub fn to_predicate(&self) -> Predicate {
        let mut predicate = self.record.to_predicate();
        if let Some(converted) = self.converted {
            predicate.push(Clause::new(
                paths::CONVERTED,
                Condition::Equals(JsonValue::Bool(converted)),
            ));
        }
        predicate
    }
}

/// Filter request for contacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFilter {
    #[serde(flatten)]
    pub record: RecordFilter,
}

impl ContactFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, record: RecordFilter) -> Self {
        self.record = record;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    pub fn to_predicate(&self) -> Predicate {
        self.record.to_predicate()
    }
}

/// Filter request for users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name_like: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name_like: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<BTreeSet<UserRole>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports_to: Option<Uuid>,
}

impl UserFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_name_like(mut self, text: impl Into<String>) -> Self {
        self.first_name_like = Some(text.into());
        self
    }

    pub fn last_name_like(mut self, text: impl Into<String>) -> Self {
        self.last_name_like = Some(text.into());
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = UserRole>) -> Self {
        self.roles = Some(roles.into_iter().collect());
        self
    }

    pub fn reports_to(mut self, manager: Uuid) -> Self {
        self.reports_to = Some(manager);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.to_predicate().is_always()
    }

    pub fn to_predicate(&self) -> Predicate {
        let mut predicate = Predicate::always();

        let text_filters = [
            (self.first_name_like.as_deref(), paths::FIRST_NAME),
            (self.last_name_like.as_deref(), paths::LAST_NAME),
        ];
        for (text, path) in text_filters {
            if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
                predicate.push(Clause::new(path, Condition::Contains(text.to_string())));
            }
        }

        if let Some(manager) = self.reports_to {
            predicate.push(Clause::new(
                paths::REPORTING_TO,
                Condition::Equals(JsonValue::String(manager.to_string())),
            ));
        }

        if let Some(clause) = any_of(
            paths::ROLES,
            self.roles.iter().flatten().map(UserRole::as_str),
        ) {
            predicate.push(clause);
        }

        predicate
    }
}

/// Build an "any of" clause, or nothing when the set is empty.
fn any_of<'a>(path: FieldPath, values: impl Iterator<Item = &'a str>) -> Option<Clause> {
    let wanted: Vec<String> = values
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .collect();
    if wanted.is_empty() {
        None
    } else {
        Some(Clause::new(path, Condition::AnyOf(wanted)))
    }
}
