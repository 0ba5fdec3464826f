//! Storage traits.
//!
//! Backends implement these for each collection. Every operation returns an
//! [`Outcome`]; storage faults are folded into [`Outcome::Failed`] inside the
//! implementation and never escape as a panic or a bare error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Document, Lead, LeadDetails};
use crate::outcome::Outcome;
use crate::predicate::Predicate;

// =============================================================================
// REPOSITORY
// =============================================================================

/// Type-safe CRUD over one document collection.
#[async_trait]
pub trait Repository<E>: Send + Sync
where
    E: Document + Send + Sync + 'static,
{
    /// Name of the backing collection, for logs and error messages.
    fn collection(&self) -> &str;

    /// Every document in the collection.
    async fn find_all(&self) -> Outcome<Vec<E>> {
        self.find_by_predicate(&Predicate::always()).await
    }

    /// Documents matching every clause of `predicate`.
    async fn find_by_predicate(&self, predicate: &Predicate) -> Outcome<Vec<E>>;

    /// `NotFound` if no document has this id.
    async fn find_by_id(&self, id: Uuid) -> Outcome<E>;

    /// Store a new document. The caller has already assigned its id and
    /// timestamps. An existing id is a storage fault, not a silent merge.
    async fn insert(&self, entity: E) -> Outcome<E>;

    /// Overwrite the whole document stored under `id`.
    ///
    /// `NotFound` if `id` is absent; never inserts. `BadRequest` if the
    /// entity carries a different id.
    async fn replace(&self, id: Uuid, entity: E) -> Outcome<E>;

    /// `NotFound` if absent. `Successful(true)` only once the store
    /// acknowledges the removal; an unacknowledged delete is `Failed`.
    async fn delete(&self, id: Uuid) -> Outcome<bool>;
}

// =============================================================================
// LEAD STORE
// =============================================================================

/// Lead collection with the single-document atomic updates used by conversion.
#[async_trait]
pub trait LeadStore: Repository<Lead> {
    /// Atomically flip `converted` from false to true, stamp the actor and
    /// time, and record a pending conversion for `contact_id`. Returns the
    /// post-update lead.
    ///
    /// `NotFound` if the lead does not exist; `BadRequest` if it is already
    /// converted. Nothing is written in either case.
    async fn mark_converted(
        &self,
        id: Uuid,
        actor: Uuid,
        now: DateTime<Utc>,
        contact_id: Uuid,
    ) -> Outcome<Lead>;

    /// Overwrite the editable fields of a lead in one atomic step and stamp
    /// the modification. `converted`, the pending marker and the prediction
    /// score keep whatever value the store holds at write time.
    ///
    /// `NotFound` if the lead does not exist; never inserts.
    async fn update_details(
        &self,
        id: Uuid,
        details: LeadDetails,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> Outcome<Lead>;

    /// Remove the pending conversion marker, returning the updated lead.
    async fn clear_pending_conversion(&self, id: Uuid) -> Outcome<Lead>;
}

/// Message used when a conversion hits an already-converted lead.
pub fn already_converted_message(id: Uuid) -> String {
    format!("Lead {} has already been converted", id)
}
