//! In-process document backend.
//!
//! Stores documents in a `BTreeMap` behind an async `RwLock` and evaluates
//! predicates against each document's JSON form. Used by the test suites and
//! by the API server when `STORAGE_BACKEND=memory`.
//!
//! Faults can be injected per collection to exercise the `Failed` paths:
//!
//! ```rust
//! use personable_core::memory::MemoryCollection;
//! use personable_core::models::Contact;
//!
//! let contacts: MemoryCollection<Contact> = MemoryCollection::new("contacts");
//! contacts.fail_inserts(true);
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::Error;
use crate::models::{Document, Lead, LeadDetails, PendingConversion};
use crate::outcome::Outcome;
use crate::predicate::Predicate;
use crate::traits::{already_converted_message, LeadStore, Repository};

#[derive(Debug, Default)]
struct Faults {
    fail_reads: AtomicBool,
    fail_inserts: AtomicBool,
    drop_deletes: AtomicBool,
}

/// A named in-process collection of documents.
pub struct MemoryCollection<E> {
    name: String,
    docs: Arc<RwLock<BTreeMap<Uuid, E>>>,
    faults: Arc<Faults>,
}

impl<E> Clone for MemoryCollection<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            docs: Arc::clone(&self.docs),
            faults: Arc::clone(&self.faults),
        }
    }
}

impl<E> MemoryCollection<E>
where
    E: Document + Clone + Serialize + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: Arc::new(RwLock::new(BTreeMap::new())),
            faults: Arc::new(Faults::default()),
        }
    }

    /// Make every read fail with a storage fault.
    pub fn fail_reads(&self, enabled: bool) {
        self.faults.fail_reads.store(enabled, Ordering::SeqCst);
    }

    /// Make every insert fail with a storage fault.
    pub fn fail_inserts(&self, enabled: bool) {
        self.faults.fail_inserts.store(enabled, Ordering::SeqCst);
    }

    /// Report deletes as unacknowledged without removing anything.
    pub fn drop_deletes(&self, enabled: bool) {
        self.faults.drop_deletes.store(enabled, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// Store documents directly, bypassing fault injection.
    pub async fn seed(&self, entities: impl IntoIterator<Item = E>) {
        let mut docs = self.docs.write().await;
        for entity in entities {
            docs.insert(entity.id(), entity);
        }
    }

    fn read_fault(&self) -> Option<Error> {
        self.faults
            .fail_reads
            .load(Ordering::SeqCst)
            .then(|| Error::Internal(format!("injected read fault on {}", self.name)))
    }
}

#[async_trait]
impl<E> Repository<E> for MemoryCollection<E>
where
    E: Document + Clone + Serialize + Send + Sync + 'static,
{
    fn collection(&self) -> &str {
        &self.name
    }

    async fn find_by_predicate(&self, predicate: &Predicate) -> Outcome<Vec<E>> {
        if let Some(err) = self.read_fault() {
            return Outcome::Failed(err);
        }
        let docs = self.docs.read().await;
        let found: Vec<E> = docs
            .values()
            .filter(|doc| {
                let keep = predicate.matches_entity(*doc);
                trace!(subsystem = "memory", collection = %self.name, record_id = %doc.id(), keep, "Evaluated predicate");
                keep
            })
            .cloned()
            .collect();
        debug!(
            subsystem = "memory",
            collection = %self.name,
            op = "find_by_predicate",
            clause_count = predicate.clauses().len(),
            result_count = found.len(),
            "Query complete"
        );
        Outcome::Successful(found)
    }

    async fn find_by_id(&self, id: Uuid) -> Outcome<E> {
        if let Some(err) = self.read_fault() {
            return Outcome::Failed(err);
        }
        match self.docs.read().await.get(&id) {
            Some(doc) => Outcome::Successful(doc.clone()),
            None => Outcome::NotFound,
        }
    }

    async fn insert(&self, entity: E) -> Outcome<E> {
        if self.faults.fail_inserts.load(Ordering::SeqCst) {
            return Outcome::Failed(Error::Internal(format!(
                "injected insert fault on {}",
                self.name
            )));
        }
        let id = entity.id();
        let mut docs = self.docs.write().await;
        if docs.contains_key(&id) {
            return Outcome::Failed(Error::Internal(format!(
                "duplicate id {} in {}",
                id, self.name
            )));
        }
        docs.insert(id, entity.clone());
        debug!(subsystem = "memory", collection = %self.name, op = "insert", record_id = %id, "Inserted document");
        Outcome::Successful(entity)
    }

    async fn replace(&self, id: Uuid, entity: E) -> Outcome<E> {
        if entity.id() != id {
            return Outcome::bad_request(format!(
                "Document id {} does not match target id {}",
                entity.id(),
                id
            ));
        }
        let mut docs = self.docs.write().await;
        match docs.get_mut(&id) {
            Some(slot) => {
                *slot = entity.clone();
                debug!(subsystem = "memory", collection = %self.name, op = "replace", record_id = %id, "Replaced document");
                Outcome::Successful(entity)
            }
            None => Outcome::NotFound,
        }
    }

    async fn delete(&self, id: Uuid) -> Outcome<bool> {
        let mut docs = self.docs.write().await;
        if !docs.contains_key(&id) {
            return Outcome::NotFound;
        }
        if self.faults.drop_deletes.load(Ordering::SeqCst) {
            return Outcome::Failed(Error::Unacknowledged(format!("delete {}/{}", self.name, id)));
        }
        docs.remove(&id);
        debug!(subsystem = "memory", collection = %self.name, op = "delete", record_id = %id, "Deleted document");
        Outcome::Successful(true)
    }
}

#[async_trait]
impl LeadStore for MemoryCollection<Lead> {
    async fn mark_converted(
        &self,
        id: Uuid,
        actor: Uuid,
        now: DateTime<Utc>,
        contact_id: Uuid,
    ) -> Outcome<Lead> {
        // The write lock makes check-and-set a single step.
        let mut docs = self.docs.write().await;
        let Some(lead) = docs.get_mut(&id) else {
            return Outcome::NotFound;
        };
        if lead.converted {
            return Outcome::bad_request(already_converted_message(id));
        }
        lead.converted = true;
        lead.record.touch(actor, now);
        lead.pending_conversion = Some(PendingConversion {
            contact_id,
            converted_by: actor,
            since: now,
        });
        Outcome::Successful(lead.clone())
    }

    async fn update_details(
        &self,
        id: Uuid,
        details: LeadDetails,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> Outcome<Lead> {
        let mut docs = self.docs.write().await;
        let Some(lead) = docs.get_mut(&id) else {
            return Outcome::NotFound;
        };
        details.apply_to(lead, actor, now);
        debug!(subsystem = "memory", collection = %self.name, op = "update_details", record_id = %id, "Updated lead details");
        Outcome::Successful(lead.clone())
    }

    async fn clear_pending_conversion(&self, id: Uuid) -> Outcome<Lead> {
        let mut docs = self.docs.write().await;
        match docs.get_mut(&id) {
            Some(lead) => {
                lead.pending_conversion = None;
                Outcome::Successful(lead.clone())
            }
            None => Outcome::NotFound,
        }
    }
}
