//! Lead conversion scenarios against the in-process backend.
//!
//! Covers:
//! - Converting an open lead creates exactly one linked contact
//! - Unknown leads yield NotFound and create nothing
//! - A second conversion is rejected
//! - A failed contact insert leaves a pending marker that reconciliation repairs
//! - A lead update racing a conversion never undoes it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use personable_core::{
    contact_from_lead, convert_lead, Address, Contact, ContactInfo, ConvertLead, Lead,
    LeadDetails, LeadFilter, LeadService, LeadStore, MemoryCollection, Name, NewLead, Outcome,
    Predicate, RecordFilter, Repository,
};
use uuid::Uuid;

struct Fixture {
    leads: MemoryCollection<Lead>,
    contacts: MemoryCollection<Contact>,
    service: LeadService,
}

fn fixture() -> Fixture {
    let leads: MemoryCollection<Lead> = MemoryCollection::new("leads");
    let contacts: MemoryCollection<Contact> = MemoryCollection::new("contacts");
    let service = LeadService::new(Arc::new(leads.clone()), Arc::new(contacts.clone()));
    Fixture {
        leads,
        contacts,
        service,
    }
}

fn new_lead(actor: Uuid, tags: &[&str]) -> NewLead {
    NewLead {
        address: Some(Address {
            street_line_one: "42 Harbor Rd".into(),
            city: "Portland".into(),
            state: "ME".into(),
            zip: "04101".into(),
            ..Default::default()
        }),
        name: Some(Name::new("Katherine", "Johnson")),
        modified_by: Some(actor),
        annual_salary: None,
        lead_source: Some("web".into()),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        contact_info: Some(ContactInfo {
            email: Some("kj@example.com".into()),
            ..Default::default()
        }),
    }
}

fn convert_as(actor: Uuid) -> ConvertLead {
    ConvertLead {
        modified_by: Some(actor),
    }
}

#[tokio::test]
async fn test_convert_creates_one_linked_contact() {
    let f = fixture();
    let creator = Uuid::new_v4();
    let converter = Uuid::new_v4();
    let lead = f
        .service
        .create(new_lead(creator, &["vip"]))
        .await
        .successful()
        .expect("lead created");

    let contact = f
        .service
        .convert(lead.record.id, convert_as(converter))
        .await
        .successful()
        .expect("conversion succeeds");

    let stored = f.service.get(lead.record.id).await.successful().unwrap();
    assert!(stored.converted);
    assert_eq!(stored.record.modified_by, converter);
    assert!(stored.pending_conversion.is_none(), "marker cleared after insert");

    let contacts = f.contacts.find_all().await.successful().unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0], contact);
    assert_eq!(contact.associated_lead_id, Some(lead.record.id));
    assert_eq!(contact.primary_name, lead.name);
    assert_eq!(contact.mailing_address, lead.address);
    assert!(contact.secondary_name.is_none());
    assert_eq!(contact.record.created_by_user_id, converter);
}

#[tokio::test]
async fn test_convert_unknown_lead_is_not_found() {
    let f = fixture();
    let outcome = f
        .service
        .convert(Uuid::new_v4(), convert_as(Uuid::new_v4()))
        .await;
    assert!(outcome.is_not_found());
    assert!(f.contacts.is_empty().await);
}

#[tokio::test]
async fn test_convert_requires_actor() {
    let f = fixture();
    let lead = f
        .service
        .create(new_lead(Uuid::new_v4(), &[]))
        .await
        .successful()
        .unwrap();
    let outcome = f
        .service
        .convert(lead.record.id, ConvertLead::default())
        .await;
    assert_eq!(outcome.kind(), "bad_request");
    assert!(!f.service.get(lead.record.id).await.successful().unwrap().converted);
}

#[tokio::test]
async fn test_second_conversion_is_rejected() {
    let f = fixture();
    let actor = Uuid::new_v4();
    let lead = f
        .service
        .create(new_lead(actor, &[]))
        .await
        .successful()
        .unwrap();

    assert!(f
        .service
        .convert(lead.record.id, convert_as(actor))
        .await
        .is_successful());

    match f.service.convert(lead.record.id, convert_as(actor)).await {
        Outcome::BadRequest(problem) => assert!(problem.message.contains("already been converted")),
        other => panic!("expected BadRequest, got {}", other.kind()),
    }
    assert_eq!(f.contacts.len().await, 1);
}

#[tokio::test]
async fn test_concurrent_conversions_create_one_contact() {
    let f = fixture();
    let lead = f
        .service
        .create(new_lead(Uuid::new_v4(), &[]))
        .await
        .successful()
        .unwrap();

    let a = f.service.clone();
    let b = f.service.clone();
    let id = lead.record.id;
    let (first, second) = tokio::join!(
        a.convert(id, convert_as(Uuid::new_v4())),
        b.convert(id, convert_as(Uuid::new_v4()))
    );

    let successes = [first.is_successful(), second.is_successful()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1);
    assert_eq!(f.contacts.len().await, 1);
}

#[tokio::test]
async fn test_failed_insert_leaves_pending_marker_then_reconciles() {
    let f = fixture();
    let converter = Uuid::new_v4();
    let lead = f
        .service
        .create(new_lead(Uuid::new_v4(), &["west"]))
        .await
        .successful()
        .unwrap();

    f.contacts.fail_inserts(true);
    let outcome = f.service.convert(lead.record.id, convert_as(converter)).await;
    assert_eq!(outcome.kind(), "failed");

    let stuck = f.service.get(lead.record.id).await.successful().unwrap();
    assert!(stuck.converted);
    let pending = stuck.pending_conversion.clone().expect("marker kept");
    assert!(f.contacts.is_empty().await);

    // Markers younger than the threshold are left alone.
    let report = f
        .service
        .reconcile_pending(Duration::hours(1))
        .await
        .successful()
        .unwrap();
    assert_eq!(report.examined, 0);

    f.contacts.fail_inserts(false);
    let report = f
        .service
        .reconcile_pending(Duration::seconds(-1))
        .await
        .successful()
        .unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.repaired, 1);
    assert_eq!(report.failed, 0);

    let contact = f
        .contacts
        .find_by_id(pending.contact_id)
        .await
        .successful()
        .expect("contact re-created under the reserved id");
    assert_eq!(contact.associated_lead_id, Some(lead.record.id));
    assert_eq!(contact.record.created_by_user_id, converter);
    assert!(f
        .service
        .get(lead.record.id)
        .await
        .successful()
        .unwrap()
        .pending_conversion
        .is_none());
}

#[tokio::test]
async fn test_reconcile_does_not_duplicate_existing_contact() {
    let f = fixture();
    let lead = f
        .service
        .create(new_lead(Uuid::new_v4(), &[]))
        .await
        .successful()
        .unwrap();

    // Simulate a crash between the contact insert and clearing the marker.
    let contact_id = Uuid::new_v4();
    let now = Utc::now() - Duration::minutes(30);
    let converted = f
        .leads
        .mark_converted(lead.record.id, Uuid::new_v4(), now, contact_id)
        .await
        .successful()
        .unwrap();
    f.contacts
        .seed([contact_from_lead(
            &converted,
            contact_id,
            converted.record.modified_by,
            now,
        )])
        .await;

    let report = f
        .service
        .reconcile_pending(Duration::minutes(10))
        .await
        .successful()
        .unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.already_present, 1);
    assert_eq!(report.repaired, 0);
    assert_eq!(f.contacts.len().await, 1);
}

#[tokio::test]
async fn test_tag_and_converted_filters_follow_conversion() {
    let f = fixture();
    let actor = Uuid::new_v4();
    let lead = f
        .service
        .create(new_lead(actor, &["vip", "west"]))
        .await
        .successful()
        .unwrap();

    let by_tags = |tags: &[&str]| {
        LeadFilter::new().with_record(RecordFilter::new().with_tags(tags.iter().copied()))
    };

    let west = f.service.filter(&by_tags(&["west"])).await.successful().unwrap();
    assert_eq!(west.len(), 1);
    let east = f.service.filter(&by_tags(&["east"])).await.successful().unwrap();
    assert!(east.is_empty());

    let converted_only = LeadFilter::new().converted(true);
    assert!(f
        .service
        .filter(&converted_only)
        .await
        .successful()
        .unwrap()
        .is_empty());

    f.service
        .convert(lead.record.id, convert_as(actor))
        .await
        .successful()
        .unwrap();

    let after = f.service.filter(&converted_only).await.successful().unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].record.id, lead.record.id);
}

/// Lead store that converts the lead right after handing out a lookup
/// result, once armed. Reproduces a conversion committed between the read
/// and the write of a concurrent update.
struct ConvertsAfterLookup {
    inner: MemoryCollection<Lead>,
    contacts: MemoryCollection<Contact>,
    converter: Uuid,
    armed: AtomicBool,
}

#[async_trait]
impl Repository<Lead> for ConvertsAfterLookup {
    fn collection(&self) -> &str {
        self.inner.collection()
    }

    async fn find_by_predicate(&self, predicate: &Predicate) -> Outcome<Vec<Lead>> {
        self.inner.find_by_predicate(predicate).await
    }

    async fn find_by_id(&self, id: Uuid) -> Outcome<Lead> {
        let found = self.inner.find_by_id(id).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            let converted = convert_lead(&self.inner, &self.contacts, id, self.converter).await;
            assert!(converted.is_successful(), "interleaved conversion failed");
        }
        found
    }

    async fn insert(&self, entity: Lead) -> Outcome<Lead> {
        self.inner.insert(entity).await
    }

    async fn replace(&self, id: Uuid, entity: Lead) -> Outcome<Lead> {
        self.inner.replace(id, entity).await
    }

    async fn delete(&self, id: Uuid) -> Outcome<bool> {
        self.inner.delete(id).await
    }
}

#[async_trait]
impl LeadStore for ConvertsAfterLookup {
    async fn mark_converted(
        &self,
        id: Uuid,
        actor: Uuid,
        now: DateTime<Utc>,
        contact_id: Uuid,
    ) -> Outcome<Lead> {
        self.inner.mark_converted(id, actor, now, contact_id).await
    }

    async fn update_details(
        &self,
        id: Uuid,
        details: LeadDetails,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> Outcome<Lead> {
        self.inner.update_details(id, details, actor, now).await
    }

    async fn clear_pending_conversion(&self, id: Uuid) -> Outcome<Lead> {
        self.inner.clear_pending_conversion(id).await
    }
}

#[tokio::test]
async fn test_update_racing_a_conversion_keeps_lead_converted() {
    let leads: MemoryCollection<Lead> = MemoryCollection::new("leads");
    let contacts: MemoryCollection<Contact> = MemoryCollection::new("contacts");
    let racing = Arc::new(ConvertsAfterLookup {
        inner: leads.clone(),
        contacts: contacts.clone(),
        converter: Uuid::new_v4(),
        armed: AtomicBool::new(false),
    });
    let store: Arc<dyn LeadStore> = racing.clone();
    let service = LeadService::new(store, Arc::new(contacts.clone()));

    let editor = Uuid::new_v4();
    let lead = service
        .create(new_lead(editor, &["west"]))
        .await
        .successful()
        .unwrap();

    // The update reads an unconverted lead; the conversion commits before
    // the update writes.
    racing.armed.store(true, Ordering::SeqCst);
    let mut input = new_lead(editor, &["east"]);
    input.name = Some(Name::new("Katherine", "Goble"));
    let updated = service
        .update(lead.record.id, input)
        .await
        .successful()
        .unwrap();

    assert!(updated.converted, "update must not reopen a converted lead");
    assert_eq!(updated.name.last_name, "Goble");
    assert_eq!(updated.record.modified_by, editor);
    assert_eq!(contacts.len().await, 1);

    let stored = leads.find_by_id(lead.record.id).await.successful().unwrap();
    assert!(stored.converted);

    match service.convert(lead.record.id, convert_as(Uuid::new_v4())).await {
        Outcome::BadRequest(problem) => {
            assert!(problem.message.contains("already been converted"))
        }
        other => panic!("expected BadRequest, got {}", other.kind()),
    }
    assert_eq!(contacts.len().await, 1, "still exactly one contact per lead");
}

#[tokio::test]
async fn test_reconciled_contact_is_attributed_to_the_converter() {
    let f = fixture();
    let converter = Uuid::new_v4();
    let editor = Uuid::new_v4();
    let lead = f
        .service
        .create(new_lead(Uuid::new_v4(), &[]))
        .await
        .successful()
        .unwrap();

    f.contacts.fail_inserts(true);
    let outcome = f.service.convert(lead.record.id, convert_as(converter)).await;
    assert_eq!(outcome.kind(), "failed");
    f.contacts.fail_inserts(false);

    // Someone else edits the lead while its conversion is still pending.
    let edited = f
        .service
        .update(lead.record.id, new_lead(editor, &["followup"]))
        .await
        .successful()
        .unwrap();
    assert_eq!(edited.record.modified_by, editor);
    let pending = edited.pending_conversion.clone().expect("marker survives edits");
    assert_eq!(pending.converted_by, converter);

    let report = f
        .service
        .reconcile_pending(Duration::seconds(-1))
        .await
        .successful()
        .unwrap();
    assert_eq!(report.repaired, 1);

    let contact = f
        .contacts
        .find_by_id(pending.contact_id)
        .await
        .successful()
        .unwrap();
    assert_eq!(contact.record.created_by_user_id, converter);
    assert_eq!(contact.record.modified_by, converter);
    assert_eq!(contact.record.created_time, pending.since);
}
