//! Service behavior for users and contacts over the in-process backend.

use std::sync::Arc;

use personable_core::{
    Address, Contact, ContactFilter, ContactInfo, ContactService, ConvertLead, Lead, LeadService,
    MemoryCollection, Name, NewLead, Outcome, RecordFilter, Repository, UpdateContact, User,
    UserFilter, UserInput, UserRole, UserService, UserStatus,
};
use uuid::Uuid;

fn user_input(first: &str, roles: &[UserRole], reporting_to: Option<Uuid>) -> UserInput {
    UserInput {
        name: Some(Name::new(first, "Example")),
        email: Some(format!("{}@example.com", first.to_lowercase())),
        roles: roles.iter().copied().collect(),
        reporting_to,
        status: UserStatus::Active,
    }
}

#[tokio::test]
async fn test_delete_user_semantics() {
    let users: MemoryCollection<User> = MemoryCollection::new("users");
    let service = UserService::new(Arc::new(users.clone()));

    assert!(service.delete(Uuid::new_v4()).await.is_not_found());

    let user = service
        .create(user_input("Ada", &[UserRole::Admin], None))
        .await
        .successful()
        .unwrap();
    match service.delete(user.user_id).await {
        Outcome::Successful(deleted) => assert!(deleted),
        other => panic!("expected Successful, got {}", other.kind()),
    }
    assert!(service.get(user.user_id).await.is_not_found());
}

#[tokio::test]
async fn test_unacknowledged_user_delete_is_failed() {
    let users: MemoryCollection<User> = MemoryCollection::new("users");
    let service = UserService::new(Arc::new(users.clone()));
    let user = service
        .create(user_input("Ada", &[], None))
        .await
        .successful()
        .unwrap();

    users.drop_deletes(true);
    assert_eq!(service.delete(user.user_id).await.kind(), "failed");
}

#[tokio::test]
async fn test_update_missing_user_never_upserts() {
    let users: MemoryCollection<User> = MemoryCollection::new("users");
    let service = UserService::new(Arc::new(users.clone()));

    let outcome = service
        .update(Uuid::new_v4(), user_input("Ghost", &[], None))
        .await;
    assert!(outcome.is_not_found());
    assert!(users.is_empty().await);
}

#[tokio::test]
async fn test_update_user_replaces_fields() {
    let users: MemoryCollection<User> = MemoryCollection::new("users");
    let service = UserService::new(Arc::new(users));
    let manager = service
        .create(user_input("Mia", &[UserRole::Manager], None))
        .await
        .successful()
        .unwrap();
    let user = service
        .create(user_input("Tom", &[UserRole::Teller], None))
        .await
        .successful()
        .unwrap();

    let mut input = user_input("Tom", &[UserRole::LoanOfficer], Some(manager.user_id));
    input.status = UserStatus::Training;
    let updated = service
        .update(user.user_id, input)
        .await
        .successful()
        .unwrap();

    assert_eq!(updated.user_id, user.user_id);
    assert_eq!(updated.reporting_to, Some(manager.user_id));
    assert_eq!(updated.status, UserStatus::Training);
    assert_eq!(updated.roles.len(), 1);
    assert!(updated.roles.contains(&UserRole::LoanOfficer));
}

#[tokio::test]
async fn test_user_cannot_report_to_self_on_update() {
    let service = UserService::new(Arc::new(MemoryCollection::<User>::new("users")));
    let user = service
        .create(user_input("Sam", &[], None))
        .await
        .successful()
        .unwrap();
    let outcome = service
        .update(user.user_id, user_input("Sam", &[], Some(user.user_id)))
        .await;
    assert_eq!(outcome.kind(), "bad_request");
}

#[tokio::test]
async fn test_user_filter_roles_names_and_manager() {
    let service = UserService::new(Arc::new(MemoryCollection::<User>::new("users")));
    let boss = service
        .create(user_input("Beatrice", &[UserRole::Manager], None))
        .await
        .successful()
        .unwrap();
    service
        .create(user_input("Bernard", &[UserRole::It], Some(boss.user_id)))
        .await
        .successful()
        .unwrap();
    service
        .create(user_input("Carla", &[UserRole::Hr, UserRole::Legal], Some(boss.user_id)))
        .await
        .successful()
        .unwrap();

    let all = service.filter(&UserFilter::new()).await.successful().unwrap();
    assert_eq!(all.len(), 3);

    let it_or_legal = service
        .filter(&UserFilter::new().with_roles([UserRole::It, UserRole::Legal]))
        .await
        .successful()
        .unwrap();
    assert_eq!(it_or_legal.len(), 2);

    let reports = service
        .filter(&UserFilter::new().reports_to(boss.user_id).first_name_like("Ber"))
        .await
        .successful()
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].name.first_name, "Bernard");

    // Contains is case-sensitive.
    let lower = service
        .filter(&UserFilter::new().first_name_like("ber"))
        .await
        .successful()
        .unwrap();
    assert!(lower.is_empty());
}

fn lead_input(actor: Uuid) -> NewLead {
    NewLead {
        address: Some(Address {
            street_line_one: "7 Pine".into(),
            city: "Boise".into(),
            state: "ID".into(),
            zip: "83702".into(),
            ..Default::default()
        }),
        name: Some(Name::new("Mary", "Jackson")),
        modified_by: Some(actor),
        tags: ["east".to_string()].into(),
        contact_info: Some(ContactInfo::default()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_contact_update_keeps_identity_and_lead_link() {
    let leads: MemoryCollection<Lead> = MemoryCollection::new("leads");
    let contacts: MemoryCollection<Contact> = MemoryCollection::new("contacts");
    let lead_service = LeadService::new(Arc::new(leads), Arc::new(contacts.clone()));
    let contact_service = ContactService::new(Arc::new(contacts.clone()));

    let actor = Uuid::new_v4();
    let lead = lead_service
        .create(lead_input(actor))
        .await
        .successful()
        .unwrap();
    let contact = lead_service
        .convert(
            lead.record.id,
            ConvertLead {
                modified_by: Some(actor),
            },
        )
        .await
        .successful()
        .unwrap();

    let editor = Uuid::new_v4();
    let update = UpdateContact {
        mailing_address: Some(contact.mailing_address.clone()),
        other_address: Some(Address {
            street_line_one: "1 Office Park".into(),
            city: "Boise".into(),
            state: "ID".into(),
            zip: "83702".into(),
            ..Default::default()
        }),
        primary_name: Some(Name::new("Mary", "Jackson")),
        secondary_name: Some(Name::new("M.", "Jackson")),
        modified_by: Some(editor),
        tags: ["east".to_string(), "engineer".to_string()].into(),
        primary_contact_info: Some(ContactInfo::default()),
        ..Default::default()
    };
    let updated = contact_service
        .update(contact.record.id, update)
        .await
        .successful()
        .unwrap();

    assert_eq!(updated.record.id, contact.record.id);
    assert_eq!(updated.record.created_time, contact.record.created_time);
    assert_eq!(updated.record.created_by_user_id, actor);
    assert_eq!(updated.record.modified_by, editor);
    assert!(updated.record.last_modified_time >= updated.record.created_time);
    assert_eq!(updated.associated_lead_id, Some(lead.record.id));
    assert!(updated.other_address.is_some());

    let engineers = contact_service
        .filter(&ContactFilter::new().with_record(RecordFilter::new().with_tags(["engineer"])))
        .await
        .successful()
        .unwrap();
    assert_eq!(engineers.len(), 1);
}

#[tokio::test]
async fn test_contact_update_missing_is_not_found() {
    let contacts: MemoryCollection<Contact> = MemoryCollection::new("contacts");
    let service = ContactService::new(Arc::new(contacts.clone()));
    let outcome = service
        .update(
            Uuid::new_v4(),
            UpdateContact {
                modified_by: Some(Uuid::new_v4()),
                ..Default::default()
            },
        )
        .await;
    assert!(outcome.is_not_found());
    assert!(contacts.find_all().await.successful().unwrap().is_empty());
}

#[tokio::test]
async fn test_lead_update_preserves_conversion_state() {
    let leads: MemoryCollection<Lead> = MemoryCollection::new("leads");
    let contacts: MemoryCollection<Contact> = MemoryCollection::new("contacts");
    let service = LeadService::new(Arc::new(leads), Arc::new(contacts));
    let actor = Uuid::new_v4();
    let lead = service.create(lead_input(actor)).await.successful().unwrap();
    service
        .convert(
            lead.record.id,
            ConvertLead {
                modified_by: Some(actor),
            },
        )
        .await
        .successful()
        .unwrap();

    let mut input = lead_input(actor);
    input.name = Some(Name::new("Mary", "Winston"));
    let updated = service
        .update(lead.record.id, input)
        .await
        .successful()
        .unwrap();
    assert!(updated.converted);
    assert_eq!(updated.name.last_name, "Winston");
    assert_eq!(updated.record.created_time, lead.record.created_time);

    let listed = service.list(None).await.successful().unwrap();
    assert!(listed.is_empty(), "default listing shows unconverted leads");
    let listed = service.list(Some(true)).await.successful().unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_lead_create_validation_is_bad_request() {
    let service = LeadService::new(
        Arc::new(MemoryCollection::<Lead>::new("leads")),
        Arc::new(MemoryCollection::<Contact>::new("contacts")),
    );
    let mut input = lead_input(Uuid::new_v4());
    input.address = None;
    match service.create(input).await {
        Outcome::BadRequest(problem) => assert!(problem.message.contains("address")),
        other => panic!("expected BadRequest, got {}", other.kind()),
    }
    assert!(service.list_all().await.successful().unwrap().is_empty());
}
