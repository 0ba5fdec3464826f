//! Contact service.
//!
//! Contacts are only created through lead conversion, so there is no create
//! operation here.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{require, require_actor, validate_tags};
use crate::error::{Error, Result};
use crate::filter::ContactFilter;
use crate::models::{Address, Contact, ContactInfo, Name};
use crate::outcome::Outcome;
use crate::traits::Repository;

/// Body of a contact update request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContact {
    #[serde(default)]
    pub mailing_address: Option<Address>,
    #[serde(default)]
    pub other_address: Option<Address>,
    #[serde(default)]
    pub primary_name: Option<Name>,
    #[serde(default)]
    pub secondary_name: Option<Name>,
    #[serde(default)]
    pub modified_by: Option<Uuid>,
    #[serde(default)]
    pub annual_salary: Option<BigDecimal>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub primary_contact_info: Option<ContactInfo>,
    #[serde(default)]
    pub secondary_contact_info: Option<ContactInfo>,
}

impl UpdateContact {
    /// Validate and write the update onto `contact`, stamping the actor.
    fn apply_to(self, contact: &mut Contact) -> Result<()> {
        let actor = require_actor(self.modified_by)?;
        let primary_name = require(self.primary_name, "primaryName")?;
        primary_name
            .validate("primaryName")
            .map_err(Error::InvalidInput)?;
        if let Some(secondary) = &self.secondary_name {
            secondary
                .validate("secondaryName")
                .map_err(Error::InvalidInput)?;
        }
        let mailing_address = require(self.mailing_address, "mailingAddress")?;
        let primary_contact_info = require(self.primary_contact_info, "primaryContactInfo")?;
        validate_tags(&self.tags)?;

        contact.mailing_address = mailing_address;
        contact.other_address = self.other_address;
        contact.primary_name = primary_name;
        contact.secondary_name = self.secondary_name;
        contact.primary_contact_info = primary_contact_info;
        contact.secondary_contact_info = self.secondary_contact_info;
        contact.record.annual_salary = self.annual_salary;
        contact.record.tags = self.tags;
        contact.record.touch(actor, Utc::now());
        Ok(())
    }
}

#[derive(Clone)]
pub struct ContactService {
    contacts: Arc<dyn Repository<Contact>>,
}

impl ContactService {
    pub fn new(contacts: Arc<dyn Repository<Contact>>) -> Self {
        Self { contacts }
    }

    pub async fn list_all(&self) -> Outcome<Vec<Contact>> {
        self.contacts.find_all().await
    }

    pub async fn filter(&self, filter: &ContactFilter) -> Outcome<Vec<Contact>> {
        let predicate = filter.to_predicate();
        debug!(
            subsystem = "service",
            component = "contacts",
            op = "filter",
            clause_count = predicate.clauses().len(),
            "Filtering contacts"
        );
        self.contacts.find_by_predicate(&predicate).await
    }

    pub async fn get(&self, id: Uuid) -> Outcome<Contact> {
        self.contacts.find_by_id(id).await
    }

    /// Replace the mutable fields of an existing contact.
    ///
    /// `leadSource` and `associatedLeadId` are kept as stored.
    pub async fn update(&self, id: Uuid, input: UpdateContact) -> Outcome<Contact> {
        let mut contact = crate::try_outcome!(self.contacts.find_by_id(id).await);
        crate::try_outcome!(Outcome::from(input.apply_to(&mut contact)));
        self.contacts.replace(id, contact).await
    }
}
