//! Lead service.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{require, require_actor, validate_tags};
use crate::conversion::{convert_lead, reconcile_pending_conversions, ReconcileReport};
use crate::error::Result;
use crate::filter::LeadFilter;
use crate::models::{Address, Contact, ContactInfo, Lead, LeadDetails, Name, RecordMeta};
use crate::outcome::Outcome;
use crate::traits::{LeadStore, Repository};

/// Body of a lead create or update request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub name: Option<Name>,
    #[serde(default)]
    pub modified_by: Option<Uuid>,
    #[serde(default)]
    pub annual_salary: Option<BigDecimal>,
    #[serde(default)]
    pub lead_source: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
}

impl NewLead {
    /// Check the request and split it into the acting user and the fields
    /// to store.
    fn validate(self) -> Result<(Uuid, LeadDetails)> {
        let actor = require_actor(self.modified_by)?;
        let name = require(self.name, "name")?;
        name.validate("name").map_err(crate::Error::InvalidInput)?;
        let address = require(self.address, "address")?;
        let contact_info = require(self.contact_info, "contactInfo")?;
        validate_tags(&self.tags)?;
        Ok((
            actor,
            LeadDetails {
                address,
                name,
                contact_info,
                annual_salary: self.annual_salary,
                lead_source: self.lead_source,
                tags: self.tags,
            },
        ))
    }
}

/// Body of a conversion request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertLead {
    #[serde(default)]
    pub modified_by: Option<Uuid>,
}

#[derive(Clone)]
pub struct LeadService {
    leads: Arc<dyn LeadStore>,
    contacts: Arc<dyn Repository<Contact>>,
}

impl LeadService {
    pub fn new(leads: Arc<dyn LeadStore>, contacts: Arc<dyn Repository<Contact>>) -> Self {
        Self { leads, contacts }
    }

    /// Leads by conversion status; unconverted when the caller omits it.
    pub async fn list(&self, converted: Option<bool>) -> Outcome<Vec<Lead>> {
        self.filter(&LeadFilter::new().converted(converted.unwrap_or(false)))
            .await
    }

    pub async fn filter(&self, filter: &LeadFilter) -> Outcome<Vec<Lead>> {
        let predicate = filter.to_predicate();
        debug!(
            subsystem = "service",
            component = "leads",
            op = "filter",
            clause_count = predicate.clauses().len(),
            "Filtering leads"
        );
        self.leads.find_by_predicate(&predicate).await
    }

    pub async fn list_all(&self) -> Outcome<Vec<Lead>> {
        self.leads.find_all().await
    }

    pub async fn get(&self, id: Uuid) -> Outcome<Lead> {
        self.leads.find_by_id(id).await
    }

    pub async fn create(&self, input: NewLead) -> Outcome<Lead> {
        let (actor, details) = crate::try_outcome!(Outcome::from(input.validate()));

        let mut record = RecordMeta::created_by(actor, Utc::now());
        record.annual_salary = details.annual_salary;
        record.lead_source = details.lead_source;
        record.tags = details.tags;

        let lead = Lead {
            record,
            converted: false,
            address: details.address,
            name: details.name,
            prediction_score: None,
            contact_info: details.contact_info,
            pending_conversion: None,
        };
        self.leads.insert(lead).await
    }

    /// Replace the mutable fields of an existing lead.
    ///
    /// Conversion state and the prediction score are kept as stored, even
    /// when a conversion lands between the lookup and the write.
    pub async fn update(&self, id: Uuid, input: NewLead) -> Outcome<Lead> {
        crate::try_outcome!(self.leads.find_by_id(id).await);
        let (actor, details) = crate::try_outcome!(Outcome::from(input.validate()));
        self.leads
            .update_details(id, details, actor, Utc::now())
            .await
    }

    pub async fn convert(&self, id: Uuid, input: ConvertLead) -> Outcome<Contact> {
        let actor = crate::try_outcome!(Outcome::from(require_actor(input.modified_by)));
        convert_lead(self.leads.as_ref(), self.contacts.as_ref(), id, actor).await
    }

    /// Repair conversions left pending for longer than `older_than`.
    pub async fn reconcile_pending(&self, older_than: Duration) -> Outcome<ReconcileReport> {
        let threshold = Utc::now() - older_than;
        reconcile_pending_conversions(self.leads.as_ref(), self.contacts.as_ref(), threshold).await
    }
}
