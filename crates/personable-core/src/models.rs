//! Core data models for personable.
//!
//! Leads and contacts share their audit and classification attributes through
//! an embedded [`RecordMeta`]; users are a separate family with their own
//! identity. Address, name, and contact-info values have no identity of their
//! own and are always replaced wholesale.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// DOCUMENT TRAITS
// =============================================================================

/// Anything stored as a document in a collection.
pub trait Document {
    /// The immutable identifier of the document.
    fn id(&self) -> Uuid;
}

// =============================================================================
// VALUE OBJECTS
// =============================================================================

/// Preferred way of reaching a person.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    Mobile,
    Fax,
    #[default]
    Email,
    Phone,
    Mail,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(default)]
    pub preferred_contact_method: ContactMethod,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salutation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_first_name: Option<String>,
}

impl Name {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Default::default()
        }
    }

    /// Check that the mandatory parts of the name are present.
    pub fn validate(&self, field: &str) -> std::result::Result<(), String> {
        if self.first_name.trim().is_empty() {
            return Err(format!("{}.firstName is required", field));
        }
        if self.last_name.trim().is_empty() {
            return Err(format!("{}.lastName is required", field));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street_line_one: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_line_two: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apt_suite: Option<String>,
    pub city: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    pub zip: String,
}

// =============================================================================
// RECORD TYPES
// =============================================================================

/// Attributes shared by leads and contacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    pub id: Uuid,
    pub created_time: DateTime<Utc>,
    pub created_by_user_id: Uuid,
    pub modified_by: Uuid,
    pub last_modified_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_salary: Option<BigDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_source: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl RecordMeta {
    /// Fresh metadata for a record created now by `actor`.
    pub fn created_by(actor: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_time: now,
            created_by_user_id: actor,
            modified_by: actor,
            last_modified_time: now,
            annual_salary: None,
            lead_source: None,
            tags: BTreeSet::new(),
        }
    }

    /// Stamp a modification by `actor`.
    ///
    /// The modification time never moves behind the creation time.
    pub fn touch(&mut self, actor: Uuid, now: DateTime<Utc>) {
        self.modified_by = actor;
        self.last_modified_time = now.max(self.created_time);
    }
}

/// Marker for a conversion whose contact has not been confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConversion {
    /// Id reserved for the contact materialized from the lead.
    pub contact_id: Uuid,
    /// User who requested the conversion; the repaired contact is created
    /// on their behalf.
    pub converted_by: Uuid,
    pub since: DateTime<Utc>,
}

/// A prospective contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(flatten)]
    pub record: RecordMeta,
    #[serde(default)]
    pub converted: bool,
    pub address: Address,
    pub name: Name,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_score: Option<f64>,
    pub contact_info: ContactInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_conversion: Option<PendingConversion>,
}

/// The caller-editable part of a lead.
///
/// Conversion state and the prediction score are not part of it, so an
/// update written from these fields cannot undo a conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDetails {
    pub address: Address,
    pub name: Name,
    pub contact_info: ContactInfo,
    pub annual_salary: Option<BigDecimal>,
    pub lead_source: Option<String>,
    pub tags: BTreeSet<String>,
}

impl LeadDetails {
    /// Overwrite the editable fields of `lead` and stamp the modification.
    pub fn apply_to(self, lead: &mut Lead, actor: Uuid, now: DateTime<Utc>) {
        lead.address = self.address;
        lead.name = self.name;
        lead.contact_info = self.contact_info;
        lead.record.annual_salary = self.annual_salary;
        lead.record.lead_source = self.lead_source;
        lead.record.tags = self.tags;
        lead.record.touch(actor, now);
    }
}

/// A converted, fully-fledged person record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(flatten)]
    pub record: RecordMeta,
    pub mailing_address: Address,
    #[serde(default)]
    pub other_address: Option<Address>,
    pub primary_name: Name,
    #[serde(default)]
    pub secondary_name: Option<Name>,
    pub primary_contact_info: ContactInfo,
    #[serde(default)]
    pub secondary_contact_info: Option<ContactInfo>,
    #[serde(default)]
    pub associated_lead_id: Option<Uuid>,
}

impl Document for Lead {
    fn id(&self) -> Uuid {
        self.record.id
    }
}

impl Document for Contact {
    fn id(&self) -> Uuid {
        self.record.id
    }
}

// =============================================================================
// USERS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    Developer,
    #[serde(rename = "IT")]
    It,
    Support,
    Teller,
    Manager,
    Accountant,
    Driver,
    Counter,
    FinancialAdvisor,
    AccountManager,
    LoanOfficer,
    InvestmentAdvisor,
    Enforcement,
    Legal,
    #[serde(rename = "HR")]
    Hr,
}

impl UserRole {
    /// Wire name of the role, as stored in user documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Developer => "Developer",
            UserRole::It => "IT",
            UserRole::Support => "Support",
            UserRole::Teller => "Teller",
            UserRole::Manager => "Manager",
            UserRole::Accountant => "Accountant",
            UserRole::Driver => "Driver",
            UserRole::Counter => "Counter",
            UserRole::FinancialAdvisor => "FinancialAdvisor",
            UserRole::AccountManager => "AccountManager",
            UserRole::LoanOfficer => "LoanOfficer",
            UserRole::InvestmentAdvisor => "InvestmentAdvisor",
            UserRole::Enforcement => "Enforcement",
            UserRole::Legal => "Legal",
            UserRole::Hr => "HR",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
    Inactive,
    Training,
}

/// A system user. `reporting_to` may point at another user; cycles are not
/// prevented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: Uuid,
    pub name: Name,
    pub email: String,
    #[serde(default)]
    pub roles: BTreeSet<UserRole>,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub reporting_to: Option<Uuid>,
}

impl Document for User {
    fn id(&self) -> Uuid {
        self.user_id
    }
}
