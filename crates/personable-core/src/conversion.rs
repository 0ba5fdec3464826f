//! Lead to Contact conversion.
//!
//! Conversion is a saga over two collections:
//!
//! 1. Atomically flip the lead to `converted` and record a pending marker
//!    holding a pre-reserved contact id ([`LeadStore::mark_converted`]).
//! 2. Build the contact from the post-update lead snapshot.
//! 3. Insert the contact under the reserved id.
//! 4. Clear the marker.
//!
//! If step 3 fails the lead stays converted with its marker in place. That
//! state is logged as a consistency warning and repaired later by
//! [`reconcile_pending_conversions`], which re-creates the contact under the
//! same reserved id so a lead never ends up with two contacts.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::filter::paths;
use crate::models::{Contact, Lead, RecordMeta};
use crate::outcome::Outcome;
use crate::predicate::{Clause, Condition, Predicate};
use crate::traits::{LeadStore, Repository};

/// Build the contact materialized from a converted lead.
///
/// Only the primary slots are filled; conversion never invents a second
/// address, name, or contact info.
pub fn contact_from_lead(
    lead: &Lead,
    contact_id: Uuid,
    actor: Uuid,
    now: DateTime<Utc>,
) -> Contact {
    Contact {
        record: RecordMeta {
            id: contact_id,
            created_time: now,
            created_by_user_id: actor,
            modified_by: actor,
            last_modified_time: now,
            annual_salary: lead.record.annual_salary.clone(),
            lead_source: lead.record.lead_source.clone(),
            tags: lead.record.tags.clone(),
        },
        mailing_address: lead.address.clone(),
        other_address: None,
        primary_name: lead.name.clone(),
        secondary_name: None,
        primary_contact_info: lead.contact_info.clone(),
        secondary_contact_info: None,
        associated_lead_id: Some(lead.record.id),
    }
}

/// Convert a lead into a new contact on behalf of `actor`.
///
/// Returns the created contact. `NotFound` if the lead does not exist and
/// `BadRequest` if it was already converted; no contact is created in
/// either case.
pub async fn convert_lead(
    leads: &dyn LeadStore,
    contacts: &dyn Repository<Contact>,
    lead_id: Uuid,
    actor: Uuid,
) -> Outcome<Contact> {
    let start = Instant::now();
    let now = Utc::now();
    let contact_id = Uuid::new_v4();

    let lead = crate::try_outcome!(leads.mark_converted(lead_id, actor, now, contact_id).await);

    let contact = match contacts.insert(contact_from_lead(&lead, contact_id, actor, now)).await {
        Outcome::Successful(contact) => contact,
        failure => {
            error!(
                subsystem = "service",
                component = "conversion",
                consistency = "conversion_pending",
                lead_id = %lead_id,
                contact_id = %contact_id,
                actor = %actor,
                outcome = failure.kind(),
                error = %failure_cause(&failure),
                "Lead marked converted but contact insert failed"
            );
            return failure;
        }
    };

    clear_marker(leads, lead_id).await;

    info!(
        subsystem = "service",
        component = "conversion",
        op = "convert",
        lead_id = %lead_id,
        contact_id = %contact.record.id,
        actor = %actor,
        duration_ms = start.elapsed().as_millis() as u64,
        "Lead converted"
    );
    Outcome::Successful(contact)
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Leads carrying a pending marker older than the threshold.
    pub examined: usize,
    /// Missing contacts re-created.
    pub repaired: usize,
    /// Contacts that already existed; only the marker was cleared.
    pub already_present: usize,
    /// Leads left pending for the next pass.
    pub failed: usize,
}

/// Repair conversions whose pending marker is older than `threshold`.
///
/// For each such lead the contact is re-created under its reserved id
/// unless it already exists, then the marker is cleared. A lead that cannot
/// be repaired keeps its marker and is retried on the next pass.
pub async fn reconcile_pending_conversions(
    leads: &dyn LeadStore,
    contacts: &dyn Repository<Contact>,
    threshold: DateTime<Utc>,
) -> Outcome<ReconcileReport> {
    let predicate = Predicate::always().and(Clause::new(
        paths::PENDING_CONVERSION_SINCE,
        Condition::Before(threshold),
    ));
    let stale = crate::try_outcome!(leads.find_by_predicate(&predicate).await);

    let mut report = ReconcileReport::default();
    for lead in stale {
        let Some(pending) = lead.pending_conversion.clone() else {
            continue;
        };
        report.examined += 1;
        let lead_id = lead.record.id;

        let present = match contacts.find_by_id(pending.contact_id).await {
            Outcome::Successful(_) => true,
            Outcome::NotFound => false,
            failure => {
                warn!(
                    subsystem = "service",
                    component = "conversion",
                    op = "reconcile",
                    lead_id = %lead_id,
                    contact_id = %pending.contact_id,
                    error = %failure_cause(&failure),
                    "Could not check for converted contact"
                );
                report.failed += 1;
                continue;
            }
        };

        if !present {
            let contact = contact_from_lead(
                &lead,
                pending.contact_id,
                pending.converted_by,
                pending.since,
            );
            let inserted = contacts.insert(contact).await;
            if !inserted.is_successful() {
                warn!(
                    subsystem = "service",
                    component = "conversion",
                    op = "reconcile",
                    consistency = "conversion_pending",
                    lead_id = %lead_id,
                    contact_id = %pending.contact_id,
                    error = %failure_cause(&inserted),
                    "Could not re-create converted contact"
                );
                report.failed += 1;
                continue;
            }
        }

        if !clear_marker(leads, lead_id).await {
            report.failed += 1;
        } else if present {
            report.already_present += 1;
        } else {
            report.repaired += 1;
        }
    }

    info!(
        subsystem = "service",
        component = "conversion",
        op = "reconcile",
        examined = report.examined,
        repaired = report.repaired,
        already_present = report.already_present,
        failed = report.failed,
        "Reconciliation pass complete"
    );
    Outcome::Successful(report)
}

/// Clear the pending marker. Returns false when the marker could not be
/// cleared; the next reconciliation pass will pick the lead up again.
async fn clear_marker(leads: &dyn LeadStore, lead_id: Uuid) -> bool {
    match leads.clear_pending_conversion(lead_id).await {
        Outcome::Successful(_) => {
            debug!(subsystem = "service", component = "conversion", lead_id = %lead_id, "Cleared pending conversion");
            true
        }
        failure => {
            warn!(
                subsystem = "service",
                component = "conversion",
                consistency = "conversion_pending",
                lead_id = %lead_id,
                error = %failure_cause(&failure),
                "Could not clear pending conversion marker"
            );
            false
        }
    }
}

fn failure_cause<T>(outcome: &Outcome<T>) -> String {
    match outcome {
        Outcome::Failed(err) => err.to_string(),
        Outcome::BadRequest(problem) => problem.message.clone(),
        other => other.kind().to_string(),
    }
}
