//! Record services: one per entity family.
//!
//! Services validate input, stamp audit fields, and delegate storage to the
//! repository traits. Every operation returns an [`Outcome`](crate::Outcome).

pub mod contacts;
pub mod leads;
pub mod users;

pub use contacts::{ContactService, UpdateContact};
pub use leads::{ConvertLead, LeadService, NewLead};
pub use users::{UserInput, UserService};

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::error::{Error, Result};

/// Unwrap a required input field.
pub(crate) fn require<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| Error::InvalidInput(format!("{} is required", field)))
}

/// The user attributed with a change. Must be present and not nil.
pub(crate) fn require_actor(modified_by: Option<Uuid>) -> Result<Uuid> {
    match modified_by {
        Some(actor) if !actor.is_nil() => Ok(actor),
        Some(_) => Err(Error::InvalidInput("modifiedBy must not be nil".to_string())),
        None => Err(Error::InvalidInput("modifiedBy is required".to_string())),
    }
}

pub(crate) fn validate_tags(tags: &BTreeSet<String>) -> Result<()> {
    if tags.iter().any(|t| t.trim().is_empty()) {
        return Err(Error::InvalidInput("tags must not be blank".to_string()));
    }
    Ok(())
}
