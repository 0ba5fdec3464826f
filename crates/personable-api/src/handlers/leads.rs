//! Lead HTTP handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use personable_core::{Contact, ConvertLead, Lead, LeadFilter, NewLead};

use crate::{settle, ApiError, AppState};

/// Query parameters for listing leads.
#[derive(Debug, Deserialize)]
pub struct ListLeadsQuery {
    /// Conversion status to list; unconverted leads when omitted.
    pub converted: Option<bool>,
}

/// List leads by conversion status.
///
/// # Query Parameters
/// - `converted`: `true` or `false` (default `false`)
pub async fn list_leads(
    State(state): State<AppState>,
    query: Result<Query<ListLeadsQuery>, QueryRejection>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    let Query(query) = query?;
    Ok(Json(settle(state.leads.list(query.converted).await)?))
}

/// Leads matching every supplied field of the filter body.
pub async fn filter_leads(
    State(state): State<AppState>,
    body: Result<Json<LeadFilter>, JsonRejection>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    let Json(filter) = body?;
    Ok(Json(settle(state.leads.filter(&filter).await)?))
}

pub async fn get_lead(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Lead>, ApiError> {
    let Path(id) = id?;
    Ok(Json(settle(state.leads.get(id).await)?))
}

/// Create a lead.
///
/// # Returns
/// - 200 OK with the stored lead
/// - 400 Bad Request if a required field is missing or invalid
pub async fn create_lead(
    State(state): State<AppState>,
    body: Result<Json<NewLead>, JsonRejection>,
) -> Result<Json<Lead>, ApiError> {
    let Json(input) = body?;
    Ok(Json(settle(state.leads.create(input).await)?))
}

/// Replace the mutable fields of a lead.
///
/// # Returns
/// - 200 OK with the updated lead
/// - 400 Bad Request if validation fails
/// - 404 Not Found if the lead doesn't exist
pub async fn update_lead(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<NewLead>, JsonRejection>,
) -> Result<Json<Lead>, ApiError> {
    let Path(id) = id?;
    let Json(input) = body?;
    Ok(Json(settle(state.leads.update(id, input).await)?))
}

/// Convert a lead into a contact.
///
/// # Returns
/// - 200 OK with the new contact
/// - 400 Bad Request if `modifiedBy` is missing or the lead is already converted
/// - 404 Not Found if the lead doesn't exist
/// - 500 Internal Server Error if the contact could not be stored
pub async fn convert_lead(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ConvertLead>, JsonRejection>,
) -> Result<Json<Contact>, ApiError> {
    let Path(id) = id?;
    let Json(input) = body?;
    Ok(Json(settle(state.leads.convert(id, input).await)?))
}
