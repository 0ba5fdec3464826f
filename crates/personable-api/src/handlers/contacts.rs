//! Contact HTTP handlers.
//!
//! Contacts are only created by lead conversion, so there is no create route.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use uuid::Uuid;

use personable_core::{Contact, ContactFilter, UpdateContact};

use crate::{settle, ApiError, AppState};

pub async fn list_contacts(State(state): State<AppState>) -> Result<Json<Vec<Contact>>, ApiError> {
    Ok(Json(settle(state.contacts.list_all().await)?))
}

pub async fn filter_contacts(
    State(state): State<AppState>,
    body: Result<Json<ContactFilter>, JsonRejection>,
) -> Result<Json<Vec<Contact>>, ApiError> {
    let Json(filter) = body?;
    Ok(Json(settle(state.contacts.filter(&filter).await)?))
}

pub async fn get_contact(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Contact>, ApiError> {
    let Path(id) = id?;
    Ok(Json(settle(state.contacts.get(id).await)?))
}

pub async fn update_contact(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateContact>, JsonRejection>,
) -> Result<Json<Contact>, ApiError> {
    let Path(id) = id?;
    let Json(input) = body?;
    Ok(Json(settle(state.contacts.update(id, input).await)?))
}
