//! User HTTP handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use personable_core::{User, UserFilter, UserInput};

use crate::{settle, ApiError, AppState};

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(settle(state.users.list_all().await)?))
}

/// Users matching every supplied field of the filter body.
///
/// Name filters are case-sensitive substring matches; `roles` matches users
/// holding any of the listed roles.
pub async fn filter_users(
    State(state): State<AppState>,
    body: Result<Json<UserFilter>, JsonRejection>,
) -> Result<Json<Vec<User>>, ApiError> {
    let Json(filter) = body?;
    Ok(Json(settle(state.users.filter(&filter).await)?))
}

pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<User>, ApiError> {
    let Path(id) = id?;
    Ok(Json(settle(state.users.get(id).await)?))
}

pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<UserInput>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(input) = body?;
    Ok(Json(settle(state.users.create(input).await)?))
}

pub async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UserInput>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Path(id) = id?;
    let Json(input) = body?;
    Ok(Json(settle(state.users.update(id, input).await)?))
}

/// Delete a user.
///
/// # Returns
/// - 204 No Content on success
/// - 404 Not Found if the user doesn't exist
/// - 500 Internal Server Error if the store did not acknowledge the delete
pub async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    settle(state.users.delete(id).await)?;
    Ok(StatusCode::NO_CONTENT)
}
