//! # personable-api
//!
//! HTTP transport for the personable record services.
//!
//! Every service operation returns an [`Outcome`]; [`settle`] turns it into
//! either the success value or an [`ApiError`], and `ApiError` owns the
//! status code and body mapping:
//!
//! | Outcome | Response |
//! |---------|----------|
//! | `Successful` | 200 with JSON body (204 for deletes) |
//! | `NotFound` | 404 |
//! | `BadRequest` | 400 `{"message": ...}` |
//! | `Failed` | 500 `{"error": "internal server error"}` |

pub mod config;
pub mod handlers;

use std::sync::Arc;

use axum::{
    body::Body,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::error;
use uuid::Uuid;

use personable_core::{
    Contact, ContactService, Error, Lead, LeadService, LeadStore, MemoryCollection, Outcome,
    Repository, User, UserService,
};
use personable_db::{CollectionSettings, Database};

pub use config::{ServerConfig, StorageBackend};

// =============================================================================
// STATE
// =============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub leads: LeadService,
    pub contacts: ContactService,
    pub users: UserService,
    /// Present when running on PostgreSQL; used by the health check.
    pub db: Option<Database>,
}

impl AppState {
    pub fn new(
        leads: Arc<dyn LeadStore>,
        contacts: Arc<dyn Repository<Contact>>,
        users: Arc<dyn Repository<User>>,
    ) -> Self {
        Self {
            leads: LeadService::new(leads, contacts.clone()),
            contacts: ContactService::new(contacts),
            users: UserService::new(users),
            db: None,
        }
    }

    /// State over fresh in-process collections named as in `settings`.
    pub fn in_memory(settings: &CollectionSettings) -> Self {
        let leads: MemoryCollection<Lead> = MemoryCollection::new(settings.leads.clone());
        let contacts: MemoryCollection<Contact> = MemoryCollection::new(settings.contacts.clone());
        let users: MemoryCollection<User> = MemoryCollection::new(settings.users.clone());
        Self::new(Arc::new(leads), Arc::new(contacts), Arc::new(users))
    }

    /// State over the PostgreSQL collections of `db`.
    pub fn from_database(db: Database) -> Self {
        let mut state = Self::new(
            Arc::new(db.leads.clone()),
            Arc::new(db.contacts.clone()),
            Arc::new(db.users.clone()),
        );
        state.db = Some(db);
        state
    }
}

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the application router.
///
/// `allowed_origins` lists the origins permitted for cross-origin requests;
/// an empty list permits none.
pub fn router(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    use handlers::{contacts, health, leads, users};

    Router::new()
        .route("/health", get(health::health_check))
        // Leads
        .route("/api/leads", get(leads::list_leads).post(leads::create_lead))
        .route("/api/leads/get", post(leads::filter_leads))
        .route("/api/leads/:id", get(leads::get_lead).put(leads::update_lead))
        .route("/api/leads/:id/convert", post(leads::convert_lead))
        // Contacts
        .route("/api/contacts", get(contacts::list_contacts))
        .route("/api/contacts/get", post(contacts::filter_contacts))
        .route(
            "/api/contacts/:id",
            get(contacts::get_contact).put(contacts::update_contact),
        )
        // Users
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/get", post(users::filter_users))
        .route(
            "/api/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Middleware
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .max_age(std::time::Duration::from_secs(3600)),
        )
        .with_state(state)
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    /// Storage or internal fault. Logged, never returned to the caller.
    Internal(Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "message": message })),
            )
                .into_response(),
            ApiError::Internal(err) => {
                error!(subsystem = "api", error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Unwrap a successful outcome or convert it into the matching error.
pub fn settle<T>(outcome: Outcome<T>) -> Result<T, ApiError> {
    match outcome {
        Outcome::Successful(value) => Ok(value),
        Outcome::NotFound => Err(ApiError::NotFound),
        Outcome::BadRequest(problem) => Err(ApiError::BadRequest(problem.message)),
        Outcome::Failed(err) => Err(ApiError::Internal(err)),
    }
}
