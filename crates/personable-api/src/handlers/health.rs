//! Liveness endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::AppState;

/// 200 when the process is up and, on PostgreSQL, the database answers.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let Some(db) = &state.db else {
        return (StatusCode::OK, Json(json!({ "status": "ok", "backend": "memory" })));
    };

    match db.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok", "backend": "postgres" }))),
        Err(err) => {
            warn!(subsystem = "api", op = "health_check", error = %err, "Database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "backend": "postgres" })),
            )
        }
    }
}
