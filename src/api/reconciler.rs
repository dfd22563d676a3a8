use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use super::AppState;

/// Returns the report of the last reconciliation tick, 404 before the first one
pub async fn last_run(State(state): State<AppState>) -> impl IntoResponse {
    match state.last_run.read().await.clone() {
        Some(report) => (StatusCode::OK, Json(json!(report))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "No reconciliation tick has run yet" })),
        ),
    }
}
