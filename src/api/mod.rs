use axum::{routing::get, Router};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::jobs::LastRun;

pub mod health;
pub mod reconciler;

/// Shared state of the ops endpoints
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub last_run: LastRun,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/reconciler/last-run", get(reconciler::last_run))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
