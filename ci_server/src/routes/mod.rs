//! HTTP routes — webhook intake and the read-only build API.

pub mod api;
pub mod webhook;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::services::orchestrator::Orchestrator;
use crate::store::BuildStore;

/// Shared state for route handlers.
#[derive(Clone)]
pub struct CiRouterState {
    pub store: Arc<BuildStore>,
    pub orchestrator: Arc<Orchestrator>,
}

/// Build the Axum router.
pub fn ci_router(state: CiRouterState) -> Router {
    Router::new()
        // Webhook
        .route("/webhook/github", post(webhook_handler))
        // Build API
        .route("/api/builds", get(list_builds_handler))
        .route("/api/builds/{build_id}", get(get_build_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Webhook ──

async fn webhook_handler(
    State(state): State<CiRouterState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    crate::metrics::webhook_received(
        headers
            .get("x-github-event")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown"),
    );

    webhook::handle_webhook(&state, &headers, body).await
}

// ── Build API ──

#[derive(serde::Deserialize)]
pub struct ListBuildsQuery {
    pub limit: Option<usize>,
}

async fn list_builds_handler(
    State(state): State<CiRouterState>,
    Query(query): Query<ListBuildsQuery>,
) -> Json<Vec<api::BuildSummaryJson>> {
    Json(api::list_builds(&state.store, query.limit.unwrap_or(20)).await)
}

async fn get_build_handler(
    State(state): State<CiRouterState>,
    Path(build_id): Path<u64>,
) -> Result<Json<api::BuildJson>, StatusCode> {
    api::get_build(&state.store, build_id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
