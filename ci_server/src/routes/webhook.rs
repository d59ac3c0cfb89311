//! GitHub webhook handler — receives push events, dispatches builds.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};

use crate::intake::{self, IntakeError};
use crate::routes::CiRouterState;

/// Handle an incoming GitHub webhook payload.
///
/// Ping and unknown event types are acknowledged without touching the
/// parser. A valid push spawns one independent orchestrator task and
/// returns immediately; one slow build never blocks another event.
pub async fn handle_webhook(
    state: &CiRouterState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    let event_type = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    match event_type {
        "push" => handle_push(state, body),
        "ping" => {
            tracing::info!("Received GitHub ping webhook");
            Ok(StatusCode::OK)
        }
        _ => {
            tracing::debug!("Ignoring webhook event: {}", event_type);
            Ok(StatusCode::OK)
        }
    }
}

fn handle_push(state: &CiRouterState, body: Bytes) -> Result<StatusCode, StatusCode> {
    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?;

    match intake::parse(&payload) {
        Ok(event) => {
            tracing::info!(
                commit = %event.commit_hash,
                branch = %event.branch,
                "Push accepted, dispatching build"
            );
            let orchestrator = state.orchestrator.clone();
            tokio::spawn(async move {
                orchestrator.handle_event(event).await;
            });
            Ok(StatusCode::ACCEPTED)
        }
        Err(IntakeError::NotBuildable) => {
            tracing::info!("Push deleted a branch, nothing to build");
            Ok(StatusCode::OK)
        }
        Err(e @ IntakeError::Malformed(_)) => {
            tracing::warn!("Dropping push payload: {e}");
            Ok(StatusCode::OK)
        }
    }
}
