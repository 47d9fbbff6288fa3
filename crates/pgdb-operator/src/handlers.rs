use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use pgdb_core::{PostgresDatabaseController, ReconcileOutcome};
use serde::Serialize;

use crate::error::ApiError;
use crate::hook::{HookStore, SyncRequest, SyncResponse};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            error: None,
        }),
    )
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match state.readiness.check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ready",
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                    error: Some(e),
                }),
            )
        }
    }
}

/// Reconciles the posted parent and returns its desired children.
pub async fn sync(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, ApiError> {
    let store = Arc::new(HookStore::new(request));
    let key = store.parent_key();

    let controller = PostgresDatabaseController::new(
        store.clone(),
        state.database.clone(),
        state.credentials.clone(),
    )
    .with_persist_policy(state.persist_policy);

    if let ReconcileOutcome::Provisioned { action, .. } = controller.reconcile(&key).await? {
        tracing::debug!(parent = %key, secret_action = ?action, "Sync produced children");
    }

    Ok(Json(SyncResponse {
        children: store.children(),
    }))
}
