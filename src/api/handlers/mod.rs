use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::engine::selectors::{self, AreaSummary};
use crate::engine::{AppState, Request, Store};

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Intents
// ============================================================

/// Queue a request. The result shows up in later snapshots.
pub async fn dispatch(
    State(store): State<Store>,
    Json(request): Json<Request>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, String)> {
    let kind = request.name();
    store.dispatch(request).map_err(|e| {
        tracing::error!("Dispatch failed: {}", e);
        (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "queued", "kind": kind })),
    ))
}

// ============================================================
// Snapshot
// ============================================================

pub async fn get_state(State(store): State<Store>) -> Json<AppState> {
    Json(AppState::clone(&store.snapshot()))
}

pub async fn list_area_summaries(State(store): State<Store>) -> Json<Vec<AreaSummary>> {
    Json(selectors::area_summaries(&store.snapshot()))
}

pub async fn get_area_summary(
    State(store): State<Store>,
    Path(id): Path<Uuid>,
) -> Result<Json<AreaSummary>, (StatusCode, String)> {
    selectors::area_summary(&store.snapshot(), id)
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Area not found".to_string()))
}
