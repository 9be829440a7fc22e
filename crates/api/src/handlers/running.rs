//! Snapshot of investigations currently executing in this process.

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

pub async fn list_running(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "running": state.list_running() }))
}
