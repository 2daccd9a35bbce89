use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, message) = match state.init_error() {
        None if state.is_ready() => ("Ready", "RAG system is ready.".to_string()),
        None => ("Error", "RAG system could not be initialized.".to_string()),
        Some(reason) => (
            "Error",
            format!("RAG system could not be initialized: {}", reason),
        ),
    };

    Json(json!({
        "status": status,
        "message": message,
        "started_at": state.started_at.to_rfc3339(),
    }))
}
