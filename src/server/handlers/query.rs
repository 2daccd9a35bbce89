use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub const UNAVAILABLE_MESSAGE: &str =
    "Service unavailable. Check GEMINI_API_KEY and make sure the ingestion step has been run.";

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub response: String,
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Some(engine) = state.engine() else {
        return Err(ApiError::ServiceUnavailable(UNAVAILABLE_MESSAGE.to_string()));
    };

    let query = payload.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }

    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, "Received query: {}", query);

    match engine.query(query).await {
        Ok(answer) => {
            tracing::info!(
                %request_id,
                sources = answer.sources.len(),
                "Query answered"
            );
            Ok(Json(QueryResponse {
                response: answer.response,
            }))
        }
        Err(err) => {
            tracing::error!(%request_id, "Error while processing query: {}", err);
            Err(ApiError::Internal(format!(
                "An error occurred while processing the query: {}",
                err.detail()
            )))
        }
    }
}
