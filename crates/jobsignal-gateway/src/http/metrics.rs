//! GET /metrics — gated counters surface, behind an optional bearer token.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::app::AppState;

fn bearer_token_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token == expected)
        .unwrap_or(false)
}

pub async fn metrics_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !state.config.metrics.enabled {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "metrics endpoint disabled"})),
        ));
    }

    if let Some(expected) = &state.config.metrics.token {
        if !bearer_token_matches(&headers, expected) {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "missing or invalid bearer token"})),
            ));
        }
    }

    Ok(Json(state.metrics.render(&state.store)))
}
