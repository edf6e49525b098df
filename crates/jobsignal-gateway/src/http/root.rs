//! GET / — static JSON banner for smoke-testing.

use axum::Json;
use serde_json::{json, Value};

pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "service": "jobsignal-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "chat-provider-webhook-v1",
    }))
}
