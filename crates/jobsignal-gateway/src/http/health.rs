//! GET /health — liveness probe enumerating this system's four external
//! dependencies: store, chat, model (enrichment), embedding.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::app::AppState;

fn dependency_status(name: &str, healthy: bool, detail: &str) -> Value {
    json!({
        "name": name,
        "status": if healthy { "ok" } else { "degraded" },
        "detail": detail,
    })
}

/// The store check is a real query; the three external-provider checks
/// report configuration presence rather than a live call, since a health
/// probe that itself burns model/embedding budget on every poll would
/// undercut rate-limiting policy.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store_ok = state.store.users.count_total().is_ok();

    let deps = vec![
        dependency_status("store", store_ok, "sqlite connection"),
        dependency_status(
            "chat",
            state.config.chat.access_token.is_some(),
            "outbound access token configured",
        ),
        dependency_status(
            "model",
            state.config.enrichment.api_key.is_some(),
            "enrichment provider api key configured",
        ),
        dependency_status(
            "embedding",
            state.config.embedding.api_key.is_some(),
            "embedding provider api key configured",
        ),
    ];

    let all_ok = store_ok;
    Json(json!({
        "status": if all_ok { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "dependencies": deps,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{build_chat_sender, AppState};
    use jobsignal_core::config::ChatConfig;
    use jobsignal_core::{Clock, FixedClock, JobSignalConfig};
    use jobsignal_store::Store;
    use jobsignal_window::WindowManager;

    #[tokio::test]
    async fn health_reports_ok_when_store_reachable() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(chrono::Utc::now()));
        let window_manager = Arc::new(WindowManager::new(
            store.clone(),
            clock,
            jobsignal_core::config::WindowConfig::default(),
        ));
        let state = Arc::new(AppState::new(
            JobSignalConfig::default(),
            store,
            window_manager,
            build_chat_sender(&ChatConfig::default()),
        ));

        let Json(body) = health_handler(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["dependencies"][0]["status"], "ok");
    }
}
