//! Central shared state and router assembly: one `AppState` behind `Arc`,
//! one `build_router` wiring every route to it.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use jobsignal_chat::{ChatSender, HttpChatSender};
use jobsignal_core::JobSignalConfig;
use jobsignal_store::Store;
use jobsignal_window::WindowManager;

use crate::metrics::MetricsRegistry;

/// Shared state threaded into every Axum handler. Background workers
/// (enrichment, scheduler, reminder daemon) are spawned independently in
/// `main` and do not hold a reference to this struct — they depend only on
/// `Store` and the provider traits.
pub struct AppState {
    pub config: JobSignalConfig,
    pub store: Arc<Store>,
    pub window_manager: Arc<WindowManager>,
    pub chat: Arc<dyn ChatSender>,
    pub metrics: MetricsRegistry,
}

impl AppState {
    pub fn new(
        config: JobSignalConfig,
        store: Arc<Store>,
        window_manager: Arc<WindowManager>,
        chat: Arc<dyn ChatSender>,
    ) -> Self {
        Self {
            config,
            store,
            window_manager,
            chat,
            metrics: MetricsRegistry::new(),
        }
    }
}

/// Constructs the outbound `HttpChatSender` from chat config, or `None`
/// when no access token is configured (local/dev mode — inbound plumbing
/// and window bookkeeping still work; outbound send calls fail loudly).
pub fn build_chat_sender(config: &jobsignal_core::config::ChatConfig) -> Arc<dyn ChatSender> {
    Arc::new(HttpChatSender::new(
        config.base_url.clone(),
        config.access_token.clone().unwrap_or_default(),
        config.send_timeout_ms,
    ))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(crate::http::root::root_handler))
        .route("/health", get(crate::http::health::health_handler))
        .route("/metrics", get(crate::http::metrics::metrics_handler))
        .route(
            "/webhooks/chat",
            get(crate::http::webhooks::verify_handler).post(crate::http::webhooks::inbound_handler),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsignal_core::Clock;
    use jobsignal_core::FixedClock;

    fn test_state() -> Arc<AppState> {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(chrono::Utc::now()));
        let window_manager = Arc::new(WindowManager::new(
            store.clone(),
            clock,
            jobsignal_core::config::WindowConfig::default(),
        ));
        struct NullChat;
        #[async_trait::async_trait]
        impl ChatSender for NullChat {
            async fn send(&self, _handle: &str, _text: &str) -> jobsignal_core::Result<()> {
                Ok(())
            }
        }
        Arc::new(AppState::new(
            JobSignalConfig::default(),
            store,
            window_manager,
            Arc::new(NullChat),
        ))
    }

    #[test]
    fn router_builds_without_panicking() {
        let state = test_state();
        let _router = build_router(state);
    }
}
