//! Chat Provider inbound surface. `GET /webhooks/chat` is the verification
//! handshake; `POST /webhooks/chat` carries inbound messages. Parsing,
//! signing, and templates already live in `jobsignal-chat` — this module is
//! the thin HTTP binding plus the window-bump/welcome side effect.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use jobsignal_chat::{parse_webhook_payload, render_welcome, verify_challenge, verify_signature};

use crate::app::AppState;

#[derive(Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// GET /webhooks/chat — verification handshake: echoes `hub.challenge`
/// with 200 on token match, otherwise 403.
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let (Some(mode), Some(token), Some(challenge)) =
        (query.mode, query.verify_token, query.challenge)
    else {
        return (StatusCode::BAD_REQUEST, "missing verification parameters").into_response();
    };

    let Some(expected) = &state.config.chat.verify_token else {
        warn!("webhook verify attempted but no verify_token is configured");
        return (StatusCode::FORBIDDEN, "verification not configured").into_response();
    };

    match verify_challenge(&mode, &token, expected, &challenge) {
        Some(echoed) => echoed.into_response(),
        None => (StatusCode::FORBIDDEN, "verification failed").into_response(),
    }
}

/// POST /webhooks/chat — inbound messages. Signature mismatches return
/// 401; every other outcome returns 200 regardless of downstream
/// processing result, per the provider contract.
pub async fn inbound_handler(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    state.metrics.incr("webhook_requests_received");

    if let Some(secret) = &state.config.chat.app_secret {
        let sig_header = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok());
        let verified = match sig_header {
            Some(header) => verify_signature(&body, header, secret).is_ok(),
            None => false,
        };
        if !verified {
            state.metrics.incr("webhook_requests_rejected");
            warn!("webhook signature verification failed");
            return (StatusCode::UNAUTHORIZED, "signature verification failed").into_response();
        }
    }

    let messages = match parse_webhook_payload(&body) {
        Ok(messages) => messages,
        Err(e) => {
            warn!(error = %e, "malformed webhook payload; acknowledging anyway");
            return StatusCode::OK.into_response();
        }
    };

    for message in messages {
        if let Err(e) = handle_inbound_message(&state, &message.from).await {
            warn!(handle = %message.from, error = %e, "failed to process inbound message");
        }
    }

    StatusCode::OK.into_response()
}

/// Resolves the user, bumps the conversation window (`(none) -> active`
/// or `active -> active` on any inbound message), and offers the welcome
/// template when the user has no preferences yet. Parsing free text into
/// structured preferences is the conversational front-end's job — not
/// performed here.
async fn handle_inbound_message(state: &AppState, handle: &str) -> jobsignal_core::Result<()> {
    let now = chrono::Utc::now();
    let user = state.store.users.find_or_create_by_handle(handle, now)?;
    state.store.users.touch_last_active(user.id, now)?;
    state.window_manager.on_inbound_message(user.id)?;

    if state.store.preferences.find(user.id)?.is_none() {
        if let Err(e) = state.chat.send(handle, &render_welcome()).await {
            warn!(handle = %handle, error = %e, "failed to send welcome message");
        }
    }

    info!(user_id = %user.id, "inbound message processed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppState;
    use async_trait::async_trait;
    use jobsignal_core::config::ChatConfig;
    use jobsignal_core::{Clock, FixedClock, JobSignalConfig};
    use jobsignal_store::Store;
    use jobsignal_window::WindowManager;
    use std::sync::Mutex;

    struct RecordingChat {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl jobsignal_chat::ChatSender for RecordingChat {
        async fn send(&self, handle: &str, text: &str) -> jobsignal_core::Result<()> {
            self.sent.lock().unwrap().push((handle.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn test_state(chat_config: ChatConfig) -> (Arc<AppState>, Arc<RecordingChat>) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(chrono::Utc::now()));
        let window_manager = Arc::new(WindowManager::new(
            store.clone(),
            clock,
            jobsignal_core::config::WindowConfig::default(),
        ));
        let chat = Arc::new(RecordingChat { sent: Mutex::new(Vec::new()) });
        let mut config = JobSignalConfig::default();
        config.chat = chat_config;
        let state = Arc::new(AppState::new(config, store, window_manager, chat.clone()));
        (state, chat)
    }

    #[tokio::test]
    async fn inbound_message_opens_window_and_sends_welcome_for_new_user() {
        let (state, chat) = test_state(ChatConfig::default());
        handle_inbound_message(&state, "+2348012345678").await.unwrap();

        let user = state.store.users.find_by_handle("+2348012345678").unwrap().unwrap();
        assert!(state.store.windows.find_active(user.id).unwrap().is_some());
        assert_eq!(chat.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_inbound_message_does_not_resend_welcome() {
        let (state, chat) = test_state(ChatConfig::default());
        handle_inbound_message(&state, "+234").await.unwrap();

        let user = state.store.users.find_by_handle("+234").unwrap().unwrap();
        let mut prefs = jobsignal_store::entities::Preferences::empty(user.id);
        prefs.confirmed = true;
        state.store.preferences.upsert(&prefs).unwrap();

        handle_inbound_message(&state, "+234").await.unwrap();
        assert_eq!(chat.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn post_with_bad_signature_returns_401() {
        let mut cfg = ChatConfig::default();
        cfg.app_secret = Some("shh".into());
        let (state, _chat) = test_state(cfg);

        let body = Bytes::from_static(b"{\"entry\":[]}");
        let mut headers = HeaderMap::new();
        headers.insert("x-hub-signature-256", "sha256=deadbeef".parse().unwrap());

        let response = inbound_handler(State(state), headers, body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn verify_query_deserializes_dotted_hub_params() {
        let raw = "hub.mode=subscribe&hub.verify_token=tok&hub.challenge=123";
        let query: VerifyQuery = serde_urlencoded::from_str(raw).unwrap();
        assert_eq!(query.mode.as_deref(), Some("subscribe"));
        assert_eq!(query.challenge.as_deref(), Some("123"));
    }
}
