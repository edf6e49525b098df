//! Binds the Window Manager's `ReminderTransport` seam to the real chat
//! sender: looks up the user's handle and renders the stage-specific
//! template before sending. Lives in the gateway because it's the one
//! component that needs both `jobsignal-store` and `jobsignal-chat`
//! without either depending on the other.

use std::sync::Arc;

use async_trait::async_trait;

use jobsignal_chat::{render_reminder, ChatSender};
use jobsignal_core::events::ReminderTransport;
use jobsignal_core::types::{ReminderStage, UserId};
use jobsignal_core::{JobSignalError, Result};
use jobsignal_store::Store;

pub struct ChatReminderTransport {
    store: Arc<Store>,
    chat: Arc<dyn ChatSender>,
}

impl ChatReminderTransport {
    pub fn new(store: Arc<Store>, chat: Arc<dyn ChatSender>) -> Self {
        Self { store, chat }
    }
}

#[async_trait]
impl ReminderTransport for ChatReminderTransport {
    async fn send_reminder(&self, user_id: UserId, stage: ReminderStage) -> Result<()> {
        let Some(user) = self.store.users.find_by_id(user_id)? else {
            return Err(JobSignalError::NotFound(format!("user {user_id}")));
        };
        self.chat.send(&user.handle, &render_reminder(stage)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingChat {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ChatSender for RecordingChat {
        async fn send(&self, handle: &str, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push((handle.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn renders_and_sends_to_the_users_handle() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let user = store
            .users
            .find_or_create_by_handle("+2348012345678", chrono::Utc::now())
            .unwrap();
        let chat = Arc::new(RecordingChat { sent: Mutex::new(Vec::new()) });
        let transport = ChatReminderTransport::new(store, chat.clone());

        transport.send_reminder(user.id, ReminderStage::S4).await.unwrap();

        let sent = chat.sent.lock().unwrap();
        assert_eq!(sent[0].0, "+2348012345678");
        assert!(sent[0].1.contains("last hour"));
    }

    #[tokio::test]
    async fn unknown_user_surfaces_not_found() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let chat = Arc::new(RecordingChat { sent: Mutex::new(Vec::new()) });
        let transport = ChatReminderTransport::new(store, chat);

        let result = transport.send_reminder(UserId::new(), ReminderStage::S1).await;
        assert!(result.is_err());
    }
}
