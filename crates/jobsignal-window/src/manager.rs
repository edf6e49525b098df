use std::sync::Arc;

use tracing::{info, warn};

use jobsignal_core::config::WindowConfig;
use jobsignal_core::events::ReminderTransport;
use jobsignal_core::types::{ReminderStage, UserId};
use jobsignal_core::{Clock, Result};
use jobsignal_store::entities::ConversationWindow;
use jobsignal_store::Store;

/// Owns Conversation Window mutations. Every method reads and writes
/// through `Store`'s `WindowRepo`/`ReminderLogRepo`; no in-process state
/// is kept, so the manager is safe to construct per request or hold for
/// the process lifetime.
pub struct WindowManager {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    config: WindowConfig,
}

impl WindowManager {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, config: WindowConfig) -> Self {
        Self { store, clock, config }
    }

    /// `(none) -> active` or `active -> active` state transition on any
    /// inbound message. Resets `last_activity_at` and bumps the message
    /// counter; does not touch reminder-stage flags.
    pub fn on_inbound_message(&self, user_id: UserId) -> Result<ConversationWindow> {
        let window = self.store.windows.open_or_bump(user_id, self.clock.now())?;
        info!(user_id = %user_id, window_id = %window.id, "window opened or bumped on inbound message");
        Ok(window)
    }

    fn elapsed_minutes(&self, window: &ConversationWindow) -> i64 {
        (self.clock.now() - window.last_activity_at).num_minutes()
    }

    fn is_past_expiry(&self, window: &ConversationWindow) -> bool {
        self.elapsed_minutes(window) >= self.config.duration_hours * 60
    }

    /// Highest unsent reminder stage whose threshold has been crossed.
    /// Intermediate stages may be skipped — a user who crosses 23h 50m
    /// without prior scans receives S5 only.
    pub fn due_stage(&self, window: &ConversationWindow) -> Option<ReminderStage> {
        let elapsed = self.elapsed_minutes(window);
        ReminderStage::ALL
            .iter()
            .rev()
            .find(|stage| elapsed >= stage.threshold_minutes() && !window.has_sent(**stage))
            .copied()
    }

    /// One scan pass: expires windows past 24h, otherwise dispatches the
    /// single highest due-and-unsent reminder stage for each window still
    /// active. Returns the number of reminders actually sent.
    pub async fn scan_and_dispatch(&self, transport: &dyn ReminderTransport) -> Result<usize> {
        let mut dispatched = 0;
        for window in self.store.windows.all_active()? {
            if self.is_past_expiry(&window) {
                self.store.windows.expire(window.id)?;
                info!(user_id = %window.user_id, window_id = %window.id, "window expired");
                continue;
            }

            let Some(stage) = self.due_stage(&window) else {
                continue;
            };

            // try_mark_stage_sent is the idempotency gate: only the caller
            // that flips it proceeds to record + send.
            if !self.store.windows.try_mark_stage_sent(window.id, stage)? {
                continue;
            }
            self.store
                .reminder_log
                .record(window.user_id, window.id, stage, self.clock.now())?;

            match transport.send_reminder(window.user_id, stage).await {
                Ok(()) => dispatched += 1,
                Err(e) => warn!(
                    user_id = %window.user_id,
                    window_id = %window.id,
                    stage = stage.as_str(),
                    error = %e,
                    "reminder transport failed after ledger was recorded"
                ),
            }
        }
        Ok(dispatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use jobsignal_core::FixedClock;
    use std::sync::Mutex;

    struct RecordingTransport {
        sent: Mutex<Vec<(UserId, ReminderStage)>>,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self { sent: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl ReminderTransport for RecordingTransport {
        async fn send_reminder(&self, user_id: UserId, stage: ReminderStage) -> Result<()> {
            self.sent.lock().unwrap().push((user_id, stage));
            Ok(())
        }
    }

    fn manager_at(store: Arc<Store>, now: chrono::DateTime<chrono::Utc>) -> WindowManager {
        WindowManager::new(store, Arc::new(FixedClock(now)), WindowConfig::default())
    }

    #[tokio::test]
    async fn scan_expires_window_past_twenty_four_hours() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let t0 = chrono::Utc::now();
        let m0 = manager_at(store.clone(), t0);
        let user = UserId::new();
        m0.on_inbound_message(user).unwrap();

        let m1 = manager_at(store.clone(), t0 + Duration::hours(25));
        let transport = RecordingTransport::new();
        m1.scan_and_dispatch(&transport).await.unwrap();

        assert!(store.windows.find_active(user).unwrap().is_none());
    }

    #[tokio::test]
    async fn scan_dispatches_s1_at_sixteen_hours() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let t0 = chrono::Utc::now();
        let m0 = manager_at(store.clone(), t0);
        let user = UserId::new();
        m0.on_inbound_message(user).unwrap();

        let m1 = manager_at(store.clone(), t0 + Duration::hours(16));
        let transport = RecordingTransport::new();
        let dispatched = m1.scan_and_dispatch(&transport).await.unwrap();

        assert_eq!(dispatched, 1);
        assert_eq!(transport.sent.lock().unwrap()[0].1, ReminderStage::S1);
    }

    #[tokio::test]
    async fn skipping_intermediate_stages_sends_only_the_highest_due_stage() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let t0 = chrono::Utc::now();
        let m0 = manager_at(store.clone(), t0);
        let user = UserId::new();
        m0.on_inbound_message(user).unwrap();

        // Crosses straight to 23h50m without any intermediate scan.
        let m1 = manager_at(store.clone(), t0 + Duration::hours(23) + Duration::minutes(50));
        let transport = RecordingTransport::new();
        let dispatched = m1.scan_and_dispatch(&transport).await.unwrap();

        assert_eq!(dispatched, 1);
        assert_eq!(transport.sent.lock().unwrap()[0].1, ReminderStage::S5);
    }

    #[tokio::test]
    async fn repeated_scans_do_not_resend_the_same_stage() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let t0 = chrono::Utc::now();
        let m0 = manager_at(store.clone(), t0);
        let user = UserId::new();
        m0.on_inbound_message(user).unwrap();

        let m1 = manager_at(store.clone(), t0 + Duration::hours(16));
        let transport = RecordingTransport::new();
        m1.scan_and_dispatch(&transport).await.unwrap();
        m1.scan_and_dispatch(&transport).await.unwrap();

        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inbound_message_during_window_does_not_reset_already_sent_stages() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let t0 = chrono::Utc::now();
        let m0 = manager_at(store.clone(), t0);
        let user = UserId::new();
        m0.on_inbound_message(user).unwrap();

        let m1 = manager_at(store.clone(), t0 + Duration::hours(16));
        let transport = RecordingTransport::new();
        m1.scan_and_dispatch(&transport).await.unwrap();

        // User replies; window bumps but the S1 flag must stay set.
        m1.on_inbound_message(user).unwrap();
        let window = store.windows.find_active(user).unwrap().unwrap();
        assert!(window.has_sent(ReminderStage::S1));
    }
}
