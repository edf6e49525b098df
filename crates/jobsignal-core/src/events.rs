//! Seams between components that would otherwise need a direct crate
//! dependency in both directions. The Enrichment Worker emits a delivery
//! event that the Delivery Dispatcher consumes; both sides depend only on
//! this trait, not on each other.

use async_trait::async_trait;

use crate::types::{CanonicalPostingId, ReminderStage, UserId};
use crate::Result;

/// Implemented by the Delivery Dispatcher. Called synchronously,
/// immediately after a canonical posting and its embedding are persisted —
/// the zero-delay real-time path.
#[async_trait]
pub trait DeliveryTrigger: Send + Sync {
    async fn on_canonical_posting_ready(&self, posting_id: CanonicalPostingId) -> Result<()>;
}

/// No-op trigger for tests and dev wiring where dispatch isn't exercised.
pub struct NullDeliveryTrigger;

#[async_trait]
impl DeliveryTrigger for NullDeliveryTrigger {
    async fn on_canonical_posting_ready(&self, _posting_id: CanonicalPostingId) -> Result<()> {
        Ok(())
    }
}

/// Implemented by the Chat Provider. Called by the Window Manager once a
/// reminder stage is due and has won the idempotency gate — keeps
/// `jobsignal-window` from depending on `jobsignal-chat` directly.
#[async_trait]
pub trait ReminderTransport: Send + Sync {
    async fn send_reminder(&self, user_id: UserId, stage: ReminderStage) -> Result<()>;
}

/// No-op transport for tests and dev wiring.
pub struct NullReminderTransport;

#[async_trait]
impl ReminderTransport for NullReminderTransport {
    async fn send_reminder(&self, _user_id: UserId, _stage: ReminderStage) -> Result<()> {
        Ok(())
    }
}
