//! Delivery Dispatcher: triggered after a canonical posting is
//! persisted, or by the Reminder Daemon's back-fill scan. For each
//! matched-and-eligible user, emits an outbound message, records a history
//! row, and respects daily caps, seen-job suppression, and window state.

pub mod dispatcher;

pub use dispatcher::{DeliveryOutcome, DeliveryDispatcher};
