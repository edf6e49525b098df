//! Background cadence loops: the Reminder Daemon (window scan-and-dispatch)
//! and the Scheduler (enrichment trigger, embedding back-fill,
//! stale-embedding refresh, dedup purge, old-record purge). Each loop is a
//! cooperative `tokio::select!` over its own interval and a shared shutdown
//! signal.

pub mod reminder;
pub mod scheduler;

pub use reminder::ReminderDaemon;
pub use scheduler::Scheduler;
