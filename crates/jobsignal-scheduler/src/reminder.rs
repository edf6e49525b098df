use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use jobsignal_core::events::ReminderTransport;
use jobsignal_window::WindowManager;

/// Drives `WindowManager::scan_and_dispatch` at a fixed cadence (every five
/// minutes by default). Runs until `shutdown` broadcasts `true`.
pub struct ReminderDaemon {
    manager: Arc<WindowManager>,
    transport: Arc<dyn ReminderTransport>,
    cadence: Duration,
}

impl ReminderDaemon {
    pub fn new(manager: Arc<WindowManager>, transport: Arc<dyn ReminderTransport>, cadence_secs: u64) -> Self {
        Self {
            manager,
            transport,
            cadence: Duration::from_secs(cadence_secs),
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(cadence_secs = self.cadence.as_secs(), "reminder daemon started");
        let mut interval = tokio::time::interval(self.cadence);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.manager.scan_and_dispatch(self.transport.as_ref()).await {
                        Ok(dispatched) => info!(dispatched, "reminder scan complete"),
                        Err(e) => error!(error = %e, "reminder scan failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("reminder daemon shutting down");
                        break;
                    }
                }
            }
        }
    }
}
