use chrono::{DateTime, Utc};

/// Injected source of "now", so window-threshold and cadence logic can be
/// tested without sleeping. Production code uses `SystemClock`; tests use
/// `FixedClock` or `OffsetClock`.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant, for deterministic tests of window
/// thresholds and reminder cascades. Exposed outside `#[cfg(test)]` so
/// downstream crates can use it in their own test modules.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
