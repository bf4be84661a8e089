use chrono::{DateTime, Utc};

/// Source of "now" for everything with a time-based rule: token expiry,
/// engagement timestamps and alert suppression.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use manual::ManualClock;
