//! Rate-limited operational alerts.
//!
//! [`AlertGate`] remembers when each alert key last fired and suppresses
//! repeats inside the window. The map is process-local and best-effort:
//! losing it on restart only means one extra notification.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::mail::templates::quota_alert_email;
use crate::state::AppState;

pub const ALERT_WINDOW_HOURS: i64 = 1;
const DEFAULT_CAPACITY: usize = 256;
/// Fraction of the daily email quota at which an alert is raised.
const QUOTA_WARNING_RATIO: f64 = 0.8;

pub struct AlertGate {
    clock: Arc<dyn Clock>,
    window: Duration,
    capacity: usize,
    last_sent: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl AlertGate {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_limits(clock, Duration::hours(ALERT_WINDOW_HOURS), DEFAULT_CAPACITY)
    }

    pub fn with_limits(clock: Arc<dyn Clock>, window: Duration, capacity: usize) -> Self {
        Self {
            clock,
            window,
            capacity: capacity.max(1),
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true, and records the attempt, if `key` has not fired within the window.
    pub fn try_acquire(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut last_sent = self
            .last_sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(at) = last_sent.get(key) {
            if now - *at < self.window {
                return false;
            }
        }

        if !last_sent.contains_key(key) && last_sent.len() >= self.capacity {
            let window = self.window;
            last_sent.retain(|_, at| now - *at < window);
            if last_sent.len() >= self.capacity {
                if let Some(oldest) = last_sent
                    .iter()
                    .min_by_key(|(_, at)| **at)
                    .map(|(k, _)| k.clone())
                {
                    last_sent.remove(&oldest);
                }
            }
        }

        last_sent.insert(key.to_string(), now);
        true
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.last_sent.lock().unwrap().len()
    }
}

/// Checks today's outbound email count against the daily quota and emails the
/// alert address once per window when usage crosses the warning ratio.
pub async fn check_email_quota(state: &AppState) {
    let Some(alert_email) = state.config.alert_email.as_deref() else {
        return;
    };
    let quota = state.config.email_daily_quota;
    let now = state.clock.now();
    let start_of_day = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .unwrap_or(now);

    let sent = match state.store.count_emails_sent_since(start_of_day).await {
        Ok(sent) => sent,
        Err(e) => {
            warn!("Could not check email quota: {e}");
            return;
        }
    };

    if (sent as f64) < f64::from(quota) * QUOTA_WARNING_RATIO {
        return;
    }
    if !state.alerts.try_acquire("email_quota") {
        return;
    }

    info!(sent, quota, "Email quota warning threshold reached");
    match quota_alert_email(alert_email, sent, quota) {
        Ok(email) => {
            state.mailer.send(&email).await;
        }
        Err(e) => warn!("Failed to build quota alert email: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_repeat_alert_suppressed_within_window() {
        let clock = Arc::new(ManualClock::at_epoch());
        let gate = AlertGate::new(clock.clone());

        assert!(gate.try_acquire("email_quota"));
        clock.advance(Duration::minutes(59));
        assert!(!gate.try_acquire("email_quota"));
        assert!(gate.try_acquire("storage_quota"));
        clock.advance(Duration::minutes(1));
        assert!(gate.try_acquire("email_quota"));
    }

    #[test]
    fn test_capacity_prunes_stale_then_evicts_oldest() {
        let clock = Arc::new(ManualClock::at_epoch());
        let gate = AlertGate::with_limits(clock.clone(), Duration::hours(1), 2);

        assert!(gate.try_acquire("a"));
        clock.advance(Duration::minutes(90));
        assert!(gate.try_acquire("b"));
        clock.advance(Duration::minutes(1));
        // "a" is stale and gets pruned to make room.
        assert!(gate.try_acquire("c"));
        assert_eq!(gate.len(), 2);

        clock.advance(Duration::minutes(1));
        // Both live; "b" is the oldest and is evicted.
        assert!(gate.try_acquire("d"));
        assert_eq!(gate.len(), 2);
        assert!(gate.try_acquire("b"));
        assert!(!gate.try_acquire("d"));
    }
}
