//! Proactive token refresh scheduling.
//!
//! At most one timer is live at any time: arming always cancels the prior
//! one, so the scheduler itself can never produce duplicate refreshes.

use std::future::Future;
use std::sync::Mutex;

use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::debug;

/// Seconds before token expiry to trigger the refresh.
/// Safety margin against clock skew and request latency.
const REFRESH_LEAD_SECONDS: i64 = 60;

/// Minimum refresh delay in seconds.
/// Floor that prevents thrashing when the server issues very short-lived
/// tokens.
const MIN_REFRESH_DELAY_SECONDS: i64 = 10;

/// One-shot timer driving proactive token renewal.
#[derive(Default)]
pub struct RefreshScheduler {
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay before refreshing a token that expires in `expires_in` seconds:
    /// the lead time before expiry, clamped to the minimum delay.
    pub fn refresh_delay(expires_in: i64) -> Duration {
        let delay = (expires_in - REFRESH_LEAD_SECONDS).max(MIN_REFRESH_DELAY_SECONDS);
        Duration::from_secs(delay as u64)
    }

    /// Arm the timer to run `refresh` after `delay`, cancelling any
    /// previously armed timer.
    pub fn arm<F>(&self, delay: Duration, refresh: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!(delay_secs = delay.as_secs(), "arming refresh timer");

        // Anchor the deadline now, not at the task's first poll, so the
        // delay is measured from arming.
        let timer = sleep(delay);
        let handle = tokio::spawn(async move {
            timer.await;
            refresh.await;
        });

        if let Some(prev) = self.slot().replace(handle) {
            prev.abort();
        }
    }

    /// Cancel any pending timer.
    pub fn cancel(&self) {
        if let Some(handle) = self.slot().take() {
            handle.abort();
        }
    }

    /// Whether a timer is currently armed and has not yet completed.
    pub fn is_armed(&self) -> bool {
        self.slot()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        // Recover from poisoning: a panicked timer task cannot corrupt an
        // Option<JoinHandle>.
        self.timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
