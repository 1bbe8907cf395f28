//! Time sources for the progress emitter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Source of the current time and of interval timers.
#[async_trait]
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;

    /// Completes once `interval` has passed.
    async fn after(&self, interval: Duration);
}

/// Wall clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn after(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}

/// Clock whose time and timers move only when told to.
///
/// `now()` returns the time last set with [`set`](Self::set) or moved with
/// [`advance`](Self::advance). Timers ignore their interval and complete
/// only on [`fire`](Self::fire), one timer per call. A fire with no pending
/// timer is kept and consumed by the next timer.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    fired: Notify,
}

impl ManualClock {
    /// Creates a clock stopped at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            fired: Notify::new(),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let by = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
        let mut now = self.now.lock();
        *now = now.checked_add_signed(by).unwrap_or(*now);
    }

    /// Sets the clock to `to`.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }

    /// Completes one pending timer.
    pub fn fire(&self) {
        self.fired.notify_one();
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    async fn after(&self, _interval: Duration) {
        self.fired.notified().await;
    }
}
