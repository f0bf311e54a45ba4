//! Injectable time source.

use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync + 'static {
    /// Current absolute instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current wall-clock time in the server's local frame, without zone.
    fn local_now(&self) -> NaiveDateTime {
        self.now().with_timezone(&Local).naive_local()
    }
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock frozen at a server-local wall-clock time.
    ///
    /// Falls back to interpreting `local` as UTC when it does not exist in
    /// the local zone (a DST gap).
    pub fn at_local(local: NaiveDateTime) -> Self {
        let now = local
            .and_local_timezone(Local)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| local.and_utc());
        Self::new(now)
    }

    /// Jump to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock() = now;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.lock();
        *now += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}
